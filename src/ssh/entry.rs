use std::fmt;

use crate::aws::NormalizedInstance;
use crate::config::Account;

/// Account option preferred for the SSH user
pub const ACCOUNT_USER_KEY: &str = "opsworks_ssh_user_name";

/// Generic SSH user option
pub const USER_KEY: &str = "ssh_user_name";

pub const IDENTITY_FILE_KEY: &str = "identity_file";

/// One `Host` block. Directive order is kept and names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEntry {
    directives: Vec<(String, String)>,
}

impl ConfigEntry {
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.directives.push((name.to_string(), value.into()));
    }

    pub fn directives(&self) -> &[(String, String)] {
        &self.directives
    }
}

impl fmt::Display for ConfigEntry {
    /// First directive flush left, the rest indented under it
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.directives().iter().enumerate() {
            if i > 0 {
                f.write_str("  ")?;
            }
            writeln!(f, "{} {}", name, value)?;
        }
        Ok(())
    }
}

/// Settings that shape every entry of one account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    pub user: Option<String>,
    pub identity_file: Option<String>,
    pub key_checking: bool,
    pub quiet: bool,
}

impl SynthesisOptions {
    /// Merge command-line flags with an account's options
    pub fn resolve(account: &Account, key_checking: bool, quiet: bool) -> Self {
        let present = |key: &str| {
            account
                .option(key)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            user: present(ACCOUNT_USER_KEY).or_else(|| present(USER_KEY)),
            identity_file: present(IDENTITY_FILE_KEY),
            key_checking,
            quiet,
        }
    }
}

/// Build SSH entries for the instances that have an ip address
pub fn synthesize(instances: &[NormalizedInstance], options: &SynthesisOptions) -> Vec<ConfigEntry> {
    instances
        .iter()
        .filter_map(|instance| {
            let ip = instance.ip.as_deref()?;
            let mut entry = ConfigEntry::default();

            let host = if instance.hostname.is_empty() {
                ip.to_string()
            } else {
                format!("{} {}", instance.hostname, ip)
            };
            entry.push("Host", host);
            entry.push("HostName", ip);

            if let Some(user) = &options.user {
                entry.push("User", user.as_str());
            }
            if let Some(identity) = &options.identity_file {
                entry.push("IdentityFile", identity.as_str());
            }
            // dynamic fleets reuse ips, so known_hosts checks are off unless requested
            if !options.key_checking {
                entry.push("StrictHostKeyChecking", "no");
                entry.push("UserKnownHostsFile", "/dev/null");
            }
            if options.quiet {
                entry.push("LogLevel", "quiet");
            }

            Some(entry)
        })
        .collect()
}
