use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::credentials::CredentialsFile;
use crate::Result;

/// Section holding tool-wide keys
pub const OPSWORKS_SECTION: &str = "opsworks";

/// Multi-value key listing the account sections to use
pub const ACCOUNTS_KEY: &str = "IAM";

/// Name given to the single account of a legacy config
pub const LEGACY_ACCOUNT: &str = "default";

/// Region the fleet API is called in unless `opsworks-region` is set
pub const DEFAULT_OPSWORKS_REGION: &str = "us-east-1";

pub const REGION_KEY: &str = "aws_region";
pub const STACK_ID_KEY: &str = "opsworks-stack-id";

/// One configured AWS account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub regions: Vec<String>,
    pub stack_ids: Vec<String>,
    pub options: HashMap<String, String>,
    /// Config file the account was read from
    pub source: Option<PathBuf>,
}

/// Static keys read from an account section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Everything needed to build AWS clients for one account.
///
/// Built fresh per account so no credential state is shared between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialContext {
    pub account: String,
    /// `None` means the standard provider chain for the profile named `account`
    pub keys: Option<StaticKeys>,
    pub opsworks_region: String,
    /// Config file the profile is resolved from, instead of the SDK default
    pub config_file: Option<PathBuf>,
}

/// Result of activating an account
#[derive(Debug, Clone)]
pub struct ActiveAccount<'a> {
    pub credentials: CredentialContext,
    pub regions: &'a [String],
    pub stack_ids: &'a [String],
    pub discover_stacks: bool,
}

impl Account {
    pub fn new(name: &str, options: HashMap<String, String>) -> Self {
        let regions = parse_list(name, REGION_KEY, lookup(&options, REGION_KEY));
        let stack_ids = parse_list(name, STACK_ID_KEY, lookup(&options, STACK_ID_KEY));

        Self {
            name: name.to_string(),
            regions,
            stack_ids,
            options,
            source: None,
        }
    }

    /// Look up an option, treating `-` and `_` in keys as the same character
    pub fn option(&self, key: &str) -> Option<&str> {
        lookup(&self.options, key)
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.option(key).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("true" | "yes" | "1")
        )
    }

    pub fn credentials(&self) -> CredentialContext {
        let keys = match (
            self.option("aws_access_key_id"),
            self.option("aws_secret_access_key"),
        ) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some(StaticKeys {
                access_key_id: id.to_string(),
                secret_access_key: secret.to_string(),
                session_token: self
                    .option("aws_session_token")
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            }),
            _ => None,
        };

        CredentialContext {
            account: self.name.clone(),
            keys,
            opsworks_region: self
                .option("opsworks-region")
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_OPSWORKS_REGION)
                .to_string(),
            config_file: self.source.clone(),
        }
    }

    /// Build the credential context and expose the discovery scope
    pub fn activate(&self) -> ActiveAccount<'_> {
        ActiveAccount {
            credentials: self.credentials(),
            regions: &self.regions,
            stack_ids: &self.stack_ids,
            discover_stacks: self.flag("opsworks-discover-stacks"),
        }
    }
}

/// How the accounts are described in the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayout {
    /// `[opsworks] IAM = a, b` naming one section per account
    Modern { accounts: Vec<String> },
    /// Single account spread over `[default]` and `[opsworks]`
    Legacy(LegacyFields),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyFields {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: Option<String>,
    pub stack_id: Option<String>,
    pub ssh_user_name: Option<String>,
}

impl ConfigLayout {
    pub fn detect(file: &CredentialsFile) -> Self {
        if let Some(names) = file.get(OPSWORKS_SECTION, ACCOUNTS_KEY) {
            let accounts = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
            return ConfigLayout::Modern { accounts };
        }

        let owned = |section: &str, key: &str| file.get(section, key).map(String::from);
        ConfigLayout::Legacy(LegacyFields {
            access_key_id: owned(LEGACY_ACCOUNT, "aws_access_key_id"),
            secret_access_key: owned(LEGACY_ACCOUNT, "aws_secret_access_key"),
            region: owned(LEGACY_ACCOUNT, REGION_KEY),
            stack_id: owned(OPSWORKS_SECTION, "stack-id"),
            ssh_user_name: owned(OPSWORKS_SECTION, "ssh-user-name"),
        })
    }

    pub fn into_accounts(self, file: &CredentialsFile) -> Vec<Account> {
        match self {
            ConfigLayout::Modern { accounts } => accounts
                .iter()
                .map(|name| Account::new(name, account_section(file, name)))
                .collect(),
            ConfigLayout::Legacy(fields) => {
                let mut options = HashMap::new();
                let mut put = |key: &str, value: Option<String>| {
                    if let Some(v) = value {
                        options.insert(key.to_string(), v);
                    }
                };
                put("aws_access_key_id", fields.access_key_id);
                put("aws_secret_access_key", fields.secret_access_key);
                put(REGION_KEY, fields.region);
                put(STACK_ID_KEY, fields.stack_id);
                put("opsworks-ssh-user-name", fields.ssh_user_name);

                vec![Account::new(LEGACY_ACCOUNT, options)]
            }
        }
    }
}

/// Accounts read from an AWS config file, in configured order
#[derive(Debug, Clone)]
pub struct AccountStore {
    pub layout: ConfigLayout,
    accounts: Vec<Account>,
}

impl AccountStore {
    pub fn load(path: &Path) -> Result<Self> {
        let file = CredentialsFile::load(path)?;
        let mut store = Self::from_file(&file);
        for account in &mut store.accounts {
            account.source = Some(path.to_path_buf());
        }
        Ok(store)
    }

    pub fn from_file(file: &CredentialsFile) -> Self {
        let layout = ConfigLayout::detect(file);
        let accounts = layout.clone().into_accounts(file);
        Self { layout, accounts }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.layout, ConfigLayout::Legacy(_))
    }
}

fn account_section(file: &CredentialsFile, name: &str) -> HashMap<String, String> {
    let section = file
        .section(name)
        .or_else(|| file.section(&format!("profile {}", name)));

    match section {
        Some(s) => s.clone(),
        None => {
            tracing::warn!(account = name, "no config section for account");
            HashMap::new()
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

fn lookup<'a>(options: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    if let Some(v) = options.get(key) {
        return Some(v.as_str());
    }
    let wanted = normalize_key(key);
    options
        .iter()
        .find(|(k, _)| normalize_key(k) == wanted)
        .map(|(_, v)| v.as_str())
}

/// Split a comma-separated field. Absent or malformed fields become empty lists.
fn parse_list(account: &str, field: &str, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let valid = items
        .iter()
        .all(|s| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

    if !valid {
        tracing::warn!(account, field, value = raw, "ignoring malformed field");
        return Vec::new();
    }

    items
}
