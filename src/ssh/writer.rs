use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::ssh::section::{compose, strip_section, MergedSection};
use crate::{OpsworksSshError, Result};

/// Outcome of rewriting an SSH config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub target: PathBuf,
    pub backup: Option<PathBuf>,
    pub entries: usize,
}

/// Replace the owned section of `target` with `section`.
///
/// The target must already exist and hold a well-formed section. With
/// `backup`, its previous contents are then copied to a fresh
/// `<target>.backup[-N]` file.
pub fn apply(section: &MergedSection, target: &Path, backup: bool) -> Result<ApplyReport> {
    if !target.exists() {
        return Err(OpsworksSshError::TargetFileMissing(target.to_path_buf()));
    }

    let old_contents = std::fs::read_to_string(target)?;
    let stripped = strip_section(&old_contents)
        .ok_or_else(|| OpsworksSshError::CorruptSection(target.to_path_buf()))?;

    let backup = if backup {
        let path = backup_path(target);
        std::fs::write(&path, &old_contents)?;
        tracing::info!(backup = %path.display(), "saved SSH config backup");
        Some(path)
    } else {
        None
    };

    let new_contents = compose(&stripped, &section.render());

    write_atomic(target, &new_contents)?;

    Ok(ApplyReport {
        target: target.to_path_buf(),
        backup,
        entries: section.entry_count(),
    })
}

/// First unused name of `<target>.backup`, `<target>.backup-0`, `<target>.backup-1`, ...
pub fn backup_path(target: &Path) -> PathBuf {
    let with_suffix = |suffix: &str| {
        let mut name: OsString = target.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };

    let base = with_suffix(".backup");
    if !base.exists() {
        return base;
    }

    (0..)
        .map(|n| with_suffix(&format!(".backup-{}", n)))
        .find(|p| !p.exists())
        .unwrap_or(base)
}

/// Write through a temp file in the same directory, then rename over `target`
fn write_atomic(target: &Path, contents: &str) -> Result<()> {
    // follow a symlinked config instead of replacing the link
    let target = std::fs::canonicalize(target)?;
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let permissions = std::fs::metadata(&target)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    std::fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(&target).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::entry::ConfigEntry;
    use crate::ssh::section::AccountBlock;
    use tempfile::TempDir;

    fn section(ips: &[&str]) -> MergedSection {
        let entries = ips
            .iter()
            .map(|ip| {
                let mut e = ConfigEntry::default();
                e.push("Host", format!("node {}", ip));
                e.push("HostName", *ip);
                e
            })
            .collect();

        MergedSection::merge(vec![AccountBlock {
            account: "default".to_string(),
            entries,
        }])
    }

    #[test]
    fn test_apply_missing_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");

        let result = apply(&section(&["1.1.1.1"]), &target, false);

        assert!(matches!(result, Err(OpsworksSshError::TargetFileMissing(_))));
        assert!(!target.exists());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");
        std::fs::write(&target, "Host bastion\n  User admin\n").unwrap();

        let report = apply(&section(&["1.1.1.1", "2.2.2.2"]), &target, false).unwrap();
        assert_eq!(report.entries, 2);
        assert!(report.backup.is_none());
        let first = std::fs::read_to_string(&target).unwrap();

        apply(&section(&["1.1.1.1", "2.2.2.2"]), &target, false).unwrap();
        let second = std::fs::read_to_string(&target).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("Host bastion\n  User admin\n\n# --- OpsWorks ---\n"));
        assert_eq!(first.matches("# --- OpsWorks ---").count(), 1);
    }

    #[test]
    fn test_apply_replaces_previous_section_only() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");
        std::fs::write(
            &target,
            "Host a\n  User me\n\n# --- OpsWorks ---\nHost stale 9.9.9.9\n# --- End of OpsWorks ---\n\nHost z\n  Port 2222\n",
        )
        .unwrap();

        apply(&section(&["1.1.1.1"]), &target, false).unwrap();
        let contents = std::fs::read_to_string(&target).unwrap();

        assert!(contents.starts_with("Host a\n  User me\nHost z\n  Port 2222\n\n"));
        assert!(!contents.contains("stale"));
        assert!(contents.contains("Host node 1.1.1.1"));
    }

    #[test]
    fn test_apply_with_dangling_marker_leaves_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");
        let original = "Host a\n# --- OpsWorks ---\nHost b\n";
        std::fs::write(&target, original).unwrap();

        let result = apply(&section(&["1.1.1.1"]), &target, false);

        assert!(matches!(result, Err(OpsworksSshError::CorruptSection(_))));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), original);
    }

    #[test]
    fn test_dangling_marker_writes_no_backup() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");
        let original = "Host a\n# --- OpsWorks ---\nHost b\n";
        std::fs::write(&target, original).unwrap();

        let result = apply(&section(&["1.1.1.1"]), &target, true);

        assert!(matches!(result, Err(OpsworksSshError::CorruptSection(_))));
        assert!(!dir.path().join("config.backup").exists());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), original);
    }

    #[test]
    fn test_backup_naming() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("x");

        assert_eq!(backup_path(&target), dir.path().join("x.backup"));

        std::fs::write(dir.path().join("x.backup"), "").unwrap();
        assert_eq!(backup_path(&target), dir.path().join("x.backup-0"));

        std::fs::write(dir.path().join("x.backup-0"), "").unwrap();
        assert_eq!(backup_path(&target), dir.path().join("x.backup-1"));
    }

    #[test]
    fn test_sequential_backups_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");
        std::fs::write(&target, "Host original\n").unwrap();

        let first = apply(&section(&["1.1.1.1"]), &target, true).unwrap();
        let after_first = std::fs::read_to_string(&target).unwrap();
        let second = apply(&section(&["1.1.1.1"]), &target, true).unwrap();
        let third = apply(&section(&["1.1.1.1"]), &target, true).unwrap();

        assert_eq!(first.backup, Some(dir.path().join("config.backup")));
        assert_eq!(second.backup, Some(dir.path().join("config.backup-0")));
        assert_eq!(third.backup, Some(dir.path().join("config.backup-1")));

        assert_eq!(
            std::fs::read_to_string(dir.path().join("config.backup")).unwrap(),
            "Host original\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("config.backup-0")).unwrap(),
            after_first
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("config");
        std::fs::write(&target, "").unwrap();
        std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o600)).unwrap();

        apply(&section(&["1.1.1.1"]), &target, false).unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
