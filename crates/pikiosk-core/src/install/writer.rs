//! Backup-aware file installation.
//!
//! Installing over an existing file whose bytes differ first copies the old
//! bytes to `<name>.<YYYYMMDD_HHMMSS>.bak`. The new content is written to a
//! temp file in the target directory and renamed over the destination, so the
//! destination path never disappears.
//!
//! Identical content is rewritten without a new backup; re-running an install
//! therefore never loses a prior distinct version and never piles up copies
//! of the same one.

use crate::config::DesktopConfig;
use crate::error::{KioskError, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Result of installing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Where the previous, differing content was preserved.
    pub backup: Option<PathBuf>,
    /// The destination already held exactly these bytes.
    pub unchanged: bool,
}

/// Install `source` into `target_dir` under the same file name, mode 0644.
pub fn install_file(source: &Path, target_dir: &Path) -> Result<InstallOutcome> {
    install_file_with_mode(source, target_dir, DesktopConfig::MENU_FILE_MODE)
}

/// Install `source` into `target_dir` under the same file name with `mode`.
pub fn install_file_with_mode(source: &Path, target_dir: &Path, mode: u32) -> Result<InstallOutcome> {
    let file_name = source
        .file_name()
        .ok_or_else(|| KioskError::SourceMissing(source.to_path_buf()))?;
    install_to(source, &target_dir.join(file_name), mode)
}

/// Like [`install_file_with_mode`], but an existing destination for which
/// `is_settled(existing, source)` holds is left untouched (no backup, no
/// rewrite). Used when the installed copy is post-processed after the copy.
pub fn install_file_with<F>(
    source: &Path,
    target_dir: &Path,
    mode: u32,
    is_settled: F,
) -> Result<InstallOutcome>
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    let file_name = source
        .file_name()
        .ok_or_else(|| KioskError::SourceMissing(source.to_path_buf()))?;
    install_to_with(source, &target_dir.join(file_name), mode, is_settled)
}

/// Install `source` at the exact path `destination` with `mode`.
pub fn install_to(source: &Path, destination: &Path, mode: u32) -> Result<InstallOutcome> {
    install_to_with(source, destination, mode, |_, _| false)
}

fn install_to_with<F>(source: &Path, destination: &Path, mode: u32, is_settled: F) -> Result<InstallOutcome>
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    if !source.is_file() {
        return Err(KioskError::SourceMissing(source.to_path_buf()));
    }

    let bytes = fs::read(source).map_err(|e| KioskError::CopyFailed {
        src: source.to_path_buf(),
        dest: destination.to_path_buf(),
        reason: format!("read source: {}", e),
    })?;

    let target_dir = parent_of(destination)?;
    fs::create_dir_all(target_dir).map_err(|e| KioskError::DestinationDirUnwritable {
        path: target_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut backup = None;
    let mut unchanged = false;

    if destination.exists() {
        let existing = fs::read(destination).map_err(|e| KioskError::CopyFailed {
            src: source.to_path_buf(),
            dest: destination.to_path_buf(),
            reason: format!("read existing destination: {}", e),
        })?;

        if existing != bytes && is_settled(&existing, &bytes) {
            debug!("{} already settled, leaving it", destination.display());
            return Ok(InstallOutcome {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
                backup: None,
                unchanged: true,
            });
        }

        if existing == bytes {
            unchanged = true;
        } else {
            let stamp = Local::now()
                .format(DesktopConfig::BACKUP_TIMESTAMP_FORMAT)
                .to_string();
            let backup_path = backup_path_for(destination, &stamp);
            // copy, never rename: the destination must stay in place until replaced
            fs::copy(destination, &backup_path).map_err(|e| KioskError::CopyFailed {
                src: destination.to_path_buf(),
                dest: backup_path.clone(),
                reason: format!("backup: {}", e),
            })?;
            crate::platform::set_mode(&backup_path, DesktopConfig::BACKUP_FILE_MODE)?;
            info!(
                "Backed up {} to {}",
                destination.display(),
                backup_path.display()
            );
            backup = Some(backup_path);
        }
    }

    write_atomically(destination, &bytes, mode)?;
    debug!(
        "Installed {} -> {} (unchanged={})",
        source.display(),
        destination.display(),
        unchanged
    );

    Ok(InstallOutcome {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        backup,
        unchanged,
    })
}

/// First free backup name for `destination` with the given timestamp.
///
/// `<name>.<stamp>.bak`, then `<name>.<stamp>.1.bak`, `<name>.<stamp>.2.bak`, ...
pub fn backup_path_for(destination: &Path, stamp: &str) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = destination.parent().unwrap_or_else(|| Path::new("."));

    let candidate = dir.join(format!("{}.{}.{}", name, stamp, DesktopConfig::BACKUP_SUFFIX));
    if !candidate.exists() {
        return candidate;
    }

    (1u32..)
        .map(|n| dir.join(format!("{}.{}.{}.{}", name, stamp, n, DesktopConfig::BACKUP_SUFFIX)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Backups of `file_name` present in `dir`, sorted by name (oldest first).
pub fn list_backups(dir: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}.", file_name);
    let suffix = format!(".{}", DesktopConfig::BACKUP_SUFFIX);

    let mut backups = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(backups),
        Err(e) => return Err(KioskError::io_with_path(e, dir)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| KioskError::io_with_path(e, dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) && name.ends_with(&suffix) {
            backups.push(entry.path());
        }
    }
    backups.sort();
    Ok(backups)
}

/// Replace the contents of `path` via a temp file in the same directory.
pub fn write_atomically(path: &Path, bytes: &[u8], mode: u32) -> Result<()> {
    let dir = parent_of(path)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| KioskError::DestinationDirUnwritable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let copy_failed = |temp: &NamedTempFile, reason: String| KioskError::CopyFailed {
        src: temp.path().to_path_buf(),
        dest: path.to_path_buf(),
        reason,
    };

    temp.write_all(bytes)
        .map_err(|e| copy_failed(&temp, format!("write: {}", e)))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| copy_failed(&temp, format!("sync: {}", e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| copy_failed(&temp, format!("set permissions: {}", e)))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    temp.persist(path).map_err(|e| KioskError::CopyFailed {
        src: e.file.path().to_path_buf(),
        dest: path.to_path_buf(),
        reason: format!("rename: {}", e.error),
    })?;

    Ok(())
}

fn parent_of(path: &Path) -> Result<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| KioskError::DestinationDirUnwritable {
            path: path.to_path_buf(),
            reason: "destination has no parent directory".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let src_dir = temp_dir.path().join("src");
        let dst_dir = temp_dir.path().join("dst");
        fs::create_dir_all(&src_dir).unwrap();
        (temp_dir, src_dir, dst_dir)
    }

    #[test]
    fn test_install_into_missing_dir() {
        let (_tmp, src_dir, dst_dir) = setup();
        let source = src_dir.join("a.desktop");
        fs::write(&source, "Name=A\nExec=a\n").unwrap();

        let outcome = install_file(&source, &dst_dir).unwrap();

        assert_eq!(outcome.destination, dst_dir.join("a.desktop"));
        assert!(outcome.backup.is_none());
        assert!(!outcome.unchanged);
        assert_eq!(fs::read_to_string(&outcome.destination).unwrap(), "Name=A\nExec=a\n");
    }

    #[test]
    fn test_settled_destination_is_left_alone() {
        let (_tmp, src_dir, dst_dir) = setup();
        fs::create_dir_all(&dst_dir).unwrap();
        let source = src_dir.join("tv.desktop");
        fs::write(&source, "Exec=open TOKEN\n").unwrap();
        fs::write(dst_dir.join("tv.desktop"), "Exec=open /srv/index.html\n").unwrap();

        let settled = |existing: &[u8], src: &[u8]| {
            String::from_utf8_lossy(src).replace("TOKEN", "/srv/index.html").as_bytes() == existing
        };
        let outcome = install_file_with(&source, &dst_dir, 0o644, settled).unwrap();

        assert!(outcome.unchanged);
        assert!(outcome.backup.is_none());
        assert_eq!(
            fs::read_to_string(dst_dir.join("tv.desktop")).unwrap(),
            "Exec=open /srv/index.html\n"
        );
        assert!(list_backups(&dst_dir, "tv.desktop").unwrap().is_empty());
    }

    #[test]
    fn test_backup_preserves_previous_content() {
        let (_tmp, src_dir, dst_dir) = setup();
        fs::create_dir_all(&dst_dir).unwrap();
        let source = src_dir.join("b.desktop");
        fs::write(&source, "new").unwrap();
        fs::write(dst_dir.join("b.desktop"), "old").unwrap();

        let outcome = install_file(&source, &dst_dir).unwrap();

        let backup = outcome.backup.expect("backup expected");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old");
        assert_eq!(fs::read_to_string(dst_dir.join("b.desktop")).unwrap(), "new");

        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("b.desktop."));
        assert!(name.ends_with(".bak"));
        assert_eq!(list_backups(&dst_dir, "b.desktop").unwrap(), vec![backup]);
    }

    #[test]
    fn test_identical_content_makes_no_backup() {
        let (_tmp, src_dir, dst_dir) = setup();
        let source = src_dir.join("c.desktop");
        fs::write(&source, "same").unwrap();

        install_file(&source, &dst_dir).unwrap();
        let second = install_file(&source, &dst_dir).unwrap();

        assert!(second.unchanged);
        assert!(second.backup.is_none());
        assert!(list_backups(&dst_dir, "c.desktop").unwrap().is_empty());
    }

    #[test]
    fn test_source_missing() {
        let (_tmp, src_dir, dst_dir) = setup();
        let result = install_file(&src_dir.join("nope.desktop"), &dst_dir);

        assert!(matches!(result, Err(KioskError::SourceMissing(_))));
        assert!(!dst_dir.exists());
    }

    #[test]
    fn test_destination_dir_unwritable() {
        let (tmp, src_dir, _dst_dir) = setup();
        let source = src_dir.join("a.desktop");
        fs::write(&source, "x").unwrap();
        // a regular file where the directory should be
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let result = install_file(&source, &blocker.join("sub"));
        assert!(matches!(
            result,
            Err(KioskError::DestinationDirUnwritable { .. })
        ));
    }

    #[test]
    fn test_backup_names_never_collide() {
        let (_tmp, _src_dir, dst_dir) = setup();
        fs::create_dir_all(&dst_dir).unwrap();
        let dest = dst_dir.join("d.desktop");

        let first = backup_path_for(&dest, "20240101_120000");
        assert_eq!(first, dst_dir.join("d.desktop.20240101_120000.bak"));
        fs::write(&first, "1").unwrap();

        let second = backup_path_for(&dest, "20240101_120000");
        assert_eq!(second, dst_dir.join("d.desktop.20240101_120000.1.bak"));
        fs::write(&second, "2").unwrap();

        let third = backup_path_for(&dest, "20240101_120000");
        assert_eq!(third, dst_dir.join("d.desktop.20240101_120000.2.bak"));
    }

    #[test]
    fn test_each_distinct_version_is_kept() {
        let (_tmp, src_dir, dst_dir) = setup();
        let source = src_dir.join("e.desktop");

        for content in ["v1", "v2", "v3"] {
            fs::write(&source, content).unwrap();
            install_file(&source, &dst_dir).unwrap();
        }

        let backups = list_backups(&dst_dir, "e.desktop").unwrap();
        let mut contents: Vec<String> = backups
            .iter()
            .map(|b| fs::read_to_string(b).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(fs::read_to_string(dst_dir.join("e.desktop")).unwrap(), "v3");
    }

    #[cfg(unix)]
    #[test]
    fn test_modes() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, src_dir, dst_dir) = setup();
        let source = src_dir.join("f.desktop");
        fs::write(&source, "x").unwrap();

        let menu = install_file(&source, &dst_dir).unwrap();
        let mode = fs::metadata(&menu.destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        let exec = install_file_with_mode(&source, &dst_dir.join("auto"), 0o755).unwrap();
        let mode = fs::metadata(&exec.destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_of_executable_is_not_executable() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, src_dir, dst_dir) = setup();
        let source = src_dir.join("tv.desktop");
        fs::write(&source, "Name=TV\nExec=new\n").unwrap();
        fs::write(&source.with_extension("old"), "Name=TV\nExec=old\n").unwrap();
        install_to(&source.with_extension("old"), &dst_dir.join("tv.desktop"), 0o755).unwrap();

        let outcome = install_file_with_mode(&source, &dst_dir, 0o755).unwrap();

        let backup = outcome.backup.unwrap();
        let mode = fs::metadata(&backup).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, DesktopConfig::BACKUP_FILE_MODE);
        assert_eq!(fs::read_to_string(backup).unwrap(), "Name=TV\nExec=old\n");
    }
}
