use crate::digest::{digest_bytes, digest_file, format_digest_file, Algorithm};
use crate::error::StorageError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::warn;

/// One filesystem mutation inside a transaction. Each variant carries
/// the data needed to apply it; backups are captured at commit time, not
/// construction time, so mutation between queueing and commit cannot
/// corrupt the restore state.
#[derive(Debug)]
pub enum FsEvent {
    CreateFile {
        dest: Utf8PathBuf,
        content: Vec<u8>,
        digests: Vec<Algorithm>,
    },
    CopyFile {
        source: Utf8PathBuf,
        dest: Utf8PathBuf,
        digests: Vec<Algorithm>,
    },
    MkDirs {
        dir: Utf8PathBuf,
    },
    DeleteFile {
        dest: Utf8PathBuf,
    },
}

enum FileBackup {
    /// The path did not exist before this transaction touched it.
    Absent,
    /// Pre-transaction content, parked in a sibling temp file.
    Saved(NamedTempFile),
}

/// Everything a partially-committed transaction has done so far, in
/// application order.
#[derive(Default)]
struct Applied {
    created_dirs: Vec<Utf8PathBuf>,
    files: Vec<(Utf8PathBuf, FileBackup)>,
}

/// An ordered sequence of filesystem mutations with commit/rollback
/// semantics. `commit` applies events in order; the first failure rolls
/// back every already-applied event, restoring the exact pre-transaction
/// state (including non-existence). Directories are only removed on
/// rollback if this transaction created them and they are still empty.
#[derive(Debug, Default)]
pub struct FsTransaction {
    events: Vec<FsEvent>,
}

impl FsTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_file(
        &mut self,
        dest: impl Into<Utf8PathBuf>,
        content: Vec<u8>,
        digests: &[Algorithm],
    ) {
        self.events.push(FsEvent::CreateFile {
            dest: dest.into(),
            content,
            digests: digests.to_vec(),
        });
    }

    pub fn copy_file(
        &mut self,
        source: impl Into<Utf8PathBuf>,
        dest: impl Into<Utf8PathBuf>,
        digests: &[Algorithm],
    ) {
        self.events.push(FsEvent::CopyFile {
            source: source.into(),
            dest: dest.into(),
            digests: digests.to_vec(),
        });
    }

    pub fn mkdirs(&mut self, dir: impl Into<Utf8PathBuf>) {
        self.events.push(FsEvent::MkDirs { dir: dir.into() });
    }

    pub fn delete_file(&mut self, dest: impl Into<Utf8PathBuf>) {
        self.events.push(FsEvent::DeleteFile { dest: dest.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn commit(self) -> Result<(), StorageError> {
        let mut applied = Applied::default();
        for event in &self.events {
            if let Err(e) = apply(event, &mut applied) {
                rollback(applied);
                return Err(e);
            }
        }
        Ok(())
    }
}

fn apply(event: &FsEvent, applied: &mut Applied) -> Result<(), StorageError> {
    match event {
        FsEvent::CreateFile {
            dest,
            content,
            digests,
        } => {
            ensure_dirs(parent_of(dest), applied)?;
            replace_file(dest, content, applied)?;
            for algo in digests {
                let digest = digest_bytes(*algo, content);
                write_companion(*algo, dest, &digest, applied)?;
            }
            Ok(())
        }
        FsEvent::CopyFile {
            source,
            dest,
            digests,
        } => {
            if !source.is_file() {
                return Err(StorageError::SourceMissing {
                    path: source.clone(),
                });
            }
            ensure_dirs(parent_of(dest), applied)?;
            applied.files.push((dest.clone(), take_backup(dest)?));
            let tmp = scratch_in(parent_of(dest))?;
            fs::copy(source, tmp.path()).map_err(|e| StorageError::io(source, e))?;
            persist(tmp, dest)?;
            for algo in digests {
                let digest = digest_file(*algo, source)?;
                write_companion(*algo, dest, &digest, applied)?;
            }
            Ok(())
        }
        FsEvent::MkDirs { dir } => ensure_dirs(dir, applied),
        FsEvent::DeleteFile { dest } => {
            if !dest.exists() {
                return Ok(());
            }
            applied.files.push((dest.clone(), take_backup(dest)?));
            fs::remove_file(dest).map_err(|e| StorageError::io(dest, e))
        }
    }
}

fn parent_of(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    }
}

/// Create every missing ancestor of `dir`, shallowest first, recording
/// each one so rollback knows what this transaction owns.
fn ensure_dirs(dir: &Utf8Path, applied: &mut Applied) -> Result<(), StorageError> {
    let mut missing = Vec::new();
    let mut cur = Some(dir);
    while let Some(d) = cur {
        if d.as_str().is_empty() || d.as_str() == "." || d.exists() {
            break;
        }
        missing.push(d.to_path_buf());
        cur = d.parent();
    }
    for d in missing.iter().rev() {
        fs::create_dir(d).map_err(|e| StorageError::io(d, e))?;
        applied.created_dirs.push(d.clone());
    }
    Ok(())
}

fn take_backup(path: &Utf8Path) -> Result<FileBackup, StorageError> {
    if !path.exists() {
        return Ok(FileBackup::Absent);
    }
    let tmp = scratch_in(parent_of(path))?;
    fs::copy(path, tmp.path()).map_err(|e| StorageError::io(path, e))?;
    Ok(FileBackup::Saved(tmp))
}

fn scratch_in(dir: &Utf8Path) -> Result<NamedTempFile, StorageError> {
    tempfile::Builder::new()
        .prefix(".txn-")
        .tempfile_in(dir)
        .map_err(|e| StorageError::io(dir, e))
}

/// Backup-then-write. The write itself is temp + rename so a crash or
/// error mid-write never leaves a truncated destination.
fn replace_file(
    dest: &Utf8Path,
    content: &[u8],
    applied: &mut Applied,
) -> Result<(), StorageError> {
    applied.files.push((dest.to_path_buf(), take_backup(dest)?));
    let mut tmp = scratch_in(parent_of(dest))?;
    tmp.write_all(content)
        .and_then(|()| tmp.flush())
        .map_err(|e| StorageError::io(dest, e))?;
    persist(tmp, dest)
}

fn write_companion(
    algo: Algorithm,
    dest: &Utf8Path,
    digest: &str,
    applied: &mut Applied,
) -> Result<(), StorageError> {
    let companion = algo.companion_path(dest);
    let filename = dest.file_name().unwrap_or(dest.as_str());
    let content = format_digest_file(digest, filename);
    replace_file(&companion, content.as_bytes(), applied)
}

fn persist(tmp: NamedTempFile, dest: &Utf8Path) -> Result<(), StorageError> {
    tmp.persist(dest)
        .map(|_| ())
        .map_err(|e| StorageError::io(dest, e.error))
}

fn rollback(applied: Applied) {
    for (path, backup) in applied.files.iter().rev() {
        let result = match backup {
            FileBackup::Absent => match fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            },
            FileBackup::Saved(tmp) => fs::copy(tmp.path(), path).map(|_| ()),
        };
        if let Err(e) = result {
            warn!("rollback failed to restore {path}: {e}");
        }
    }
    // Only directories this transaction created, deepest first, and only
    // while still empty.
    for dir in applied.created_dirs.iter().rev() {
        let _ = fs::remove_dir(dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn commit_writes_content_and_companions() {
        let (_guard, root) = root();
        let dest = root.join("org/example/widget/1.0/widget-1.0.jar");

        let mut txn = FsTransaction::new();
        txn.create_file(dest.clone(), b"payload".to_vec(), &Algorithm::ALL);
        txn.commit().unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        let sha1 = fs::read_to_string(Algorithm::Sha1.companion_path(&dest)).unwrap();
        assert!(sha1.starts_with(&digest_bytes(Algorithm::Sha1, b"payload")));
        assert!(sha1.trim_end().ends_with("widget-1.0.jar"));
        let md5 = fs::read_to_string(Algorithm::Md5.companion_path(&dest)).unwrap();
        assert!(md5.starts_with(&digest_bytes(Algorithm::Md5, b"payload")));
    }

    #[test]
    fn failed_event_rolls_back_earlier_writes() {
        let (_guard, root) = root();
        let a = root.join("a.txt");
        fs::write(&a, b"original").unwrap();

        // "blocker" is a file, so creating blocker/inner.txt must fail.
        let blocker = root.join("blocker");
        fs::write(&blocker, b"in the way").unwrap();

        let mut txn = FsTransaction::new();
        txn.create_file(a.clone(), b"overwritten".to_vec(), &[]);
        txn.create_file(blocker.join("inner.txt"), b"x".to_vec(), &[]);
        assert!(txn.commit().is_err());

        assert_eq!(fs::read(&a).unwrap(), b"original");
    }

    #[test]
    fn rollback_restores_nonexistence_and_removes_created_dirs() {
        let (_guard, root) = root();
        let a = root.join("new/dir/a.txt");
        let blocker = root.join("blocker");
        fs::write(&blocker, b"in the way").unwrap();

        let mut txn = FsTransaction::new();
        txn.create_file(a.clone(), b"fresh".to_vec(), &[]);
        txn.create_file(blocker.join("inner.txt"), b"x".to_vec(), &[]);
        assert!(txn.commit().is_err());

        assert!(!a.exists());
        assert!(!root.join("new/dir").exists());
        assert!(!root.join("new").exists());
    }

    #[test]
    fn rollback_keeps_preexisting_dirs() {
        let (_guard, root) = root();
        fs::create_dir_all(root.join("kept")).unwrap();
        let a = root.join("kept/a.txt");
        let blocker = root.join("blocker");
        fs::write(&blocker, b"in the way").unwrap();

        let mut txn = FsTransaction::new();
        txn.create_file(a.clone(), b"fresh".to_vec(), &[]);
        txn.create_file(blocker.join("inner.txt"), b"x".to_vec(), &[]);
        assert!(txn.commit().is_err());

        assert!(!a.exists());
        assert!(root.join("kept").is_dir());
    }

    #[test]
    fn delete_rolls_back_to_original_content() {
        let (_guard, root) = root();
        let a = root.join("a.txt");
        fs::write(&a, b"keep me").unwrap();
        let blocker = root.join("blocker");
        fs::write(&blocker, b"in the way").unwrap();

        let mut txn = FsTransaction::new();
        txn.delete_file(a.clone());
        txn.create_file(blocker.join("inner.txt"), b"x".to_vec(), &[]);
        assert!(txn.commit().is_err());

        assert_eq!(fs::read(&a).unwrap(), b"keep me");
    }

    #[test]
    fn copy_file_commits_from_source() {
        let (_guard, root) = root();
        let src = root.join("incoming.part");
        fs::write(&src, b"artifact bytes").unwrap();
        let dest = root.join("org/widget/1.0/widget-1.0.jar");

        let mut txn = FsTransaction::new();
        txn.copy_file(src.clone(), dest.clone(), &[Algorithm::Sha1]);
        txn.commit().unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"artifact bytes");
        assert!(Algorithm::Sha1.companion_path(&dest).exists());
        assert!(!Algorithm::Md5.companion_path(&dest).exists());
    }

    #[test]
    fn copy_missing_source_fails_cleanly() {
        let (_guard, root) = root();
        let mut txn = FsTransaction::new();
        txn.copy_file(root.join("nope.part"), root.join("dest.jar"), &[]);
        assert!(matches!(
            txn.commit(),
            Err(StorageError::SourceMissing { .. })
        ));
        assert!(!root.join("dest.jar").exists());
    }
}
