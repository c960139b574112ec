//! Filesystem key store.
//!
//! Each name maps to one file: `/privKeys/alice` is stored at
//! `<root>/privKeys/alice.data`. Writes are staged as temporary files in the
//! target directory and renamed into place, so readers never see a partial
//! container. Entries a batch overwrites or deletes are hard-linked to a
//! hidden backup first, and a failing batch is rolled back from them.

use super::{name_matches_prefix, validate_name, Batch, BatchOp, KeyStore};
use crate::error::{PeerKeyError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Extension of stored entries.
const DATA_EXTENSION: &str = "data";

/// Extension of staged writes.
const TEMP_EXTENSION: &str = "tmp";

/// Extension of entries saved while a batch is applied.
const BACKUP_EXTENSION: &str = "bak";

/// Key store keeping one file per name under a root directory.
#[derive(Debug)]
pub struct FsKeyStore {
    root: PathBuf,
    commit_lock: Mutex<()>,
}

/// A value written to a temporary file, waiting to be moved into place.
struct Staged {
    temp: PathBuf,
    target: PathBuf,
    create_new: bool,
}

/// One batch operation, ready to apply.
enum Step {
    Write(Staged),
    Delete(PathBuf),
}

/// Second link to an existing entry, kept until the batch is applied.
struct Backup {
    backup: PathBuf,
    target: PathBuf,
}

impl FsKeyStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use peerkey::storage::{FsKeyStore, KeyStore};
    ///
    /// # async fn example() -> peerkey::Result<()> {
    /// let store = FsKeyStore::open("/var/lib/peer/keystore").await?;
    /// let names = store.list_names("/privKeys").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        create_private_dir(&root).await?;
        debug!(root = %root.display(), "Opened filesystem key store");
        Ok(Self {
            root,
            commit_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `name`.
    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        let mut path = self.root.clone();
        for segment in name.trim_start_matches('/').split('/') {
            path.push(segment);
        }
        let mut file_name = path.file_name().map(|f| f.to_os_string()).unwrap_or_default();
        file_name.push(".");
        file_name.push(DATA_EXTENSION);
        path.set_file_name(file_name);
        Ok(path)
    }

    async fn stage(&self, target: PathBuf, value: &[u8], create_new: bool) -> Result<Staged> {
        let dir = target.parent().unwrap_or(&self.root).to_path_buf();
        create_private_dir(&dir).await?;

        let temp = hidden_sibling(&target, TEMP_EXTENSION);
        let mut file = private_file_options().open(&temp).await?;
        let written = async {
            file.write_all(value).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        Ok(Staged {
            temp,
            target,
            create_new,
        })
    }

    async fn discard(steps: &[Step]) {
        for step in steps {
            if let Step::Write(entry) = step {
                let _ = fs::remove_file(&entry.temp).await;
            }
        }
    }

    /// Undo applied steps: drop new entries, then relink every saved one.
    async fn roll_back(applied: &[PathBuf], backups: &[Backup]) {
        for target in applied {
            if backups.iter().any(|b| &b.target == target) {
                continue;
            }
            if let Err(e) = remove_if_exists(target).await {
                warn!(path = %target.display(), error = %e, "Rollback could not remove entry");
            }
        }
        for saved in backups {
            if let Err(e) = fs::rename(&saved.backup, &saved.target).await {
                warn!(
                    path = %saved.target.display(),
                    backup = %saved.backup.display(),
                    error = %e,
                    "Rollback could not restore entry"
                );
            }
        }
    }

    async fn drop_backups(backups: &[Backup]) {
        for saved in backups {
            let _ = fs::remove_file(&saved.backup).await;
        }
    }
}

#[async_trait]
impl KeyStore for FsKeyStore {
    async fn has(&self, name: &str) -> Result<bool> {
        let path = self.entry_path(name)?;
        is_entry_file(&path).await
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.entry_path(name)?;
        let not_found = || PeerKeyError::NotFound(format!("No entry stored under '{}'", name));
        if !is_entry_file(&path).await? {
            return Err(not_found());
        }
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(&self, batch: Batch) -> Result<()> {
        batch.validate()?;
        let _guard = self.commit_lock.lock().await;

        // Resolve paths and check create-only writes before touching disk.
        let mut planned = Vec::with_capacity(batch.len());
        let mut pending: HashMap<PathBuf, bool> = HashMap::new();
        let mut originals = Vec::new();
        for op in batch.ops() {
            let path = self.entry_path(op.name())?;
            let exists = match pending.get(&path) {
                Some(exists) => *exists,
                None => {
                    let exists = is_entry_file(&path).await?;
                    if exists {
                        originals.push(path.clone());
                    }
                    exists
                }
            };
            if matches!(op, BatchOp::PutNew { .. }) && exists {
                return Err(PeerKeyError::AlreadyExists(format!(
                    "An entry is already stored under '{}'",
                    op.name()
                )));
            }
            pending.insert(path.clone(), !matches!(op, BatchOp::Delete { .. }));
            planned.push(path);
        }

        // Stage every write; on failure nothing has been applied yet.
        let mut steps = Vec::with_capacity(planned.len());
        for (op, path) in batch.ops().iter().zip(planned) {
            let step = match op {
                BatchOp::Put { value, .. } => self.stage(path, value, false).await.map(Step::Write),
                BatchOp::PutNew { value, .. } => {
                    self.stage(path, value, true).await.map(Step::Write)
                }
                BatchOp::Delete { .. } => Ok(Step::Delete(path)),
            };
            match step {
                Ok(step) => steps.push(step),
                Err(e) => {
                    Self::discard(&steps).await;
                    return Err(e);
                }
            }
        }

        // Keep a second link to every entry the batch replaces or removes.
        let mut backups = Vec::with_capacity(originals.len());
        for target in originals {
            let backup = hidden_sibling(&target, BACKUP_EXTENSION);
            if let Err(e) = fs::hard_link(&target, &backup).await {
                Self::drop_backups(&backups).await;
                Self::discard(&steps).await;
                return Err(e.into());
            }
            backups.push(Backup { backup, target });
        }

        // Apply in batch order.
        let mut applied = Vec::new();
        for (index, step) in steps.iter().enumerate() {
            let result = match step {
                Step::Delete(path) => remove_if_exists(path).await,
                Step::Write(entry) if entry.create_new => {
                    // hard_link fails if the target appeared since the check
                    match fs::hard_link(&entry.temp, &entry.target).await {
                        Ok(()) => {
                            applied.push(entry.target.clone());
                            fs::remove_file(&entry.temp).await.map_err(Into::into)
                        }
                        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                            Err(PeerKeyError::AlreadyExists(format!(
                                "An entry is already stored at {}",
                                entry.target.display()
                            )))
                        }
                        Err(e) => Err(e.into()),
                    }
                }
                Step::Write(entry) => match fs::rename(&entry.temp, &entry.target).await {
                    Ok(()) => {
                        applied.push(entry.target.clone());
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                },
            };
            if let Err(e) = result {
                warn!(error = %e, "Batch failed while applying, rolling back");
                Self::discard(&steps[index..]).await;
                Self::roll_back(&applied, &backups).await;
                return Err(e);
            }
        }

        Self::drop_backups(&backups).await;
        Ok(())
    }

    async fn list_names(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dirs = vec![(self.root.clone(), String::new())];

        while let Some((dir, name_prefix)) = dirs.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if file_name.starts_with('.') {
                    continue;
                }
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    dirs.push((entry.path(), format!("{}/{}", name_prefix, file_name)));
                } else if let Some(stem) = file_name
                    .strip_suffix(DATA_EXTENSION)
                    .and_then(|s| s.strip_suffix('.'))
                {
                    let name = format!("{}/{}", name_prefix, stem);
                    if name_matches_prefix(&name, prefix) && validate_name(&name).is_ok() {
                        names.push(name);
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// `.<file>.<random>.<extension>` next to `target`; hidden from listings.
fn hidden_sibling(target: &Path, extension: &str) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(
        ".{}.{:016x}.{}",
        file_name,
        rand::random::<u64>(),
        extension
    ))
}

/// Whether `path` is a stored entry; directories and missing paths are not.
async fn is_entry_file(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await?;
    }
    Ok(())
}

fn private_file_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}
