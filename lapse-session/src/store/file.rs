//! Filesystem store implementation.

use crate::error::{SessionError, SessionResult};
use crate::store::Store;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Marks file names holding a key digest.
const DIGEST_MARKER: char = '~';

/// Longest key used verbatim as a file stem.
const MAX_PLAIN_STEM: usize = 200;

/// Filesystem store configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStoreConfig {
    /// Directory holding one file per key.
    pub dir: PathBuf,
    /// Extension of entry files. Purge ignores everything else.
    pub extension: String,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            dir: std::env::temp_dir().join("lapse").join("sess"),
            extension: "sess".to_string(),
        }
    }
}

impl FileStoreConfig {
    /// Create configuration for a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set the entry file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}

/// Filesystem-backed store with one file per key.
///
/// The file modification time is the expiry clock: `set` rewrites the file
/// and `touch` bumps its mtime. Values are written to a temporary sibling and
/// renamed into place. A single lock serializes every operation since the
/// filesystem offers no atomic read-modify-write.
///
/// # Examples
///
/// ```no_run
/// use lapse_session::{FileStore, Store};
///
/// # async fn example() -> lapse_session::SessionResult<()> {
/// let store = FileStore::with_dir("/var/lib/myapp/sessions");
/// store.start().await?;
/// store.set("foo", b"bar".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    lock: Mutex<()>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(FileStoreConfig::default())
    }
}

impl FileStore {
    /// Create a store from configuration.
    pub fn new(config: FileStoreConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    /// Create a store rooted at `dir` (convenience method).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStoreConfig::new(dir))
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Full path of the file backing `id`.
    ///
    /// Keys of up to 200 lowercase ASCII letters, digits, `-` and `_` are
    /// used verbatim. Any other key is named by the hex SHA-256 of its bytes,
    /// which keeps the file inside the storage directory, under file name
    /// length limits and distinct on case-insensitive filesystems.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let plain = !id.is_empty()
            && id.len() <= MAX_PLAIN_STEM
            && id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');

        let stem = if plain {
            id.to_string()
        } else {
            format!("{}{}", DIGEST_MARKER, hex::encode(Sha256::digest(id.as_bytes())))
        };
        self.config
            .dir
            .join(format!("{}.{}", stem, self.config.extension))
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn is_entry_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.config.extension)
    }

    /// Leftover of an interrupted write.
    fn is_temp_file(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "tmp")
            && path
                .file_stem()
                .is_some_and(|stem| self.is_entry_file(Path::new(stem)))
    }

    async fn create_dir(&self) -> SessionResult<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);

        builder.create(&self.config.dir).await.map_err(|e| {
            SessionError::Backend(format!(
                "Failed to create session directory {}: {}",
                self.config.dir.display(),
                e
            ))
        })
    }

    async fn write_entry(&self, path: &Path, value: &[u8]) -> SessionResult<()> {
        let temp = Self::temp_path_for(path);

        let written = match write_temp(&temp, value).await {
            Ok(()) => fs::rename(&temp, path).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&temp).await
                && cleanup.kind() != ErrorKind::NotFound
            {
                warn!(path = ?temp, error = %cleanup, "Failed to remove temporary session file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, id: &str, by: Duration) {
        let when = SystemTime::now() - by;
        set_modified(self.path_for(id), when).await.unwrap();
    }
}

async fn write_temp(temp: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(temp).await?;
    file.write_all(value).await?;
    file.flush().await
}

/// Remove `path` if it has been idle for longer than `max_age`.
///
/// Returns whether this call removed the file. A file that is already gone
/// was purged by someone else and is not an error.
async fn purge_entry(path: &Path, now: SystemTime, max_age: Duration) -> std::io::Result<bool> {
    let modified = match fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age <= max_age {
        return Ok(false);
    }

    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Set a file's modification time.
async fn set_modified(path: PathBuf, when: SystemTime) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(when)
    })
    .await
    .map_err(std::io::Error::other)?
}

#[async_trait]
impl Store for FileStore {
    async fn start(&self) -> SessionResult<()> {
        let _guard = self.lock.lock().await;

        match fs::metadata(&self.config.dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(SessionError::Backend(format!(
                    "{} exists and is not a directory",
                    self.config.dir.display()
                )));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => self.create_dir().await?,
            Err(e) => {
                return Err(SessionError::Backend(format!(
                    "Failed to stat session directory {}: {}",
                    self.config.dir.display(),
                    e
                )));
            }
        }

        info!(path = ?self.config.dir, "Initialized file session store");
        Ok(())
    }

    async fn stop(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn exists(&self, id: &str) -> SessionResult<bool> {
        let _guard = self.lock.lock().await;
        Ok(fs::try_exists(self.path_for(id)).await?)
    }

    async fn get(&self, id: &str) -> SessionResult<Vec<u8>> {
        let _guard = self.lock.lock().await;
        match fs::read(self.path_for(id)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SessionError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, id: &str, value: Vec<u8>) -> SessionResult<()> {
        let _guard = self.lock.lock().await;
        let path = self.path_for(id);
        self.write_entry(&path, &value).await?;
        trace!(key = %id, path = ?path, size = value.len(), "Stored session file");
        Ok(())
    }

    async fn delete(&self, id: &str) -> SessionResult<()> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => {
                debug!(key = %id, "Deleted session file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn touch(&self, id: &str) -> SessionResult<()> {
        let _guard = self.lock.lock().await;
        match set_modified(self.path_for(id), SystemTime::now()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SessionError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn purge(&self, max_age: Duration) -> SessionResult<usize> {
        let _guard = self.lock.lock().await;

        let mut entries = match fs::read_dir(&self.config.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.config.dir, "Session directory missing, nothing to purge");
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_entry = self.is_entry_file(&path);
            if !is_entry && !self.is_temp_file(&path) {
                continue;
            }

            match purge_entry(&path, now, max_age).await {
                Ok(true) if is_entry => removed += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to remove expired session file");
                    return Err(e.into());
                }
            }
        }

        if removed > 0 {
            debug!(removed, path = ?self.config.dir, "Purged expired session files");
        }
        Ok(removed)
    }

    fn requires_purge(&self) -> bool {
        true
    }
}
