//! File-backed Rate-Limit Store
//!
//! One `<client-key>.json` file per client holding
//! `{"requests": [...], "last_request": ...}`. Every read-modify-write runs
//! under an exclusive advisory lock on that file, on the blocking pool.
//! Correct for a single host only.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use platform::rate_limit::{RateLimitPolicy, RateLimitReason, RateLimitRecord};

use crate::domain::gateway::RateLimitStore;
use crate::error::{ContactError, ContactResult};

const RECORD_EXTENSION: &str = "json";

/// Rate-limit store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileRateLimitStore {
    dir: PathBuf,
}

impl FileRateLimitStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `<tmp>/contact_rate_limit`
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("contact_rate_limit")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> ContactResult<PathBuf> {
        // keys are hex digests; anything else could escape the directory
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ContactError::Internal(format!(
                "Refusing rate-limit key of length {}",
                key.len()
            )));
        }
        Ok(self.dir.join(format!("{}.{}", key, RECORD_EXTENSION)))
    }

    async fn blocking<T, F>(f: F) -> ContactResult<T>
    where
        F: FnOnce() -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| ContactError::Internal(format!("Rate-limit task failed: {}", e)))?
            .map_err(ContactError::from)
    }
}

/// Open the record file for read-write and take the exclusive lock.
/// The lock is released when the returned file is dropped.
fn open_locked(path: &Path) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.lock()?;
    Ok(file)
}

/// Corrupt or empty content is a fresh record
fn read_record(file: &mut File, path: &Path) -> io::Result<RateLimitRecord> {
    file.seek(SeekFrom::Start(0))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    if content.trim().is_empty() {
        return Ok(RateLimitRecord::default());
    }

    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Corrupt rate-limit record, starting fresh");
        RateLimitRecord::default()
    }))
}

fn write_record(file: &mut File, record: &RateLimitRecord) -> io::Result<()> {
    let json = serde_json::to_vec(record)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&json)?;
    file.flush()
}

fn admit_blocking(
    path: &Path,
    now: i64,
    policy: &RateLimitPolicy,
) -> io::Result<Option<RateLimitReason>> {
    let mut file = open_locked(path)?;
    let mut record = read_record(&mut file, path)?;

    let verdict = record.admit(now, policy);
    if verdict.is_none() {
        write_record(&mut file, &record)?;
    }
    Ok(verdict)
}

fn should_reject_blocking(
    path: &Path,
    now: i64,
    policy: &RateLimitPolicy,
) -> io::Result<Option<RateLimitReason>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    file.lock_shared()?;

    let mut record = read_record(&mut file, path)?;
    record.prune(now, policy);
    Ok(record.evaluate(now, policy))
}

fn record_blocking(path: &Path, now: i64, policy: &RateLimitPolicy) -> io::Result<()> {
    let mut file = open_locked(path)?;
    let mut record = read_record(&mut file, path)?;
    record.push(now, policy);
    write_record(&mut file, &record)
}

fn sweep_blocking(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let stale = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);

        if stale {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Could not remove stale record")
                }
            }
        }
    }

    Ok(removed)
}

impl RateLimitStore for FileRateLimitStore {
    async fn admit(
        &self,
        key: &str,
        now: i64,
        policy: &RateLimitPolicy,
    ) -> ContactResult<Option<RateLimitReason>> {
        let path = self.path_for(key)?;
        let policy = *policy;
        Self::blocking(move || admit_blocking(&path, now, &policy)).await
    }

    async fn should_reject(
        &self,
        key: &str,
        now: i64,
        policy: &RateLimitPolicy,
    ) -> ContactResult<Option<RateLimitReason>> {
        let path = self.path_for(key)?;
        let policy = *policy;
        Self::blocking(move || should_reject_blocking(&path, now, &policy)).await
    }

    async fn record(&self, key: &str, now: i64, policy: &RateLimitPolicy) -> ContactResult<()> {
        let path = self.path_for(key)?;
        let policy = *policy;
        Self::blocking(move || record_blocking(&path, now, &policy)).await
    }

    async fn sweep(&self, max_age: Duration) -> ContactResult<usize> {
        let dir = self.dir.clone();
        Self::blocking(move || sweep_blocking(&dir, max_age)).await
    }
}
