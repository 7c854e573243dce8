//! Persistent update cursor.

use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::Result;

/// Single integer cursor: highest processed `update_id` plus one.
pub trait OffsetStore: Send + Sync {
    /// Stored offset, or 0 when nothing usable is stored.
    fn read(&self) -> Result<i64>;

    /// Replace the stored offset.
    fn write(&self, offset: i64) -> Result<()>;
}

/// File-backed store. The file holds exactly the decimal offset.
#[derive(Clone, Debug)]
pub struct FileOffsetStore {
    path: PathBuf,
}

impl FileOffsetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "offset".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl OffsetStore for FileOffsetStore {
    fn read(&self) -> Result<i64> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(parse_offset(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, offset: i64) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write a sibling file and rename it over the target so a reader never
        // sees a half-written or stale-suffixed value.
        let tmp = self.temp_path();
        let written = (|| -> Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(offset.to_string().as_bytes())?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path).map_err(Into::into)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        Ok(())
    }
}

/// In-process store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryOffsetStore {
    value: Mutex<Option<i64>>,
    writes: Mutex<usize>,
}

impl MemoryOffsetStore {
    pub fn with_value(offset: i64) -> Self {
        Self {
            value: Mutex::new(Some(offset)),
            writes: Mutex::new(0),
        }
    }

    /// Number of `write` calls so far.
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OffsetStore for MemoryOffsetStore {
    fn read(&self) -> Result<i64> {
        Ok(self
            .value
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or(0))
    }

    fn write(&self, offset: i64) -> Result<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(offset);
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

fn parse_offset(contents: &str) -> i64 {
    contents
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|v| *v >= 0)
        .unwrap_or(0)
}
