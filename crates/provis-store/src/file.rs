//! Directory-backed backend: one JSON document per item.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use provis_types::Record;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::traits::{project, Backend, Criteria, Row};

const EXTENSION: &str = "json";

const MAX_UID_LEN: usize = 128;

/// Map `uid` to its file stem, refusing anything that could leave the
/// data directory.
///
/// Uids may contain ASCII alphanumerics, `.`, `-`, `_` and `:`, must not
/// start with `.` and must not contain `..`. Colons become `%3A`; `%` is
/// never a uid character, so distinct uids get distinct stems.
fn file_stem(uid: &str) -> StoreResult<String> {
    let valid = !uid.is_empty()
        && uid.len() <= MAX_UID_LEN
        && !uid.starts_with('.')
        && !uid.contains("..")
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'));
    if !valid {
        return Err(StoreError::InvalidUid(uid.to_string()));
    }
    Ok(uid.replace(':', "%3A"))
}

/// Backend storing each record as `<dir>/<uid>.json`.
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so a record file is never observed half
/// written. [`Backend::boot`] rebuilds the active set from the files
/// present.
pub struct FileBackend {
    dir: PathBuf,
    active: RwLock<BTreeSet<String>>,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            active: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, uid: &str) -> StoreResult<PathBuf> {
        Ok(self.dir.join(format!("{}.{EXTENSION}", file_stem(uid)?)))
    }

    fn read_record(path: &Path) -> StoreResult<Record> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every readable record in the directory, ordered by uid.
    fn scan(&self) -> StoreResult<Vec<(String, Record)>> {
        let mut records = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION)
            {
                continue;
            }
            match Self::read_record(path) {
                Ok(record) => match record.uid() {
                    Some(uid) => records.push((uid.to_string(), record)),
                    None => warn!(path = %path.display(), "record file without uid"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable record file"),
            }
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }
}

impl Backend for FileBackend {
    fn boot(&self) -> StoreResult<bool> {
        fs::create_dir_all(&self.dir)?;
        let records = self.scan()?;
        let mut active = self.active.write().expect("lock poisoned");
        active.extend(records.into_iter().map(|(uid, _)| uid));
        debug!(dir = %self.dir.display(), records = active.len(), "file backend booted");
        Ok(true)
    }

    fn find(&self, criteria: &Criteria, projection: &[String]) -> StoreResult<Vec<Row>> {
        let _guard = self.active.read().expect("lock poisoned");
        Ok(self
            .scan()?
            .iter()
            .filter(|(_, record)| record.matches(criteria))
            .map(|(uid, record)| project(uid, record, projection))
            .collect())
    }

    fn load(&self, uid: &str) -> StoreResult<Record> {
        let _guard = self.active.read().expect("lock poisoned");
        match Self::read_record(&self.path_for(uid)?) {
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::ItemNotFound(uid.to_string()))
            }
            other => other,
        }
    }

    fn store(&self, record: &Record) -> StoreResult<bool> {
        let uid = record
            .uid()
            .ok_or_else(|| StoreError::InvalidRecord("record has no uid".into()))?;
        let path = self.path_for(uid)?;
        let active = self.active.write().expect("lock poisoned");
        if !active.contains(uid) {
            debug!(uid = %uid, "store skipped for inactive uid");
            return Ok(true);
        }
        let mut writer = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.write_all(b"\n")?;
        writer
            .persist(path)
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(true)
    }

    fn register(&self, uid: &str) -> StoreResult<bool> {
        file_stem(uid)?;
        let mut active = self.active.write().expect("lock poisoned");
        Ok(active.insert(uid.to_string()))
    }

    fn remove(&self, uid: &str) -> StoreResult<bool> {
        let path = self.path_for(uid)?;
        let mut active = self.active.write().expect("lock poisoned");
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(active.remove(uid))
    }
}

impl std::fmt::Debug for FileBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.active.read().expect("lock poisoned");
        f.debug_struct("FileBackend")
            .field("dir", &self.dir)
            .field("active_count", &active.len())
            .finish()
    }
}
