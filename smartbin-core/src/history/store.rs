use super::ClassificationRecord;
use crate::error::{Result, SmartBinError};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Narrow persistence interface for scan history
pub trait HistoryStore: Send + Sync {
    /// Add a record at the end of the history
    fn append(&self, record: ClassificationRecord) -> Result<()>;

    /// Every stored record, oldest first
    fn list_all(&self) -> Result<Vec<ClassificationRecord>>;

    /// Up to `limit` records, newest first
    fn list_recent(&self, limit: usize) -> Result<Vec<ClassificationRecord>> {
        let mut records = self.list_all()?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    /// Look a record up by id
    fn get(&self, id: &str) -> Result<Option<ClassificationRecord>> {
        Ok(self.list_all()?.into_iter().find(|r| r.id == id))
    }
}

fn enforce_limit<T>(records: &mut Vec<T>, max_records: Option<usize>) {
    if let Some(max) = max_records {
        if records.len() > max {
            let excess = records.len() - max;
            records.drain(..excess);
        }
    }
}

/// History kept as a pretty-printed JSON array on disk.
///
/// Appends are serialized behind a mutex and the file is replaced
/// atomically (temp file in the same directory, then rename), so concurrent
/// requests never lose each other's records.
///
/// Entries are decoded one by one. An entry that is not a valid
/// [`ClassificationRecord`] is skipped when listing but left untouched in
/// the file. Only a file that is not a JSON array is quarantined.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    max_records: Option<usize>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and if needed create) the history file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            fs::write(&path, "[]")?;
        }
        Ok(Self {
            path,
            max_records: None,
            write_lock: Mutex::new(()),
        })
    }

    /// Keep at most `max` records, dropping the oldest on append
    pub fn with_max_records(mut self, max: Option<usize>) -> Self {
        self.max_records = max;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_entries(&self, entries: &[Value]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut temp, entries)?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| SmartBinError::Io(e.error))?;
        Ok(())
    }

    /// Move an unparseable history file aside so new scans can be stored
    fn quarantine(&self) -> Result<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{stamp}"));
        let backup = PathBuf::from(name);
        fs::rename(&self.path, &backup)?;
        Ok(backup)
    }
}

impl HistoryStore for JsonFileStore {
    fn append(&self, record: ClassificationRecord) -> Result<()> {
        record.validate()?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SmartBinError::History("history lock poisoned".to_string()))?;

        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(SmartBinError::Json(e)) => {
                let backup = self.quarantine()?;
                warn!(error = %e, backup = %backup.display(), "history file unreadable, starting a new one");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        entries.push(serde_json::to_value(&record)?);
        enforce_limit(&mut entries, self.max_records);
        self.write_entries(&entries)?;
        debug!(path = %self.path.display(), total = entries.len(), "history record appended");
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ClassificationRecord>> {
        match self.read_entries() {
            Ok(entries) => Ok(decode_entries(entries, &self.path)),
            Err(SmartBinError::Json(e)) => {
                warn!(error = %e, path = %self.path.display(), "history file unreadable, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn decode_entries(entries: Vec<Value>, path: &Path) -> Vec<ClassificationRecord> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, index, path = %path.display(), "skipping unreadable history entry");
                None
            }
        })
        .collect()
}

/// In-memory history, for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ClassificationRecord>>,
    max_records: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_records(mut self, max: Option<usize>) -> Self {
        self.max_records = max;
        self
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, record: ClassificationRecord) -> Result<()> {
        record.validate()?;
        let mut records = self
            .records
            .write()
            .map_err(|_| SmartBinError::History("history lock poisoned".to_string()))?;
        records.push(record);
        enforce_limit(&mut records, self.max_records);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ClassificationRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| SmartBinError::History("history lock poisoned".to_string()))?;
        Ok(records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(text: &str) -> ClassificationRecord {
        ClassificationRecord::new(
            format!("{text}.jpg"),
            &Classification {
                text: text.to_string(),
                confidence: None,
                model_used: "Mock".to_string(),
            },
        )
    }

    #[test]
    fn test_open_creates_empty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("db.json");
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.list_all().unwrap().is_empty());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_append_and_list_order() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).unwrap();
        for name in ["first", "second", "third"] {
            store.append(record(name)).unwrap();
        }

        let all: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.original_name)
            .collect();
        assert_eq!(all, vec!["first.jpg", "second.jpg", "third.jpg"]);

        let recent: Vec<String> = store
            .list_recent(2)
            .unwrap()
            .into_iter()
            .map(|r| r.original_name)
            .collect();
        assert_eq!(recent, vec!["third.jpg", "second.jpg"]);
    }

    #[test]
    fn test_file_is_a_pretty_json_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.append(record("can")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n"));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["originalName"], "can.jpg");
    }

    #[test]
    fn test_get_by_id() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).unwrap();
        let rec = record("jar");
        let id = rec.id.clone();
        store.append(rec).unwrap();

        assert_eq!(store.get(&id).unwrap().unwrap().original_name, "jar.jpg");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_retention_drops_oldest() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json"))
            .unwrap()
            .with_max_records(Some(2));
        for name in ["a", "b", "c"] {
            store.append(record(name)).unwrap();
        }
        let names: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.original_name)
            .collect();
        assert_eq!(names, vec!["b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty_and_is_quarantined_on_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::open(&path).unwrap();

        assert!(store.list_all().unwrap().is_empty());

        store.append(record("fresh")).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            fs::read_to_string(backups[0].path()).unwrap(),
            "{ not json"
        );
    }

    #[test]
    fn test_malformed_entry_does_not_hide_the_rest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let entries = serde_json::json!([
            {
                "id": "a",
                "timestamp": "2024-05-01T10:20:30.000Z",
                "labelText": "Glass jar"
            },
            {
                "id": "b",
                "timestamp": "2024-05-02T10:20:30.000Z",
                "label": "bottle",
                "confidence": "92.4"
            }
        ]);
        fs::write(&path, entries.to_string()).unwrap();
        let store = JsonFileStore::open(&path).unwrap();

        let ids: Vec<String> = store.list_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);

        let fresh = record("fresh");
        let fresh_id = fresh.id.clone();
        store.append(fresh).unwrap();

        let ids: Vec<String> = store.list_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a".to_string(), fresh_id]);

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[1]["confidence"], "92.4");

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(backups, 0);
    }

    #[test]
    fn test_non_array_file_is_quarantined() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, r#"{"records": []}"#).unwrap();
        let store = JsonFileStore::open(&path).unwrap();

        assert!(store.list_all().unwrap().is_empty());
        store.append(record("fresh")).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert!(fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains(".corrupt-")));
    }

    #[test]
    fn test_blank_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "\n").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).unwrap();
        let mut bad = record("bad");
        bad.confidence = Some(250.0);
        assert!(store.append(bad).is_err());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_appends_are_not_lost() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("db.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.append(record(&format!("scan{i}"))).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.list_all().unwrap().len(), 8);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new().with_max_records(Some(3));
        for name in ["a", "b", "c", "d"] {
            store.append(record(name)).unwrap();
        }
        let recent = store.list_recent(10).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].original_name, "d.jpg");
        assert_eq!(recent[2].original_name, "b.jpg");
    }
}
