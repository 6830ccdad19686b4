//! Pronunciation storage.
//!
//! Queries always run against [`PronunciationStore`], a sorted in-process
//! index. [`RedbStore`] persists the parsed records in a `redb` file so later
//! runs can skip the download and parse. The file is opened only long enough
//! to load or save a snapshot, so several processes can share one store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use redb::{Database, ReadableTable, TableDefinition};

use super::record::{NULL_RHYME_KEY, PronunciationRecord, RhymeTier};
use crate::error::{DictionaryError, DictionaryResult};

/// Records keyed by word, with one rhyme index per tier.
#[derive(Debug, Default)]
pub struct PronunciationStore {
    records: HashMap<String, PronunciationRecord>,
    index: [BTreeMap<String, BTreeSet<String>>; 3],
}

impl PronunciationStore {
    /// Index a batch of records.
    pub fn from_records(records: Vec<PronunciationRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            for (slot, key) in store.index.iter_mut().zip(record.rhyme_keys.iter()) {
                if key != NULL_RHYME_KEY {
                    slot.entry(key.clone())
                        .or_default()
                        .insert(record.word.clone());
                }
            }
            store.records.insert(record.word.clone(), record);
        }
        store
    }

    /// Look up a normalized word.
    pub fn lookup(&self, normalized: &str) -> Option<PronunciationRecord> {
        self.records.get(normalized).cloned()
    }

    /// Words sharing `key` in `tier`, in ascending order, at most `limit`.
    ///
    /// The `NULL` sentinel key matches nothing.
    pub fn find_by_rhyme_key(&self, tier: RhymeTier, key: &str, limit: usize) -> Vec<String> {
        if key == NULL_RHYME_KEY {
            return Vec::new();
        }
        self.index[tier.window() - 1]
            .get(key)
            .map(|words| words.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Number of stored words.
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    /// Returns `true` if the store holds no words.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

const WORDS: TableDefinition<&str, &str> = TableDefinition::new("words");
const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

/// Written in the same transaction as the records; absent means incomplete.
const COMPLETE_MARKER: &str = "complete";

/// How long [`RedbStore::load`] waits for another process to release the file.
const LOCK_ATTEMPTS: u32 = 10;
const LOCK_BACKOFF: Duration = Duration::from_millis(50);

/// Persistent snapshot of parsed records in a `redb` file.
#[derive(Debug, Clone)]
pub struct RedbStore {
    path: Utf8PathBuf,
}

impl RedbStore {
    /// A store at `path`. Nothing is opened until [`load`](Self::load) or
    /// [`save`](Self::save).
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the database file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Read every record from a fully built store.
    ///
    /// Returns `Ok(None)` when the file is missing or has no completion
    /// marker, i.e. a previous build never committed. If another process
    /// keeps the file locked past a short retry window, the error is
    /// [`redb::Error::DatabaseAlreadyOpen`]; see [`is_lock_contention`].
    #[tracing::instrument(skip(self), fields(path = %self.path))]
    pub fn load(&self) -> DictionaryResult<Option<Vec<PronunciationRecord>>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let db = self.open_shared()?;
        let txn = db.begin_read().map_err(redb::Error::from)?;
        let meta = match txn.open_table(META) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => {
                tracing::warn!("found incomplete pronunciation store");
                return Ok(None);
            }
            Err(e) => return Err(redb::Error::from(e).into()),
        };
        if meta.get(COMPLETE_MARKER).map_err(redb::Error::from)?.is_none() {
            tracing::warn!("found incomplete pronunciation store");
            return Ok(None);
        }

        let words = txn.open_table(WORDS).map_err(redb::Error::from)?;
        let mut records = Vec::new();
        for entry in words.iter().map_err(redb::Error::from)? {
            let (word, value) = entry.map_err(redb::Error::from)?;
            let record = serde_json::from_str(value.value()).map_err(|source| {
                DictionaryError::CorruptRecord {
                    word: word.value().to_string(),
                    source,
                }
            })?;
            records.push(record);
        }
        Ok(Some(records))
    }

    fn open_shared(&self) -> DictionaryResult<Database> {
        let mut attempt = 1;
        loop {
            match Database::open(self.path.as_std_path()) {
                Ok(db) => return Ok(db),
                Err(redb::DatabaseError::DatabaseAlreadyOpen) if attempt < LOCK_ATTEMPTS => {
                    tracing::debug!(attempt, "pronunciation store busy");
                    attempt += 1;
                    thread::sleep(LOCK_BACKOFF);
                }
                Err(e) => return Err(redb::Error::from(e).into()),
            }
        }
    }

    /// Write `records` to a fresh file, replacing any existing one.
    ///
    /// All records and the completion marker commit in one transaction. A
    /// failed write removes the partial file.
    #[tracing::instrument(skip(self, records), fields(path = %self.path, records = records.len()))]
    pub fn save(&self, records: &[PronunciationRecord]) -> DictionaryResult<()> {
        let path = &self.path;
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let db = Database::create(path.as_std_path()).map_err(redb::Error::from)?;
        let written = populate(&db, records);
        drop(db);
        if written.is_err()
            && let Err(remove) = std::fs::remove_file(path)
        {
            tracing::warn!(%path, error = %remove, "could not remove failed store");
        }
        written
    }
}

/// Whether `err` means another process is holding the store file.
pub fn is_lock_contention(err: &DictionaryError) -> bool {
    matches!(err, DictionaryError::Storage(redb::Error::DatabaseAlreadyOpen))
}

fn populate(db: &Database, records: &[PronunciationRecord]) -> DictionaryResult<()> {
    let txn = db.begin_write().map_err(redb::Error::from)?;
    {
        let mut words = txn.open_table(WORDS).map_err(redb::Error::from)?;
        for record in records {
            let json =
                serde_json::to_string(record).map_err(|source| DictionaryError::CorruptRecord {
                    word: record.word.clone(),
                    source,
                })?;
            words
                .insert(record.word.as_str(), json.as_str())
                .map_err(redb::Error::from)?;
        }

        let mut meta = txn.open_table(META).map_err(redb::Error::from)?;
        let count = records.len().to_string();
        meta.insert(COMPLETE_MARKER, count.as_str())
            .map_err(redb::Error::from)?;
    }
    txn.commit().map_err(redb::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::record::parse_source;
    use crate::test_support::SAMPLE_DICT;
    use tempfile::TempDir;

    fn sample_records() -> Vec<PronunciationRecord> {
        parse_source(SAMPLE_DICT).unwrap().records
    }

    fn redb_store(tmp: &TempDir) -> RedbStore {
        let path = tmp.path().join("nested").join("rhyme_dict.redb");
        RedbStore::new(Utf8PathBuf::try_from(path).unwrap())
    }

    #[test]
    fn lookup_hits_and_misses() {
        let store = PronunciationStore::from_records(sample_records());
        let record = store.lookup("NIGHT").unwrap();
        assert_eq!(record.rhyme_key(RhymeTier::Two), "AY T");
        assert!(store.lookup("XYZZY").is_none());
    }

    #[test]
    fn rhyme_index_is_sorted_and_capped() {
        let store = PronunciationStore::from_records(sample_records());
        let words = store.find_by_rhyme_key(RhymeTier::Two, "AY T", 3);
        assert_eq!(words, vec!["BRIGHT", "DELIGHT", "FLIGHT"]);
    }

    #[test]
    fn null_key_matches_nothing() {
        let store = PronunciationStore::from_records(sample_records());
        assert!(store.find_by_rhyme_key(RhymeTier::Three, NULL_RHYME_KEY, 10).is_empty());
    }

    #[test]
    fn redb_round_trips_records() {
        let tmp = TempDir::new().unwrap();
        let redb = redb_store(&tmp);
        let records = sample_records();
        redb.save(&records).unwrap();

        let loaded = redb.load().unwrap().expect("complete store");
        assert_eq!(loaded.len(), records.len());
        let store = PronunciationStore::from_records(loaded);
        let light = store.lookup("LIGHT").unwrap();
        assert_eq!(light, records.iter().find(|r| r.word == "LIGHT").unwrap().clone());
        assert_eq!(
            store.find_by_rhyme_key(RhymeTier::Three, "L AY T", 3),
            vec!["DELIGHT", "FLIGHT", "LIGHT"]
        );
    }

    #[test]
    fn load_releases_the_file() {
        let tmp = TempDir::new().unwrap();
        let redb = redb_store(&tmp);
        redb.save(&sample_records()).unwrap();

        let first = redb.load().unwrap().unwrap();
        let second = redb.load().unwrap().unwrap();
        assert_eq!(first.len(), second.len());
        drop(Database::open(redb.path().as_std_path()).unwrap());
    }

    #[test]
    fn held_file_reports_lock_contention() {
        let tmp = TempDir::new().unwrap();
        let redb = redb_store(&tmp);
        redb.save(&sample_records()).unwrap();

        let held = Database::open(redb.path().as_std_path()).unwrap();
        let err = redb.load().unwrap_err();
        assert!(is_lock_contention(&err), "{err}");
        drop(held);
        assert!(redb.load().unwrap().is_some());
    }

    #[test]
    fn missing_or_unmarked_store_is_not_complete() {
        let tmp = TempDir::new().unwrap();
        let redb = redb_store(&tmp);
        assert!(redb.load().unwrap().is_none());

        std::fs::create_dir_all(redb.path().parent().unwrap()).unwrap();
        drop(Database::create(redb.path().as_std_path()).unwrap());
        assert!(redb.load().unwrap().is_none());
    }
}
