//! Pronunciation dictionary: ingestion, storage, and the shared build handle.
//!
//! A [`DictionaryHandle`] owns the process-wide build. The first call to
//! [`DictionaryHandle::get`] loads the source, parses it, and populates the
//! store; every concurrent caller awaits that same build and receives the
//! same [`Dictionary`] or the same error.

pub mod phoneme;
pub mod record;
pub mod store;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;
use tokio::sync::OnceCell;

pub use phoneme::Phoneme;
pub use record::{IngestBatch, NULL_RHYME_KEY, PronunciationRecord, RhymeTier, normalize_word};
pub use store::{PronunciationStore, RedbStore};

use crate::config::{DictionaryConfig, user_data_dir};
use crate::error::{DictionaryResult, SharedDictionaryError};

/// CMUdict 0.7b, the default pronunciation source.
pub const DEFAULT_SOURCE_URL: &str =
    "https://svn.code.sf.net/p/cmusphinx/code/trunk/cmudict/cmudict-0.7b";

/// File name of the persistent store inside the user data directory.
pub const DEFAULT_STORE_FILE: &str = "rhyme_dict.redb";

/// Default timeout for fetching the source.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;

/// Where pronunciation entries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionarySource {
    /// Fetched over HTTP(S).
    Url(String),
    /// Read from a local file.
    File(Utf8PathBuf),
    /// Already in memory.
    Inline(String),
}

impl Default for DictionarySource {
    fn default() -> Self {
        Self::Url(DEFAULT_SOURCE_URL.to_string())
    }
}

impl fmt::Display for DictionarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{path}"),
            Self::Inline(text) => write!(f, "<inline, {} bytes>", text.len()),
        }
    }
}

impl DictionarySource {
    /// Load the raw source text. Invalid UTF-8 is replaced, not rejected.
    #[tracing::instrument(skip(self), fields(source = %self))]
    pub async fn load(&self, timeout: Duration) -> DictionaryResult<String> {
        match self {
            Self::Url(url) => {
                let client = reqwest::Client::builder().timeout(timeout).build()?;
                let bytes = client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                tracing::info!(bytes = bytes.len(), "downloaded pronunciation source");
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Self::File(path) => {
                let bytes = tokio::fs::read(path).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Self::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Which store backs the dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Rebuilt from the source on every process start.
    Memory,
    /// Persisted at the given path and reused across runs.
    Redb(Utf8PathBuf),
}

/// Everything needed to build a [`Dictionary`].
#[derive(Debug, Clone)]
pub struct DictionaryOptions {
    /// Pronunciation source.
    pub source: DictionarySource,
    /// Storage backend.
    pub backend: Backend,
    /// Ignore an existing persisted store and ingest again.
    pub rebuild: bool,
    /// Timeout for fetching a URL source.
    pub fetch_timeout: Duration,
}

impl DictionaryOptions {
    /// In-memory dictionary over `source`.
    pub fn in_memory(source: DictionarySource) -> Self {
        Self {
            source,
            backend: Backend::Memory,
            rebuild: false,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Options described by the `[dictionary]` config section.
    ///
    /// A local `source_file` takes precedence over `source_url`. Without an
    /// explicit `path`, the store lives in the user data directory; if that
    /// cannot be determined, the dictionary falls back to memory.
    pub fn from_config(config: &DictionaryConfig) -> Self {
        let source = match (&config.source_file, &config.source_url) {
            (Some(file), _) => DictionarySource::File(file.clone()),
            (None, Some(url)) => DictionarySource::Url(url.clone()),
            (None, None) => DictionarySource::default(),
        };
        let backend = if config.in_memory {
            Backend::Memory
        } else if let Some(path) = config.path.clone().or_else(default_store_path) {
            Backend::Redb(path)
        } else {
            tracing::warn!("no user data directory; keeping dictionary in memory");
            Backend::Memory
        };
        Self {
            source,
            backend,
            rebuild: false,
            fetch_timeout: Duration::from_secs(
                config.timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
        }
    }

    /// Force re-ingestion even if a complete store exists.
    #[must_use]
    pub const fn with_rebuild(mut self, rebuild: bool) -> Self {
        self.rebuild = rebuild;
        self
    }
}

/// `<user data dir>/rhyme_dict.redb`.
pub fn default_store_path() -> Option<Utf8PathBuf> {
    user_data_dir().map(|dir| dir.join(DEFAULT_STORE_FILE))
}

/// How the store came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOrigin {
    /// The source was parsed and written into the store.
    Ingested,
    /// A complete persisted store was reused as-is.
    Reused,
}

/// Summary of a dictionary build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Whether the source was ingested on this build.
    pub origin: BuildOrigin,
    /// Words in the store.
    pub words: u64,
    /// Source entries dropped as duplicates (0 when reused).
    pub duplicates: usize,
    /// Store location, if persistent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,
}

/// A built, read-only pronunciation dictionary. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dictionary {
    store: Arc<PronunciationStore>,
    report: Arc<BuildReport>,
}

impl Dictionary {
    /// Parse `text` into an in-memory dictionary.
    pub fn from_source_text(text: &str) -> DictionaryResult<Self> {
        let batch = record::parse_source(text)?;
        Ok(Self::new(
            PronunciationStore::from_records(batch.records),
            BuildOrigin::Ingested,
            batch.duplicates,
            None,
        ))
    }

    fn new(
        store: PronunciationStore,
        origin: BuildOrigin,
        duplicates: usize,
        path: Option<Utf8PathBuf>,
    ) -> Self {
        let report = BuildReport {
            origin,
            words: store.len(),
            duplicates,
            path,
        };
        Self {
            store: Arc::new(store),
            report: Arc::new(report),
        }
    }

    /// Build according to `options`.
    ///
    /// With a redb backend and no rebuild requested, a complete store on disk
    /// is reused without touching the source. If another process keeps that
    /// store locked, the source is ingested into memory instead and the file
    /// is left alone.
    #[tracing::instrument(skip_all, fields(source = %options.source, backend = ?options.backend))]
    pub async fn build(options: &DictionaryOptions) -> DictionaryResult<Self> {
        let mut persist = match &options.backend {
            Backend::Memory => None,
            Backend::Redb(path) => Some(RedbStore::new(path.clone())),
        };
        if let Some(redb) = persist.clone()
            && !options.rebuild
        {
            let path = redb.path().to_path_buf();
            match tokio::task::spawn_blocking(move || redb.load()).await? {
                Ok(Some(records)) => {
                    let store = PronunciationStore::from_records(records);
                    tracing::info!(%path, words = store.len(), "reusing pronunciation store");
                    return Ok(Self::new(store, BuildOrigin::Reused, 0, Some(path)));
                }
                Ok(None) => {}
                Err(e) if store::is_lock_contention(&e) => {
                    tracing::warn!(%path, "pronunciation store is locked; building in memory");
                    persist = None;
                }
                Err(e) => return Err(e),
            }
        }

        let text = options.source.load(options.fetch_timeout).await?;
        let dictionary = tokio::task::spawn_blocking(move || -> DictionaryResult<Self> {
            let batch = record::parse_source(&text)?;
            let path = match persist {
                Some(redb) => {
                    redb.save(&batch.records)?;
                    Some(redb.path().to_path_buf())
                }
                None => None,
            };
            Ok(Self::new(
                PronunciationStore::from_records(batch.records),
                BuildOrigin::Ingested,
                batch.duplicates,
                path,
            ))
        })
        .await??;

        tracing::info!(
            words = dictionary.report.words,
            duplicates = dictionary.report.duplicates,
            "ingested pronunciation source"
        );
        Ok(dictionary)
    }

    /// How this dictionary was built.
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// The underlying store.
    pub fn store(&self) -> &PronunciationStore {
        &self.store
    }

    /// Look up `word` after normalizing it. Blocks on storage I/O.
    pub fn lookup_blocking(&self, word: &str) -> DictionaryResult<Option<PronunciationRecord>> {
        let normalized = normalize_word(word);
        if normalized.is_empty() {
            return Ok(None);
        }
        Ok(self.store.lookup(&normalized))
    }

    /// Look up `word` on the blocking pool.
    pub async fn lookup(&self, word: &str) -> DictionaryResult<Option<PronunciationRecord>> {
        let this = self.clone();
        let word = word.to_string();
        tokio::task::spawn_blocking(move || this.lookup_blocking(&word)).await?
    }
}

type BuildCell = OnceCell<Result<Dictionary, SharedDictionaryError>>;

/// Process-wide, build-once access to a [`Dictionary`].
#[derive(Debug)]
pub struct DictionaryHandle {
    options: DictionaryOptions,
    cell: Mutex<Arc<BuildCell>>,
    ingestions: AtomicUsize,
}

impl DictionaryHandle {
    /// A handle that builds from `options` on first use.
    pub fn new(options: DictionaryOptions) -> Self {
        Self {
            options,
            cell: Mutex::new(Arc::new(OnceCell::new())),
            ingestions: AtomicUsize::new(0),
        }
    }

    /// A handle that is already built.
    pub fn prebuilt(dictionary: Dictionary) -> Self {
        let handle = Self::new(DictionaryOptions::in_memory(DictionarySource::Inline(
            String::new(),
        )));
        let published = handle.current().set(Ok(dictionary));
        debug_assert!(published.is_ok());
        handle
    }

    /// The options this handle builds from.
    pub fn options(&self) -> &DictionaryOptions {
        &self.options
    }

    fn current(&self) -> Arc<BuildCell> {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Await the shared build, starting it if nobody has yet.
    ///
    /// A failure is published like a success: every caller sees the same
    /// error until [`teardown`](Self::teardown) is called.
    pub async fn get(&self) -> Result<Dictionary, SharedDictionaryError> {
        let cell = self.current();
        cell.get_or_init(|| async {
            match Dictionary::build(&self.options).await {
                Ok(dictionary) => {
                    if dictionary.report().origin == BuildOrigin::Ingested {
                        self.ingestions.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(dictionary)
                }
                Err(e) => {
                    tracing::error!(error = %e, "pronunciation dictionary build failed");
                    Err(Arc::new(e))
                }
            }
        })
        .await
        .clone()
    }

    /// Whether a successful build has been published.
    pub fn is_ready(&self) -> bool {
        matches!(self.current().get(), Some(Ok(_)))
    }

    /// Drop the published outcome so the next [`get`](Self::get) builds again.
    ///
    /// Callers already holding a [`Dictionary`] keep using it.
    pub fn teardown(&self) {
        *self.cell.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(OnceCell::new());
        tracing::debug!("pronunciation dictionary torn down");
    }

    /// How many times this handle ingested the source.
    pub fn ingestions(&self) -> usize {
        self.ingestions.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DictionaryError;
    use crate::test_support::SAMPLE_DICT;
    use tempfile::TempDir;

    fn redb_options(tmp: &TempDir, source: DictionarySource) -> DictionaryOptions {
        let path = Utf8PathBuf::try_from(tmp.path().join(DEFAULT_STORE_FILE)).unwrap();
        DictionaryOptions {
            backend: Backend::Redb(path),
            ..DictionaryOptions::in_memory(source)
        }
    }

    #[tokio::test]
    async fn lookup_normalizes_and_misses_are_none() {
        let dict = Dictionary::from_source_text(SAMPLE_DICT).unwrap();
        let record = dict.lookup("Night,").await.unwrap().unwrap();
        assert_eq!(record.word, "NIGHT");
        assert!(dict.lookup("zyzzyva").await.unwrap().is_none());
        assert!(dict.lookup("1999").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_access_builds_once() {
        let handle = Arc::new(DictionaryHandle::new(DictionaryOptions::in_memory(
            DictionarySource::Inline(SAMPLE_DICT.to_string()),
        )));
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                tokio::spawn(async move { handle.get().await.map(|d| d.report().words) })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().unwrap() > 0);
        }
        assert_eq!(handle.ingestions(), 1);
        assert!(handle.is_ready());
    }

    #[tokio::test]
    async fn failure_is_shared_until_teardown() {
        let tmp = TempDir::new().unwrap();
        let source_path = Utf8PathBuf::try_from(tmp.path().join("cmudict.txt")).unwrap();
        let handle = DictionaryHandle::new(DictionaryOptions::in_memory(
            DictionarySource::File(source_path.clone()),
        ));

        let first = handle.get().await.unwrap_err();
        let second = handle.get().await.unwrap_err();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(*first, DictionaryError::Io(_)));
        assert!(!handle.is_ready());

        std::fs::write(&source_path, SAMPLE_DICT).unwrap();
        assert!(handle.get().await.is_err(), "outcome stays published");

        handle.teardown();
        assert!(handle.get().await.is_ok());
        assert_eq!(handle.ingestions(), 1);
    }

    #[tokio::test]
    async fn persisted_store_is_reused_unless_rebuild() {
        let tmp = TempDir::new().unwrap();
        let source = DictionarySource::Inline(SAMPLE_DICT.to_string());

        let first = DictionaryHandle::new(redb_options(&tmp, source.clone()));
        let built = first.get().await.unwrap();
        assert_eq!(built.report().origin, BuildOrigin::Ingested);
        assert_eq!(first.ingestions(), 1);
        drop(built);
        drop(first);

        // The source is never read when the store is reused.
        let reuse = DictionaryHandle::new(redb_options(
            &tmp,
            DictionarySource::Inline(";;; nothing here\n".to_string()),
        ));
        let reused = reuse.get().await.unwrap();
        assert_eq!(reused.report().origin, BuildOrigin::Reused);
        assert_eq!(reuse.ingestions(), 0);
        assert!(reused.lookup("blue").await.unwrap().is_some());
        drop(reused);
        drop(reuse);

        let rebuild = DictionaryHandle::new(redb_options(&tmp, source).with_rebuild(true));
        let rebuilt = rebuild.get().await.unwrap();
        assert_eq!(rebuilt.report().origin, BuildOrigin::Ingested);
        assert_eq!(rebuild.ingestions(), 1);
    }

    #[tokio::test]
    async fn two_handles_share_one_persisted_store() {
        let tmp = TempDir::new().unwrap();
        let source = DictionarySource::Inline(SAMPLE_DICT.to_string());
        drop(DictionaryHandle::new(redb_options(&tmp, source.clone())).get().await.unwrap());

        let editor = DictionaryHandle::new(redb_options(&tmp, source.clone()));
        let held = editor.get().await.unwrap();
        assert_eq!(held.report().origin, BuildOrigin::Reused);

        let terminal = DictionaryHandle::new(redb_options(&tmp, source));
        let second = terminal.get().await.unwrap();
        assert_eq!(second.report().origin, BuildOrigin::Reused);
        assert_eq!(terminal.ingestions(), 0);
        assert!(held.lookup("night").await.unwrap().is_some());
        assert!(second.lookup("night").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn locked_store_falls_back_to_memory() {
        let tmp = TempDir::new().unwrap();
        let options = redb_options(&tmp, DictionarySource::Inline(SAMPLE_DICT.to_string()));
        let Backend::Redb(path) = options.backend.clone() else {
            unreachable!()
        };
        RedbStore::new(path.clone())
            .save(&record::parse_source(SAMPLE_DICT).unwrap().records)
            .unwrap();

        let held = redb::Database::open(path.as_std_path()).unwrap();
        let handle = DictionaryHandle::new(options);
        let dict = handle.get().await.unwrap();
        assert_eq!(dict.report().origin, BuildOrigin::Ingested);
        assert!(dict.report().path.is_none());
        assert!(dict.lookup("blue").await.unwrap().is_some());
        drop(held);

        let reused = RedbStore::new(path).load().unwrap();
        assert!(reused.is_some(), "held store is left intact");
    }

    #[tokio::test]
    async fn malformed_source_fails_build() {
        let handle = DictionaryHandle::new(DictionaryOptions::in_memory(
            DictionarySource::Inline("RED R EH1 D\n".to_string()),
        ));
        let err = handle.get().await.unwrap_err();
        assert!(matches!(*err, DictionaryError::MalformedEntry { line: 1, .. }));
    }

    #[tokio::test]
    async fn file_source_decodes_lossily() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("latin1.txt")).unwrap();
        let mut bytes = b";;; caf\xe9 comment\n".to_vec();
        bytes.extend_from_slice(b"RED  R EH1 D\n");
        std::fs::write(&path, bytes).unwrap();

        let text = DictionarySource::File(path)
            .load(Duration::from_secs(1))
            .await
            .unwrap();
        assert!(text.contains('\u{FFFD}'));
        assert!(Dictionary::from_source_text(&text).is_ok());
    }

    #[test]
    fn options_from_config_prefer_local_file() {
        let config = DictionaryConfig {
            source_file: Some(Utf8PathBuf::from("dict.txt")),
            source_url: Some("https://example.invalid/dict".to_string()),
            path: Some(Utf8PathBuf::from("/tmp/store.redb")),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let options = DictionaryOptions::from_config(&config);
        assert_eq!(options.source, DictionarySource::File("dict.txt".into()));
        assert_eq!(options.backend, Backend::Redb("/tmp/store.redb".into()));
        assert_eq!(options.fetch_timeout, Duration::from_secs(5));

        let memory = DictionaryOptions::from_config(&DictionaryConfig {
            in_memory: true,
            ..Default::default()
        });
        assert_eq!(memory.backend, Backend::Memory);
        assert_eq!(memory.source, DictionarySource::default());
    }
}
