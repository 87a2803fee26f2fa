//! Per-device profile documents and debounced saving.
//!
//! Each deck persists one JSON document, keyed by its serial number:
//!
//! ```json
//! {
//!   "active-profile": "<id>",
//!   "profiles": [{"id": "...", "name": "...", "brightness": 0.5, "page": [...]}]
//! }
//! ```
//!
//! Loading never fails: a missing or unreadable document yields a single
//! "Default" profile.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{DeckError, Result};
use crate::page::PageTree;
use crate::profile::{DEFAULT_PROFILE_NAME, Profile};

/// Default delay between the first unsaved change and the write.
pub const SAVE_DELAY: Duration = Duration::from_secs(5);

/// Where profile documents live.
pub trait ProfileStore: Send {
    /// Read the document for `serial`, `Ok(None)` when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error when a document exists but cannot be read.
    fn load(&self, serial: &str) -> Result<Option<String>>;

    /// Replace the document for `serial`.
    ///
    /// # Errors
    ///
    /// Returns [`DeckError::Persistence`] when the write fails.
    fn save(&self, serial: &str, contents: &str) -> Result<()>;
}

/// Documents stored as `<dir>/<serial>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `serial`. Path separators in the serial are
    /// replaced so the file always lands in the store directory.
    pub fn path_for(&self, serial: &str) -> PathBuf {
        let name: String = serial
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl ProfileStore for FileStore {
    fn load(&self, serial: &str) -> Result<Option<String>> {
        let path = self.path_for(serial);
        debug!(path = %path.display(), "Loading profiles");
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DeckError::Persistence(format!("{}: {e}", path.display()))),
        }
    }

    fn save(&self, serial: &str, contents: &str) -> Result<()> {
        let path = self.path_for(serial);
        let persistence = |e: std::io::Error| DeckError::Persistence(format!("{}: {e}", path.display()));

        fs::create_dir_all(&self.dir).map_err(persistence)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(persistence)?;
        fs::rename(&tmp, &path).map_err(persistence)?;

        debug!(path = %path.display(), bytes = contents.len(), "Saved profiles");
        Ok(())
    }
}

/// In-process store that counts writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one document.
    pub fn with_document(serial: &str, contents: &str) -> Self {
        let store = Self::new();
        store.insert(serial, contents);
        store
    }

    pub fn insert(&self, serial: &str, contents: &str) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(serial.to_string(), contents.to_string());
        }
    }

    pub fn get(&self, serial: &str) -> Option<String> {
        self.documents.lock().ok()?.get(serial).cloned()
    }

    /// Number of successful `save` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self, serial: &str) -> Result<Option<String>> {
        Ok(self.get(serial))
    }

    fn save(&self, serial: &str, contents: &str) -> Result<()> {
        self.insert(serial, contents);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Profiles of one deck, as loaded.
#[derive(Debug)]
pub struct LoadedProfiles {
    pub profiles: Vec<Profile>,
    /// Index of the active profile in `profiles`
    pub active: usize,
}

impl LoadedProfiles {
    /// One "Default" profile with an all-empty root page.
    pub fn fallback(pages: &mut PageTree) -> Self {
        Self {
            profiles: vec![Profile::new(pages, DEFAULT_PROFILE_NAME)],
            active: 0,
        }
    }
}

/// Load the profiles of `serial`, falling back to defaults on any problem.
pub fn load_profiles(store: &dyn ProfileStore, serial: &str, pages: &mut PageTree) -> LoadedProfiles {
    let contents = match store.load(serial) {
        Ok(Some(contents)) => contents,
        Ok(None) => {
            debug!(serial, "No saved profiles");
            return LoadedProfiles::fallback(pages);
        }
        Err(e) => {
            warn!(serial, error = %e, "Failed to read profiles");
            return LoadedProfiles::fallback(pages);
        }
    };

    match parse_document(&contents, pages) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(serial, error = %e, "Ignoring corrupt profile document");
            LoadedProfiles::fallback(pages)
        }
    }
}

/// Parse a profile document.
///
/// An unknown `active-profile` selects the first profile.
///
/// # Errors
///
/// Returns [`DeckError::Persistence`] when the text is not JSON or holds no
/// usable profile. Nothing is allocated in `pages` in that case.
pub fn parse_document(contents: &str, pages: &mut PageTree) -> Result<LoadedProfiles> {
    let root: Value = serde_json::from_str(contents)
        .map_err(|e| DeckError::Persistence(format!("invalid JSON: {e}")))?;

    let entries = root
        .get("profiles")
        .and_then(Value::as_array)
        .filter(|profiles| profiles.iter().any(Value::is_object))
        .ok_or_else(|| DeckError::Persistence("document has no profiles".to_string()))?;

    let profiles: Vec<Profile> = entries
        .iter()
        .filter_map(|entry| Profile::from_json(pages, entry))
        .collect();

    let active_id = root.get("active-profile").and_then(Value::as_str);
    let active = active_id
        .and_then(|id| profiles.iter().position(|p| p.id() == id))
        .unwrap_or(0);

    Ok(LoadedProfiles { profiles, active })
}

/// Render the document for `profiles`, pretty printed.
///
/// # Errors
///
/// Returns [`DeckError::Json`] if serialization fails.
pub fn render_document(active_id: &str, profiles: &[Profile], pages: &PageTree) -> Result<String> {
    let document = json!({
        "active-profile": active_id,
        "profiles": profiles.iter().map(|p| p.to_json(pages)).collect::<Vec<_>>(),
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

/// One-shot save timer.
///
/// The first change arms the timer; changes while it is pending are absorbed
/// into the same save.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    delay: Duration,
    pending_since: Option<Instant>,
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new(SAVE_DELAY)
    }
}

impl SaveScheduler {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending_since: None,
        }
    }

    /// Note a change at `now`. Returns true if this armed the timer.
    pub fn request(&mut self, now: Instant) -> bool {
        if self.pending_since.is_some() {
            return false;
        }
        self.pending_since = Some(now);
        true
    }

    pub const fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending_since.map(|since| since + self.delay)
    }

    /// Disarm if the deadline has passed; true means "save now".
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.deadline().is_some_and(|deadline| now >= deadline) {
            self.pending_since = None;
            return true;
        }
        false
    }

    /// Disarm unconditionally; true if a save was pending.
    pub fn take(&mut self) -> bool {
        self.pending_since.take().is_some()
    }
}
