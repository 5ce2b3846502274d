//! Settings stores: the JSON document on disk and an in-memory double.

use std::{
    fs, io,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::{Error, HotkeySettings, Result};

/// Quiet period before a saved document is written to disk.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(350);

/// Key of the hotkey section inside the host document.
const SETTINGS_KEY: &str = "settings";

/// Source of persisted hotkey settings.
pub trait SettingsStore: Send + Sync {
    /// Load the current settings.
    fn load(&self) -> Result<HotkeySettings>;
    /// Persist `settings`. Fire-and-forget: failures are logged, not returned.
    fn save(&self, settings: &HotkeySettings);
}

/// Messages for the background writer.
enum WriterMsg {
    /// Schedule this document for writing after the debounce period.
    Write(Value),
    /// Write anything pending now, then acknowledge.
    Flush(Sender<()>),
}

/// Settings stored in the host's JSON document.
///
/// Saves are debounced on a background thread (last write wins) and written
/// atomically. Dropping the store writes any pending document.
pub struct JsonStore {
    /// Document path.
    path: PathBuf,
    /// Last known full document, so foreign keys survive our writes. `None`
    /// until the file has been read.
    doc: Mutex<Option<Map<String, Value>>>,
    /// Channel to the writer thread.
    tx: Option<Sender<WriterMsg>>,
    /// Writer thread handle.
    writer: Option<JoinHandle<()>>,
}

impl JsonStore {
    /// Open a store at `path` with the default debounce.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_debounce(path, SAVE_DEBOUNCE)
    }

    /// Open a store at `path` with a custom debounce period.
    pub fn with_debounce(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let (tx, rx) = unbounded();
        let writer_path = path.clone();
        let writer = thread::Builder::new()
            .name("panelkey-settings".into())
            .spawn(move || writer_loop(&writer_path, &rx, debounce))
            .map_err(|e| warn!(error = %e, "settings_writer_spawn_failed"))
            .ok();
        Self {
            path,
            doc: Mutex::new(None),
            tx: writer.is_some().then_some(tx),
            writer,
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write any pending save now and wait for it to land.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (ack_tx, ack_rx) = bounded(1);
        if tx.send(WriterMsg::Flush(ack_tx)).is_ok() && ack_rx.recv().is_err() {
            warn!("settings_flush_ack_lost");
        }
    }

    /// Read the document on disk. `None` when the file does not exist.
    fn read_doc(&self) -> Result<Option<Map<String, Value>>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    message: e.to_string(),
                });
            }
        };
        match serde_json::from_str::<Value>(&text).map_err(|e| self.parse_err(e.to_string()))? {
            Value::Object(m) => Ok(Some(m)),
            _ => Err(self.parse_err("document is not a JSON object".into())),
        }
    }

    /// Parse error tagged with this store's path.
    fn parse_err(&self, message: String) -> Error {
        Error::Parse {
            path: self.path.clone(),
            message,
        }
    }
}

impl SettingsStore for JsonStore {
    fn load(&self) -> Result<HotkeySettings> {
        let Some(doc) = self.read_doc()? else {
            debug!(path = %self.path.display(), "settings_seeding_defaults");
            let defaults = HotkeySettings::default();
            let mut doc = Map::new();
            doc.insert(SETTINGS_KEY.into(), to_value(&defaults));
            write_atomic(&self.path, &Value::Object(doc.clone()))?;
            *self.doc.lock() = Some(doc);
            return Ok(defaults);
        };
        let settings = match doc.get(SETTINGS_KEY) {
            None | Some(Value::Null) => HotkeySettings::default(),
            Some(v) => {
                serde_json::from_value(v.clone()).map_err(|e| self.parse_err(e.to_string()))?
            }
        };
        *self.doc.lock() = Some(doc);
        trace!(path = %self.path.display(), "settings_loaded");
        Ok(settings)
    }

    fn save(&self, settings: &HotkeySettings) {
        let doc = {
            let mut cached = self.doc.lock();
            if cached.is_none() {
                // Never loaded: pick up the host's keys before writing over them.
                match self.read_doc() {
                    Ok(doc) => *cached = Some(doc.unwrap_or_default()),
                    Err(e) => {
                        warn!(error = %e, "settings_save_skipped_unreadable_document");
                        return;
                    }
                }
            }
            let doc = cached.get_or_insert_with(Map::new);
            doc.insert(SETTINGS_KEY.into(), to_value(settings));
            Value::Object(doc.clone())
        };
        match &self.tx {
            Some(tx) if tx.send(WriterMsg::Write(doc.clone())).is_ok() => {}
            _ => {
                if let Err(e) = write_atomic(&self.path, &doc) {
                    warn!(error = %e, "settings_save_failed");
                }
            }
        }
    }
}

impl Drop for JsonStore {
    fn drop(&mut self) {
        // Closing the channel makes the writer flush and exit.
        self.tx.take();
        if let Some(h) = self.writer.take()
            && h.join().is_err()
        {
            warn!("settings_writer_panicked");
        }
    }
}

/// Serialize settings; the model has no fallible fields.
fn to_value(settings: &HotkeySettings) -> Value {
    serde_json::to_value(settings).unwrap_or(Value::Null)
}

/// Background writer: trailing debounce with explicit flushes.
fn writer_loop(path: &Path, rx: &Receiver<WriterMsg>, debounce: Duration) {
    let mut pending: Option<(Value, Instant)> = None;
    loop {
        let msg = match &pending {
            Some((_, due)) => match rx.recv_deadline(*due) {
                Ok(m) => Some(m),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    write_pending(path, &mut pending);
                    return;
                }
            },
            None => match rx.recv() {
                Ok(m) => Some(m),
                Err(_) => return,
            },
        };
        match msg {
            None => write_pending(path, &mut pending),
            Some(WriterMsg::Write(doc)) => pending = Some((doc, Instant::now() + debounce)),
            Some(WriterMsg::Flush(ack)) => {
                write_pending(path, &mut pending);
                if ack.send(()).is_err() {
                    trace!("settings_flush_waiter_gone");
                }
            }
        }
    }
}

fn write_pending(path: &Path, pending: &mut Option<(Value, Instant)>) {
    if let Some((doc, _)) = pending.take() {
        match write_atomic(path, &doc) {
            Ok(()) => debug!(path = %path.display(), "settings_saved"),
            Err(e) => warn!(error = %e, "settings_save_failed"),
        }
    }
}

/// Write `doc` to a sibling temp file and rename it over `path`.
fn write_atomic(path: &Path, doc: &Value) -> Result<()> {
    let write_err = |e: &dyn std::fmt::Display| Error::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| write_err(&e))?;
    }
    let bytes = serde_json::to_vec_pretty(doc).map_err(|e| write_err(&e))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| write_err(&e))?;
    fs::rename(&tmp, path).map_err(|e| write_err(&e))?;
    Ok(())
}

/// In-memory store that records every save.
#[derive(Default)]
pub struct MemoryStore {
    /// Current settings.
    current: Mutex<HotkeySettings>,
    /// Every settings value passed to `save`, in order.
    saves: Mutex<Vec<HotkeySettings>>,
}

impl MemoryStore {
    /// A store whose `load` returns `settings`.
    pub fn new(settings: HotkeySettings) -> Self {
        Self {
            current: Mutex::new(settings),
            saves: Mutex::new(Vec::new()),
        }
    }

    /// Settings as last saved (or as constructed).
    pub fn current(&self) -> HotkeySettings {
        self.current.lock().clone()
    }

    /// All saves so far.
    pub fn saves(&self) -> Vec<HotkeySettings> {
        self.saves.lock().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<HotkeySettings> {
        Ok(self.current())
    }

    fn save(&self, settings: &HotkeySettings) {
        *self.current.lock() = settings.clone();
        self.saves.lock().push(settings.clone());
    }
}
