use crate::config::mirror::{self, PersistedRecord};
use crate::config::record::ConfigRecord;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Where the persisted form lives.
pub trait ConfigStorage: Send {
    /// `Ok(None)` when nothing has been persisted yet.
    fn read_raw(&self) -> anyhow::Result<Option<String>>;
    fn write_raw(&self, contents: &str) -> anyhow::Result<()>;
}

/// Plain file on disk, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStorage for FileStorage {
    fn read_raw(&self) -> anyhow::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    fn write_raw(&self, contents: &str) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory storage. Clones share the same contents, so a caller can keep a
/// handle after moving one into the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    contents: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MemoryStorage {
    pub fn with_contents(contents: &str) -> Self {
        let storage = Self::default();
        storage.replace(contents);
        storage
    }

    /// Overwrite the stored text, as an external editor would.
    pub fn replace(&self, contents: &str) {
        if let Ok(mut guard) = self.contents.lock() {
            *guard = Some(contents.to_string());
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl ConfigStorage for MemoryStorage {
    fn read_raw(&self) -> anyhow::Result<Option<String>> {
        let guard = self
            .contents
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
        Ok(guard.clone())
    }

    fn write_raw(&self, contents: &str) -> anyhow::Result<()> {
        {
            let mut guard = self
                .contents
                .lock()
                .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?;
            *guard = Some(contents.to_string());
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}

enum IoRequest {
    Write { generation: u64, contents: String },
    Read,
}

/// File contents as seen by the I/O thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorSnapshot {
    /// Generation of the last write processed before this read. A failed
    /// write leaves the file untouched, so it counts as processed too.
    pub observed_generation: u64,
    /// `None` when the file is missing or unreadable.
    pub record: Option<PersistedRecord>,
}

enum IoEvent {
    Snapshot(MirrorSnapshot),
    WriteFailed(u64),
}

/// Single write path for the persisted form.
///
/// All reads and writes run in order on one background thread so the tick
/// thread never blocks on disk. A write is only issued from `flush` while the
/// dirty flag is set. A failed write is not retried until `retry_failed`.
pub struct PersistWorker {
    tx: Option<Sender<IoRequest>>,
    rx: Receiver<IoEvent>,
    join: Option<JoinHandle<()>>,
    sent_generation: u64,
    dirty: bool,
    write_failed: bool,
    read_pending: bool,
}

impl PersistWorker {
    pub fn spawn(storage: Box<dyn ConfigStorage>) -> Self {
        let (req_tx, req_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("hud-persist".into())
            .spawn(move || worker_loop(storage, req_rx, event_tx));
        let join = match join {
            Ok(join) => Some(join),
            Err(err) => {
                tracing::error!(?err, "failed to spawn persistence thread");
                None
            }
        };
        Self {
            tx: Some(req_tx),
            rx: event_rx,
            join,
            sent_generation: 0,
            dirty: false,
            write_failed: false,
            read_pending: false,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The newest write failed and nothing has replaced it yet.
    pub fn write_failed(&self) -> bool {
        self.write_failed
    }

    /// Queue a write of `record` if it is dirty. Returns whether a write was
    /// queued.
    pub fn flush(&mut self, record: &ConfigRecord) -> bool {
        if !self.dirty {
            return false;
        }
        let generation = self.sent_generation + 1;
        let contents = mirror::render(record);
        if !self.send(IoRequest::Write {
            generation,
            contents,
        }) {
            return false;
        }
        self.sent_generation = generation;
        self.dirty = false;
        self.write_failed = false;
        tracing::debug!(generation, "queued HUD config write");
        true
    }

    /// Queue the record again if the last write failed. Returns whether a
    /// write was queued.
    pub fn retry_failed(&mut self, record: &ConfigRecord) -> bool {
        if !self.write_failed {
            return false;
        }
        self.dirty = true;
        self.flush(record)
    }

    /// Ask for a fresh snapshot. At most one read is outstanding at a time.
    pub fn request_read(&mut self) {
        if self.read_pending {
            return;
        }
        if self.send(IoRequest::Read) {
            self.read_pending = true;
        }
    }

    pub fn read_pending(&self) -> bool {
        self.read_pending
    }

    /// Collect finished I/O. Returns the newest snapshot that no later write
    /// can have invalidated; stale snapshots are dropped.
    pub fn poll(&mut self) -> Option<MirrorSnapshot> {
        let mut fresh = None;
        loop {
            match self.rx.try_recv() {
                Ok(IoEvent::Snapshot(snapshot)) => {
                    self.read_pending = false;
                    if snapshot.observed_generation == self.sent_generation {
                        fresh = Some(snapshot);
                    } else {
                        tracing::debug!(
                            observed = snapshot.observed_generation,
                            sent = self.sent_generation,
                            "dropping stale HUD config snapshot"
                        );
                        fresh = None;
                    }
                }
                Ok(IoEvent::WriteFailed(generation)) => {
                    // An older failure is covered by the write queued after it.
                    if generation == self.sent_generation {
                        tracing::warn!(generation, "HUD config write failed; retrying later");
                        self.write_failed = true;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.read_pending = false;
                    break;
                }
            }
        }
        fresh
    }

    fn send(&mut self, request: IoRequest) -> bool {
        match &self.tx {
            Some(tx) => {
                if tx.send(request).is_err() {
                    tracing::warn!("persistence thread is gone");
                    return false;
                }
                true
            }
            None => false,
        }
    }

    /// Flush pending changes and wait for the I/O thread to finish.
    pub fn shutdown(&mut self, record: &ConfigRecord) {
        self.flush(record);
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PersistWorker {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn worker_loop(
    storage: Box<dyn ConfigStorage>,
    requests: Receiver<IoRequest>,
    events: Sender<IoEvent>,
) {
    let mut processed: u64 = 0;
    while let Ok(request) = requests.recv() {
        match request {
            IoRequest::Write {
                generation,
                contents,
            } => {
                processed = generation;
                if let Err(err) = storage.write_raw(&contents) {
                    tracing::debug!(?err, generation, "failed to persist HUD config");
                    let _ = events.send(IoEvent::WriteFailed(generation));
                }
            }
            IoRequest::Read => {
                let record = match storage.read_raw() {
                    Ok(Some(raw)) => Some(mirror::parse(&raw)),
                    Ok(None) => None,
                    Err(err) => {
                        tracing::debug!(?err, "failed to read HUD config");
                        None
                    }
                };
                let snapshot = MirrorSnapshot {
                    observed_generation: processed,
                    record,
                };
                if events.send(IoEvent::Snapshot(snapshot)).is_err() {
                    break;
                }
            }
        }
    }
}
