//! `MemoryWatcher`: polling watchpoints with bounded change history and an
//! optional background auto-scan worker (spec.md §4.F).

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use dma_core::{Address, MemoryReader};

use crate::types::{MemoryChange, WatchKind, WatchRegion, MAX_WATCH_SIZE, MIN_WATCH_SIZE};
use crate::writer::MemoryWriter;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// How finely the auto-scan worker checks its stop signal, regardless of
/// the requested scan interval, so `stop_auto_scan` never waits a full
/// long interval to take effect.
const STOP_POLL_INTERVAL_MS: u64 = 10;

struct Inner {
    regions: BTreeMap<u64, WatchRegion>,
    next_id: u64,
    history: VecDeque<MemoryChange>,
    history_capacity: usize,
    change_count: u64,
}

impl Inner {
    fn new(history_capacity: usize) -> Self {
        Self { regions: BTreeMap::new(), next_id: 1, history: VecDeque::new(), history_capacity, change_count: 0 }
    }

    fn push_change(&mut self, change: MemoryChange) {
        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(change);
    }
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// A set of watched memory regions, scanned either on demand via
/// [`MemoryWatcher::scan`] or continuously via
/// [`MemoryWatcher::start_auto_scan`].
pub struct MemoryWatcher<R: MemoryReader + Send + Sync + 'static> {
    reader: Arc<R>,
    inner: Arc<Mutex<Inner>>,
    callback: Option<Arc<dyn Fn(&MemoryChange) + Send + Sync>>,
    writer: Option<Arc<dyn MemoryWriter + Send + Sync>>,
    worker: Mutex<Option<Worker>>,
}

impl<R: MemoryReader + Send + Sync + 'static> MemoryWatcher<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_history_capacity(reader, DEFAULT_HISTORY_CAPACITY)
    }

    #[must_use]
    pub fn with_history_capacity(reader: R, history_capacity: usize) -> Self {
        Self {
            reader: Arc::new(reader),
            inner: Arc::new(Mutex::new(Inner::new(history_capacity))),
            callback: None,
            writer: None,
            worker: Mutex::new(None),
        }
    }

    /// Installs a callback invoked once per change found by [`scan`],
    /// outside the state lock.
    ///
    /// [`scan`]: MemoryWatcher::scan
    pub fn set_callback(&mut self, callback: impl Fn(&MemoryChange) + Send + Sync + 'static) {
        self.callback = Some(Arc::new(callback));
    }

    /// Installs the write-back channel used by [`set_frozen`].
    ///
    /// [`set_frozen`]: MemoryWatcher::set_frozen
    pub fn set_writer(&mut self, writer: impl MemoryWriter + Send + Sync + 'static) {
        self.writer = Some(Arc::new(writer));
    }

    /// Installs an already-shared writer, so the caller can keep a handle
    /// to it (a test asserting what got written, a UI owning the same
    /// writer the watcher uses).
    pub fn set_shared_writer(&mut self, writer: Arc<dyn MemoryWriter + Send + Sync>) {
        self.writer = Some(writer);
    }

    /// Creates a watch, reading its current bytes as the baseline.
    ///
    /// # Errors
    ///
    /// Fails if `size` is outside `[1, 1024]`.
    pub fn add_watch(&self, address: Address, size: usize, kind: WatchKind, name: impl Into<String>) -> Result<u64, String> {
        if !(MIN_WATCH_SIZE..=MAX_WATCH_SIZE).contains(&size) {
            return Err(format!("watch size {size} out of range [{MIN_WATCH_SIZE}, {MAX_WATCH_SIZE}]"));
        }
        let last_value = self.reader.read(address, size);
        let mut inner = self.inner.lock().expect("watcher mutex poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.regions.insert(
            id,
            WatchRegion {
                id,
                address,
                size,
                kind,
                name: name.into(),
                enabled: true,
                frozen: false,
                change_count: 0,
                last_value,
            },
        );
        Ok(id)
    }

    #[must_use]
    pub fn remove_watch(&self, id: u64) -> bool {
        self.inner.lock().expect("watcher mutex poisoned").regions.remove(&id).is_some()
    }

    #[must_use]
    pub fn set_enabled(&self, id: u64, enabled: bool) -> bool {
        let mut inner = self.inner.lock().expect("watcher mutex poisoned");
        if let Some(region) = inner.regions.get_mut(&id) {
            region.enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Freezes (or unfreezes) a watch: while frozen, [`scan`] writes the
    /// baseline bytes back whenever they drift, provided a writer was
    /// installed via [`set_writer`].
    ///
    /// [`scan`]: MemoryWatcher::scan
    /// [`set_writer`]: MemoryWatcher::set_writer
    #[must_use]
    pub fn set_frozen(&self, id: u64, frozen: bool) -> bool {
        let mut inner = self.inner.lock().expect("watcher mutex poisoned");
        if let Some(region) = inner.regions.get_mut(&id) {
            region.frozen = frozen;
            true
        } else {
            false
        }
    }

    pub fn clear_all(&self) {
        self.inner.lock().expect("watcher mutex poisoned").regions.clear();
    }

    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.inner.lock().expect("watcher mutex poisoned").regions.len()
    }

    /// Total changes detected across every region (spec.md §8
    /// `total_change_count`), distinct from a single [`WatchRegion`]'s own
    /// `change_count`.
    #[must_use]
    pub fn change_count(&self) -> u64 {
        self.inner.lock().expect("watcher mutex poisoned").change_count
    }

    /// Reads every enabled region once, records and returns whatever
    /// changed. Frozen regions whose bytes drifted are written back
    /// instead of being reported, provided a writer is installed.
    pub fn scan(&self) -> Vec<MemoryChange> {
        let mut changes = Vec::new();
        {
            let mut inner = self.inner.lock().expect("watcher mutex poisoned");
            let ids: Vec<u64> = inner.regions.keys().copied().collect();
            for id in ids {
                let (address, size, kind, enabled, frozen, last_value) = {
                    let region = inner.regions.get(&id).expect("id came from this map");
                    (region.address, region.size, region.kind, region.enabled, region.frozen, region.last_value.clone())
                };
                if !enabled {
                    continue;
                }
                let current = self.reader.read(address, size);
                if current == last_value {
                    continue;
                }

                if frozen {
                    if let Some(writer) = &self.writer {
                        writer.write(address, &last_value);
                    }
                    continue;
                }

                inner.change_count += 1;
                let sequence = inner.change_count;
                let region_change_count = {
                    let region = inner.regions.get_mut(&id).expect("id came from this map");
                    region.change_count += 1;
                    region.last_value = current.clone();
                    region.change_count
                };
                let change = MemoryChange {
                    watch_id: id,
                    address,
                    kind,
                    old_value: last_value,
                    new_value: current,
                    sequence,
                    change_count_after: region_change_count,
                };
                inner.push_change(change.clone());
                changes.push(change);
            }
        }

        if let Some(callback) = &self.callback {
            for change in &changes {
                callback(change);
            }
        }

        changes
    }

    /// Spawns a background thread calling [`scan`] then sleeping
    /// `interval_ms`, until [`stop_auto_scan`] is called. Replaces any
    /// worker already running.
    ///
    /// [`scan`]: MemoryWatcher::scan
    /// [`stop_auto_scan`]: MemoryWatcher::stop_auto_scan
    pub fn start_auto_scan(self: &Arc<Self>, interval_ms: u64) {
        self.stop_auto_scan();

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let watcher = Arc::clone(self);
        let handle = std::thread::spawn(move || {
            while !worker_stop.load(Ordering::Relaxed) {
                watcher.scan();
                sleep_observing_stop(interval_ms, &worker_stop);
            }
        });

        *self.worker.lock().expect("worker mutex poisoned") = Some(Worker { stop, handle });
    }

    /// Signals the background worker and joins it. No-op if none is
    /// running.
    pub fn stop_auto_scan(&self) {
        let worker = self.worker.lock().expect("worker mutex poisoned").take();
        if let Some(worker) = worker {
            worker.stop.store(true, Ordering::Relaxed);
            let _ = worker.handle.join();
        }
    }

    #[must_use]
    pub fn recent_changes(&self, n: usize) -> Vec<MemoryChange> {
        let inner = self.inner.lock().expect("watcher mutex poisoned");
        inner.history.iter().rev().take(n).rev().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.inner.lock().expect("watcher mutex poisoned").history.clear();
    }
}

impl<R: MemoryReader + Send + Sync + 'static> Drop for MemoryWatcher<R> {
    fn drop(&mut self) {
        self.stop_auto_scan();
    }
}

fn sleep_observing_stop(interval_ms: u64, stop: &AtomicBool) {
    let mut remaining = interval_ms;
    while remaining > 0 {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let tick = remaining.min(STOP_POLL_INTERVAL_MS);
        std::thread::sleep(Duration::from_millis(tick));
        remaining -= tick;
    }
}
