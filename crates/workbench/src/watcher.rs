//! Per-pid `MemoryWatcher` cache (spec.md §4.H: "a handful of subsystem
//! caches (e.g., a `MemoryWatcher` per pid)").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dma_core::DmaReader;
use memory_watcher::MemoryWatcher;

use crate::reader::PidReader;
use crate::Workbench;

pub(crate) struct WatcherCache<D: DmaReader + Send + Sync + 'static> {
    by_pid: Mutex<HashMap<u32, Arc<MemoryWatcher<PidReader<D>>>>>,
}

impl<D: DmaReader + Send + Sync + 'static> WatcherCache<D> {
    pub(crate) fn new() -> Self {
        Self { by_pid: Mutex::new(HashMap::new()) }
    }
}

impl<D: DmaReader + Send + Sync + 'static> Workbench<D> {
    /// Returns the watcher for the currently selected process, creating
    /// one bound to that pid's reader on first use.
    #[must_use]
    pub fn watcher(&self) -> Arc<MemoryWatcher<PidReader<D>>> {
        self.watcher_for(self.process())
    }

    /// Returns the watcher for `pid` regardless of which process is
    /// currently selected, creating one on first use. Lets a caller keep
    /// watches running on a background process while analyzing another in
    /// the foreground.
    #[must_use]
    pub fn watcher_for(&self, pid: u32) -> Arc<MemoryWatcher<PidReader<D>>> {
        let mut by_pid = self.watchers.by_pid.lock().unwrap();
        Arc::clone(
            by_pid
                .entry(pid)
                .or_insert_with(|| Arc::new(MemoryWatcher::new(PidReader::new(Arc::clone(&self.dma), pid)))),
        )
    }
}
