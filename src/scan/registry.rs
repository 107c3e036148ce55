//! Scan registry - per-map scan state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

/// State owned by one scan: its log buffer, cancellation flag, and
/// liveness flag.
///
/// The state stays registered after the supervisor exits so the log tail
/// remains readable; the next scan for the same map replaces it.
#[derive(Debug)]
pub struct ScanState {
    map_id: i64,
    logs: Mutex<Vec<String>>,
    cancelled: AtomicBool,
    active: AtomicBool,
}

impl ScanState {
    fn new(map_id: i64) -> Self {
        Self {
            map_id,
            logs: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            active: AtomicBool::new(true),
        }
    }

    /// Append an operator-facing line to the scan log.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(map_id = self.map_id, "{message}");
        lock(&self.logs).push(message);
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the scan finished. Called exactly once, when the supervisor
    /// exits.
    pub fn finish(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Snapshot of the log buffer.
    pub fn logs(&self) -> Vec<String> {
        lock(&self.logs).clone()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Scan already in progress for this map")]
pub struct ScanAlreadyActive;

/// All scans, keyed by map id.
#[derive(Debug, Default)]
pub struct ScanRegistry {
    scans: Mutex<HashMap<i64, Arc<ScanState>>>,
}

impl ScanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new scan for the map, replacing a finished one. Fails
    /// while a scan for the same map is still active.
    pub fn begin(&self, map_id: i64) -> Result<Arc<ScanState>, ScanAlreadyActive> {
        let mut scans = lock(&self.scans);
        if scans.get(&map_id).is_some_and(|scan| scan.is_active()) {
            return Err(ScanAlreadyActive);
        }
        let state = Arc::new(ScanState::new(map_id));
        scans.insert(map_id, state.clone());
        Ok(state)
    }

    /// Set the cancellation flag of the map's active scan and log the
    /// stop request. Returns false when no scan is active.
    pub fn request_stop(&self, map_id: i64) -> bool {
        let scans = lock(&self.scans);
        match scans.get(&map_id) {
            Some(state) if state.is_active() => {
                state.request_cancel();
                state.log("Stopping scan...");
                true
            }
            _ => false,
        }
    }

    /// Snapshot of (log lines, active flag) for the map.
    pub fn logs(&self, map_id: i64) -> (Vec<String>, bool) {
        let scans = lock(&self.scans);
        match scans.get(&map_id) {
            Some(state) => (state.logs(), state.is_active()),
            None => (Vec::new(), false),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
