//! Load lifecycle flags shared between the renderer host and the router
//!
//! The router updates these from renderer signals while a reconciliation
//! pass may be running, so they are plain atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Flags {
    /// Bumped by every reload request
    reload_requested: AtomicU64,
    /// Highest request covered by a completed reload
    reload_cleared: AtomicU64,
    loading: AtomicBool,
    load_failed: AtomicBool,
}

/// Load state of one mounted surface
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    flags: Arc<Flags>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next reconciliation pass must start with a full reload
    pub fn request_reload(&self) {
        self.flags.reload_requested.fetch_add(1, Ordering::SeqCst);
    }

    pub fn needs_reload(&self) -> bool {
        self.flags.reload_requested.load(Ordering::SeqCst) > self.flags.reload_cleared.load(Ordering::SeqCst)
    }

    /// Snapshot of the requests a reload started now would cover
    pub(crate) fn reload_ticket(&self) -> u64 {
        self.flags.reload_requested.load(Ordering::SeqCst)
    }

    /// Mark the requests up to `ticket` as served
    ///
    /// A request made after the ticket was taken stays pending.
    pub(crate) fn clear_reload(&self, ticket: u64) {
        self.flags.reload_cleared.fetch_max(ticket, Ordering::SeqCst);
    }

    pub fn is_loading(&self) -> bool {
        self.flags.loading.load(Ordering::SeqCst)
    }

    pub fn load_failed(&self) -> bool {
        self.flags.load_failed.load(Ordering::SeqCst)
    }

    pub fn load_started(&self) {
        self.flags.loading.store(true, Ordering::SeqCst);
    }

    /// Clears the failure flag so the liveness monitor resumes
    pub fn load_finished(&self) {
        self.flags.loading.store(false, Ordering::SeqCst);
        self.flags.load_failed.store(false, Ordering::SeqCst);
    }

    /// Marks the failure and schedules a reload for the next pass
    pub fn load_failed_with_retry(&self) {
        self.flags.loading.store(false, Ordering::SeqCst);
        self.flags.load_failed.store(true, Ordering::SeqCst);
        self.request_reload();
    }
}
