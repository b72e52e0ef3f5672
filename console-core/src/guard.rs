//! Stale-continuation guards: request tokens and mount liveness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Identifies one issued request within a [`RequestSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// Monotonic request counter for one cache slot.
///
/// Every issued request invalidates all earlier ones for the same slot, so
/// only the latest-issued continuation may write state.
#[derive(Debug, Default)]
pub struct RequestSlot {
    latest: AtomicU64,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding every earlier one.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether no later token has been issued.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Supersede every issued token without starting a request.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Liveness flag of a mounted controller.
///
/// Clones share the flag. Once unmounted it stays unmounted; a remounted page
/// builds a new controller.
#[derive(Debug, Clone)]
pub struct MountHandle(Arc<AtomicBool>);

impl MountHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for MountHandle {
    fn default() -> Self {
        Self::new()
    }
}
