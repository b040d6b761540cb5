//! API Pool Implementation
//!
//! `ApiPool` keeps two queues of handles: `active`, the current rotation, and
//! `awaiting`, handles set aside after a failure. When the active rotation
//! runs dry the awaiting handles are moved back in, in the order they failed,
//! so every handle gets another chance.

use crate::error::ApiError;
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

// ============================================================================
// API Pool
// ============================================================================

#[derive(Debug)]
struct PoolState<H> {
    active: Vec<H>,
    awaiting: Vec<H>,
}

/// A rotating pool of API handles with failover
///
/// Handles are compared by equality only. Each operation takes the internal
/// lock once; a `demote` followed by `get_current` is two operations and is
/// not atomic with respect to other threads.
#[derive(Debug)]
pub struct ApiPool<H> {
    state: Mutex<PoolState<H>>,
}

impl<H> ApiPool<H>
where
    H: Clone + PartialEq + fmt::Debug,
{
    /// Create a pool from a copy of `handles`
    pub fn new(handles: &[H]) -> Self {
        Self::from(handles.to_vec())
    }

    /// Return the first active handle without removing it
    ///
    /// Refills the active rotation from the awaiting queue first if it is
    /// empty. Fails with `ApiError::PoolExhausted` when both are empty.
    pub fn get_current(&self) -> Result<H, ApiError> {
        let mut state = self.lock();
        if state.active.is_empty() {
            let awaiting = std::mem::take(&mut state.awaiting);
            tracing::debug!(
                handles = awaiting.len(),
                "Active rotation drained, reinstating awaiting handles"
            );
            state.active = awaiting;
        }
        state.active.first().cloned().ok_or(ApiError::PoolExhausted)
    }

    /// Move `handle` to the back of the awaiting queue
    ///
    /// The handle is always appended to `awaiting`; the first equal element
    /// of `active`, if any, is then removed. Duplicates are not collapsed.
    pub fn demote(&self, handle: &H) {
        let mut state = self.lock();
        state.awaiting.push(handle.clone());
        if let Some(pos) = state.active.iter().position(|h| h == handle) {
            state.active.remove(pos);
        }
        tracing::debug!(
            handle = ?handle,
            active = state.active.len(),
            awaiting = state.awaiting.len(),
            "Handle demoted"
        );
    }

    /// Total number of handles across both queues
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.active.len() + state.awaiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            active: state.active.len(),
            awaiting: state.awaiting.len(),
        }
    }

    /// Snapshot of both queues, active first
    pub fn snapshot(&self) -> (Vec<H>, Vec<H>) {
        let state = self.lock();
        (state.active.clone(), state.awaiting.clone())
    }

    // Every operation leaves the state consistent before it can panic, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, PoolState<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H> From<Vec<H>> for ApiPool<H> {
    fn from(handles: Vec<H>) -> Self {
        Self {
            state: Mutex::new(PoolState {
                active: handles,
                awaiting: Vec::new(),
            }),
        }
    }
}

// ============================================================================
// Pool Statistics
// ============================================================================

/// Statistics about an API pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Handles in the current rotation
    pub active: usize,
    /// Handles waiting for the rotation to drain
    pub awaiting: usize,
}

// ============================================================================
// Tests
// ============================================================================
