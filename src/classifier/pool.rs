use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::InferenceError;

/// Fixed set of exclusively borrowed backends handed out round-robin, so that
/// concurrent requests run on different sessions instead of queueing on one.
#[derive(Debug)]
pub struct SessionPool<T> {
    sessions: Vec<Mutex<T>>,
    next_idx: AtomicUsize,
}

impl<T> SessionPool<T> {
    /// Returns `None` for an empty set of sessions.
    pub fn new(sessions: Vec<T>) -> Option<Self> {
        if sessions.is_empty() {
            return None;
        }
        Some(Self {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next_idx: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Lock the next session in turn, returning its index with the guard.
    pub fn acquire(&self) -> Result<(usize, MutexGuard<'_, T>), InferenceError> {
        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let guard = self.sessions[idx].lock().map_err(|_| {
            InferenceError::Backend(format!(
                "session {}/{} lock poisoned",
                idx,
                self.sessions.len()
            ))
        })?;
        Ok((idx, guard))
    }
}
