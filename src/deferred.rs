//! Compute-once cells for attributes that cost a round trip.
//!
//! A [`Deferred`] moves through `Unresolved -> Resolving -> Resolved`. A load that
//! fails puts the cell back to `Unresolved`, so the next access calls the loader
//! again; only successful values are kept. The internal lock is never held while the
//! loader runs.

use std::sync::{Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Unresolved,
    Resolving,
    Resolved,
}

#[derive(Debug)]
pub struct Deferred<T> {
    value: OnceLock<T>,
    state: Mutex<LoadState>,
    settled: Condvar,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            state: Mutex::new(LoadState::Unresolved),
            settled: Condvar::new(),
        }
    }

    /// A cell that is already resolved to `value`.
    pub fn resolved(value: T) -> Self {
        let cell = Self::new();
        let _ = cell.value.set(value);
        *cell.lock() = LoadState::Resolved;
        cell
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Return the cached value, or run `load` to produce it.
    ///
    /// Concurrent callers wait for the thread that is loading. If that load fails the
    /// error goes to that caller only and one of the waiters takes over.
    pub fn get_or_try_load<E, F>(&self, load: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        {
            let mut state = self.lock();
            loop {
                match *state {
                    LoadState::Resolved => {
                        if let Some(value) = self.value.get() {
                            return Ok(value);
                        }
                    }
                    LoadState::Unresolved => {
                        *state = LoadState::Resolving;
                        break;
                    }
                    LoadState::Resolving => {}
                }
                state = self
                    .settled
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }

        // Resets to Unresolved if `load` fails or panics.
        let mut attempt = LoadAttempt {
            cell: self,
            published: false,
        };

        let value = load()?;
        let value = self.value.get_or_init(|| value);
        attempt.published = true;
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LoadAttempt<'a, T> {
    cell: &'a Deferred<T>,
    published: bool,
}

impl<T> Drop for LoadAttempt<'_, T> {
    fn drop(&mut self) {
        let mut state = self.cell.lock();
        *state = if self.published {
            LoadState::Resolved
        } else {
            LoadState::Unresolved
        };
        self.cell.settled.notify_all();
    }
}
