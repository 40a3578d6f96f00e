//! Interruption guard around critical sections.
//!
//! A termination request that arrives while the guard is locked is recorded
//! and honoured when the section ends. One that arrives while unlocked
//! terminates immediately. The terminator is injected so tests can observe
//! it instead of exiting.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Exit status used by the production terminator (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

type Terminator = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct GuardState {
    locked: bool,
    requested: bool,
}

pub struct InterruptGuard {
    state: Mutex<GuardState>,
    terminate: Terminator,
}

impl std::fmt::Debug for InterruptGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl InterruptGuard {
    pub fn new(terminate: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(GuardState::default()),
            terminate: Box::new(terminate),
        }
    }

    /// Guard whose terminator ends the process with [`INTERRUPTED_EXIT_CODE`].
    pub fn exit_process() -> Self {
        Self::new(|| {
            eprintln!("Caught interrupt signal. Exiting...");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        })
    }

    pub fn lock(&self) {
        self.state().locked = true;
    }

    /// Leave the critical section, terminating if a request arrived during it.
    pub fn unlock(&self) {
        let mut state = self.state();
        state.locked = false;
        if state.requested {
            (self.terminate)();
        }
    }

    /// Called from the signal listener.
    pub fn request_termination(&self) {
        // The mutex stays held while terminating, so the main thread cannot
        // enter a new critical section in between.
        let mut state = self.state();
        state.requested = true;
        if !state.locked {
            (self.terminate)();
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    pub fn termination_requested(&self) -> bool {
        self.state().requested
    }

    /// Run `f` with the guard locked. The guard is released even if `f`
    /// panics.
    pub fn protect<T>(&self, f: impl FnOnce() -> T) -> T {
        let _section = Section::enter(self);
        f()
    }

    fn state(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Section<'a>(&'a InterruptGuard);

impl<'a> Section<'a> {
    fn enter(guard: &'a InterruptGuard) -> Self {
        guard.lock();
        Self(guard)
    }
}

impl Drop for Section<'_> {
    fn drop(&mut self) {
        self.0.unlock();
    }
}
