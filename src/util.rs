//! Failure bookkeeping shared by the worker threads of a run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;

use crate::error::{CallbackKind, MRError, Result};

/// Runs one user callback. Errors and panics are both turned into an `MRError`, so a misbehaving
/// callback ends the run instead of taking a worker thread down with it.
pub(crate) fn guard_callback<T, F>(kind: CallbackKind, path: Option<&Path>, f: F) -> Result<T>
    where F: FnOnce() -> anyhow::Result<T>
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(MRError::from_callback(kind, e, path)),
        Err(payload) => {
            Err(MRError::Callback {
                kind: kind,
                source: anyhow!("panicked: {}", panic_message(&*payload)),
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Keeps the first error reported by any worker. Recording an error also trips the
/// cancellation flag, which workers check before claiming their next piece of work.
pub(crate) struct FirstFailure {
    tripped: AtomicBool,
    first: Mutex<Option<MRError>>,
}

impl FirstFailure {
    pub fn new() -> FirstFailure {
        FirstFailure {
            tripped: AtomicBool::new(false),
            first: Mutex::new(None),
        }
    }

    pub fn record(&self, err: MRError) {
        let mut first = self.first.lock().unwrap_or_else(|p| p.into_inner());
        if first.is_none() {
            log::error!("aborting run: {}", err);
            *first = Some(err);
        } else {
            log::debug!("ignoring subsequent failure: {}", err);
        }
        self.tripped.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Returns the recorded failure, if any. Called once a phase has been joined.
    pub fn check(&self) -> Result<()> {
        let mut first = self.first.lock().unwrap_or_else(|p| p.into_inner());
        match first.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
