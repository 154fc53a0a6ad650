use super::Data;
use crate::errors::runtime;
use crate::{dispatch, Cx, DataPtr, EvalError, EvalResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Handle to a block running on a background thread.
///
/// The first [`resolve`](Self::resolve) joins the thread; the outcome is
/// cached, so later calls (from any thread) see the same value or error.
#[derive(Debug)]
pub struct FutureData {
    handle: Mutex<Option<JoinHandle<EvalResult>>>,
    outcome: Mutex<Option<EvalResult>>,
}

impl FutureData {
    /// Run `task` on a new thread.
    pub fn spawn<F>(task: F) -> Result<Arc<FutureData>, EvalError>
    where
        F: FnOnce() -> EvalResult + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name("bbvm-task".to_string())
            .spawn(task)
            .map_err(|e| runtime(format!("Failed to start a thread: {e}")))?;
        Ok(Arc::new(FutureData {
            handle: Mutex::new(Some(handle)),
            outcome: Mutex::new(None),
        }))
    }

    /// A future that is already complete.
    #[cfg(test)]
    pub(crate) fn ready(outcome: EvalResult) -> Arc<FutureData> {
        Arc::new(FutureData {
            handle: Mutex::new(None),
            outcome: Mutex::new(Some(outcome)),
        })
    }

    /// Wait for the task and return its outcome.
    pub fn resolve(&self) -> EvalResult {
        let mut outcome = self.outcome.lock();
        if let Some(done) = outcome.as_ref() {
            return done.clone();
        }
        let handle = self.handle.lock().take();
        let result = match handle {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(runtime("Background task panicked"))),
            None => Err(runtime("Future was never started")),
        };
        *outcome = Some(result.clone());
        result
    }

    #[cfg(test)]
    pub(crate) fn is_resolved(&self) -> bool {
        self.outcome.lock().is_some()
    }
}

impl Data for FutureData {
    fn type_name(&self) -> &'static str {
        "future"
    }

    fn text(&self, cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        let value = self.resolve()?;
        dispatch::text(cx, &value)
    }
}
