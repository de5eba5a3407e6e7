//! Background task dispatch.
//!
//! The core never awaits its own side-effect tasks: submission returns a
//! handle id immediately and completion is never assumed. Handles are kept
//! so a "stop sync" action can cancel the matching in-flight task by id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

/// Fire-and-forget task registry. Cheap to clone.
#[derive(Clone, Default)]
pub struct TaskDispatcher {
    handles: Arc<Mutex<HashMap<Uuid, AbortHandle>>>,
}

impl TaskDispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task and return its handle id.
    ///
    /// The registry entry is removed when the task finishes on its own.
    /// Aborting an already-finished task is a no-op, so the window between
    /// completion and removal is harmless.
    pub fn spawn<F>(&self, future: F) -> Uuid
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let registry = Arc::clone(&self.handles);
        let handle = tokio::spawn(async move {
            future.await;
            if let Ok(mut handles) = registry.lock() {
                handles.remove(&id);
            }
        });
        if let Ok(mut handles) = self.handles.lock() {
            handles.insert(id, handle.abort_handle());
        }
        debug!(task_id = %id, "Background task spawned");
        id
    }

    /// Cancel a task by id. Returns whether a live handle was found.
    pub fn cancel(&self, id: Uuid) -> bool {
        let handle = self.handles.lock().ok().and_then(|mut h| h.remove(&id));
        match handle {
            Some(handle) => {
                handle.abort();
                debug!(task_id = %id, "Background task cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether the task is still registered (running or not yet cleaned up).
    #[must_use]
    pub fn is_registered(&self, id: Uuid) -> bool {
        self.handles
            .lock()
            .map(|h| h.contains_key(&id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_completed_task_removes_itself() {
        let dispatcher = TaskDispatcher::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let id = dispatcher.spawn(async move {
            flag.store(true, Ordering::SeqCst);
        });

        for _ in 0..50 {
            if done.load(Ordering::SeqCst) && !dispatcher.is_registered(id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task did not complete and deregister");
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_task() {
        let dispatcher = TaskDispatcher::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let id = dispatcher.spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            flag.store(true, Ordering::SeqCst);
        });

        assert!(dispatcher.is_registered(id));
        assert!(dispatcher.cancel(id));
        assert!(!dispatcher.is_registered(id));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_false() {
        let dispatcher = TaskDispatcher::new();
        assert!(!dispatcher.cancel(Uuid::new_v4()));
    }
}
