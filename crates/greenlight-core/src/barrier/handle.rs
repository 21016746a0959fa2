//! Completion handles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::AbortHandle;

use crate::domain::TaskKey;

use super::Inner;

/// Marks one registered task as finished.
///
/// Cloneable; every clone shares a single consumed flag, so only the first
/// invocation across all clones has any effect. Effects are applied on the
/// next scheduling turn, never synchronously with the call.
#[derive(Clone)]
pub struct CompletionHandle {
    shared: Arc<HandleShared>,
}

struct HandleShared {
    key: TaskKey,
    name: String,
    fired: AtomicBool,
    timer: AbortHandle,
    barrier: Arc<Inner>,
}

impl CompletionHandle {
    pub(crate) fn new(key: TaskKey, name: String, timer: AbortHandle, barrier: Arc<Inner>) -> Self {
        Self {
            shared: Arc::new(HandleShared {
                key,
                name,
                fired: AtomicBool::new(false),
                timer,
                barrier,
            }),
        }
    }

    /// The resolved task name (caller-supplied or generated).
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Mark the task as completed successfully.
    pub fn succeed(&self) {
        self.finish(None);
    }

    /// Mark the task as failed.
    ///
    /// Any displayable value is accepted; its string form becomes the
    /// stored failure message.
    pub fn fail(&self, error: impl fmt::Display) {
        self.finish(Some(error.to_string()));
    }

    fn finish(&self, error: Option<String>) {
        if self.shared.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.timer.abort();

        // 最初のエラーが既にラッチ済みならこの完了は何も起こさない
        if self.shared.barrier.is_errored() {
            return;
        }

        // Defer one scheduling turn so a handle invoked while sibling tasks
        // are still being registered never observes a torn pending set.
        let barrier = Arc::clone(&self.shared.barrier);
        let key = self.shared.key;
        tokio::spawn(async move {
            barrier.task_done(key, error).await;
        });
    }
}

impl fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("task", &self.shared.name)
            .field("fired", &self.shared.fired.load(Ordering::SeqCst))
            .finish()
    }
}
