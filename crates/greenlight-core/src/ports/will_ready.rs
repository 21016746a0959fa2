//! WillReadyHook port - pre-ready フックの抽象化

use std::future::Future;

use async_trait::async_trait;

/// Hook run once, in registration order, after the last task completes and
/// before the barrier resolves with success.
///
/// A hook error becomes the barrier's outcome in place of success. Hooks
/// never run on the error path.
#[async_trait]
pub trait WillReadyHook: Send + Sync {
    async fn run(&self) -> Result<(), String>;
}

/// Closure adapter, used by `Barrier::will_ready_fn`.
pub(crate) struct FnHook<F>(pub(crate) F);

#[async_trait]
impl<F, Fut> WillReadyHook for FnHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), String>> + Send,
{
    async fn run(&self) -> Result<(), String> {
        (self.0)().await
    }
}
