//! EventSink port - イベント転送の抽象化

use crate::domain::BarrierEvent;

/// EventSink receives barrier events forwarded to an attached host.
///
/// # Thread Safety
/// - `Send + Sync` を要求（転送タスクから呼ばれる）
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BarrierEvent);
}
