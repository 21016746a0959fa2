//! Domain identifiers (strongly-typed task keys).
//!
//! # ULID ベースのタスクキー
//! 登録された各タスクは内部的に ULID で識別されます。名前が省略された
//! 登録では、このキーの文字列表現がそのままタスク名になります。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、登録順に並ぶ
//! - **調整なしで一意**: 乱数部分があるので同一ミリ秒でも衝突しない

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

/// Internal identity of one registered task.
///
/// Distinct from the task *name*: names are the caller-facing labels and
/// must only be unique among currently-pending tasks, keys are unique
/// forever.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey(Ulid);

impl TaskKey {
    /// Generate a fresh key from the current wall clock plus randomness.
    pub fn generate() -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    /// ULID から TaskKey を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for TaskKey {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique() {
        let k1 = TaskKey::generate();
        let k2 = TaskKey::generate();
        let k3 = TaskKey::generate();

        assert_ne!(k1, k2);
        assert_ne!(k2, k3);
        assert_ne!(k1, k3);
    }

    #[test]
    fn display_uses_task_prefix() {
        let key = TaskKey::generate();
        assert!(key.to_string().starts_with("task-"));
    }

    #[test]
    fn keys_can_be_serialized() {
        let key = TaskKey::generate();

        let serialized = serde_json::to_string(&key).unwrap();
        let deserialized: TaskKey = serde_json::from_str(&serialized).unwrap();

        assert_eq!(key, deserialized);
    }

    #[test]
    fn key_is_as_small_as_its_ulid() {
        use std::mem::size_of;

        // ULID は 128-bit = 16 bytes
        assert_eq!(size_of::<TaskKey>(), size_of::<Ulid>());
        assert_eq!(size_of::<Ulid>(), 16);
    }
}
