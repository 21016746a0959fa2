//! Barrier configuration and the per-task option merge.
//!
//! 優先順位: 呼び出し時のオプション > インスタンスのデフォルト >
//! ライブラリのデフォルト。

use std::time::Duration;

/// Library default timeout applied when neither the barrier nor the call
/// supplies one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Instance-level defaults, set once at barrier construction.
#[derive(Debug, Clone)]
pub struct BarrierOptions {
    /// Default timeout for tasks that do not carry their own.
    pub timeout: Duration,

    /// Default weak-dependency policy for tasks that do not carry their own.
    pub is_weak_dep: bool,

    /// Defer the "resolve immediately if nothing registered" check until
    /// `start()` is called explicitly. For hosts that attach before all
    /// synchronous registration occurs.
    pub lazy_start: bool,

    /// Reject anonymous registrations instead of generating a name.
    pub require_name: bool,
}

impl Default for BarrierOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            is_weak_dep: false,
            lazy_start: false,
            require_name: false,
        }
    }
}

impl BarrierOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn weak_dep(mut self, is_weak_dep: bool) -> Self {
        self.is_weak_dep = is_weak_dep;
        self
    }

    pub fn lazy_start(mut self, lazy_start: bool) -> Self {
        self.lazy_start = lazy_start;
        self
    }

    pub fn require_name(mut self, require_name: bool) -> Self {
        self.require_name = require_name;
        self
    }
}

/// Per-registration overrides. Unset fields fall back to the barrier's
/// [`BarrierOptions`].
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    pub timeout: Option<Duration>,
    pub is_weak_dep: Option<bool>,
}

impl TaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn weak_dep(mut self, is_weak_dep: bool) -> Self {
        self.is_weak_dep = Some(is_weak_dep);
        self
    }

    /// Merge these overrides onto the instance defaults.
    pub(crate) fn resolve(&self, defaults: &BarrierOptions) -> ResolvedOptions {
        ResolvedOptions {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            is_weak_dep: self.is_weak_dep.unwrap_or(defaults.is_weak_dep),
        }
    }
}

/// Effective options for one task after the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedOptions {
    pub timeout: Duration,
    pub is_weak_dep: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, DEFAULT_TIMEOUT, false)]
    #[case(Some(Duration::from_millis(50)), None, Duration::from_millis(50), false)]
    #[case(None, Some(true), DEFAULT_TIMEOUT, true)]
    #[case(Some(Duration::ZERO), Some(true), Duration::ZERO, true)]
    fn call_options_merge_over_library_defaults(
        #[case] timeout: Option<Duration>,
        #[case] is_weak_dep: Option<bool>,
        #[case] want_timeout: Duration,
        #[case] want_weak: bool,
    ) {
        let options = TaskOptions {
            timeout,
            is_weak_dep,
        };
        let resolved = options.resolve(&BarrierOptions::default());

        assert_eq!(resolved.timeout, want_timeout);
        assert_eq!(resolved.is_weak_dep, want_weak);
    }

    #[test]
    fn instance_defaults_apply_when_call_is_silent() {
        let defaults = BarrierOptions::default()
            .timeout(Duration::from_millis(200))
            .weak_dep(true);

        let resolved = TaskOptions::new().resolve(&defaults);

        assert_eq!(resolved.timeout, Duration::from_millis(200));
        assert!(resolved.is_weak_dep);
    }

    #[test]
    fn call_options_win_over_instance_defaults() {
        let defaults = BarrierOptions::default()
            .timeout(Duration::from_millis(200))
            .weak_dep(true);

        // 明示的なゼロもそのまま勝つ
        let resolved = TaskOptions::new()
            .timeout(Duration::ZERO)
            .weak_dep(false)
            .resolve(&defaults);

        assert_eq!(resolved.timeout, Duration::ZERO);
        assert!(!resolved.is_weak_dep);
    }
}
