//! Barrier - the readiness coordinator.
//!
//! 役割はひとつ: 登録された初期化タスクが全部終わるまで待ち、aggregate な
//! ready 通知を一度だけ発火する。
//!
//! - **registry**: pending タスクの集合 + 登録順（`remain` リスト用）
//! - **latches**: `errored`（最初のハード失敗が勝つ）と `resolved`
//!   （通知はインスタンスごとに一度きり）
//! - **timers**: タスクごとの single-shot タイマー。発火は `timeout`
//!   イベントを流すだけで、完了にはならない
//! - **resolution**: watch チャネル。解決後に待ち始めたリスナーにも
//!   保存された結果がそのまま届く
//!
//! Registry mutation happens behind one lock, never held across an await.
//! Completion effects are deferred one scheduling turn (`tokio::spawn`), so
//! a handle invoked during sibling registration cannot tear the pending
//! set.

mod handle;

pub use handle::CompletionHandle;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::domain::{
    BarrierError, BarrierEvent, BarrierOptions, ReadyStat, RegisterError, TaskKey, TaskOptions,
};
use crate::ports::will_ready::FnHook;
use crate::ports::{Host, WillReadyHook};

/// Event channel capacity. A subscriber this many events behind starts
/// seeing `Lagged` instead of blocking the barrier.
const EVENT_CAPACITY: usize = 64;

struct TaskRecord {
    name: String,
    is_weak_dep: bool,
    timer: AbortHandle,
}

struct Registry {
    pending: HashMap<TaskKey, TaskRecord>,

    /// Registration order of the pending keys (drives `remain` lists).
    order: Vec<TaskKey>,

    hooks: Vec<Arc<dyn WillReadyHook>>,

    /// attach は barrier ごとに一度だけ
    attached: bool,
}

impl Registry {
    fn new() -> Self {
        Self {
            pending: HashMap::new(),
            order: Vec::new(),
            hooks: Vec::new(),
            attached: false,
        }
    }
}

pub(crate) struct Inner {
    options: BarrierOptions,
    registry: Mutex<Registry>,
    errored: AtomicBool,
    resolved: AtomicBool,
    started: AtomicBool,
    outcome: watch::Sender<Option<Result<(), BarrierError>>>,
    events: broadcast::Sender<BarrierEvent>,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().expect("barrier registry lock poisoned")
    }

    pub(crate) fn is_errored(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }

    fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    fn emit(&self, event: BarrierEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn task_timed_out(&self, key: TaskKey, name: &str) {
        if self.is_resolved() || !self.registry().pending.contains_key(&key) {
            return;
        }
        debug!(task = %name, "ready task timed out, still waiting");
        self.emit(BarrierEvent::Timeout {
            task: name.to_string(),
        });
    }

    /// Apply one deferred completion.
    pub(crate) async fn task_done(&self, key: TaskKey, error: Option<String>) {
        // All registry access stays inside this block so the (non-Send)
        // lock guard is provably out of scope before any await below.
        let drained = {
            let mut registry = self.registry();
            if self.is_resolved() || self.is_errored() {
                return;
            }
            let is_weak_dep = match registry.pending.get(&key) {
                Some(record) => record.is_weak_dep,
                None => return,
            };

            if let Some(message) = &error
                && !is_weak_dep
            {
                // first hard failure wins: latch, pre-empt everything pending
                self.errored.store(true, Ordering::SeqCst);
                let Some(record) = registry.pending.remove(&key) else {
                    return;
                };
                registry.order.retain(|k| k != &key);
                for remaining in registry.pending.values() {
                    remaining.timer.abort();
                }
                drop(registry);

                let failure = BarrierError::TaskFailed {
                    task: record.name,
                    message: message.clone(),
                };
                debug!(error = %failure, "ready task failed, latching barrier");
                self.emit(BarrierEvent::Error(failure.clone()));
                self.finish(Err(failure));
                return;
            }

            // success, or a weak failure downgraded to a report
            let Some(record) = registry.pending.remove(&key) else {
                return;
            };
            registry.order.retain(|k| k != &key);
            let remain: Vec<String> = registry
                .order
                .iter()
                .filter_map(|k| registry.pending.get(k).map(|r| r.name.clone()))
                .collect();
            let drained = registry.pending.is_empty();
            drop(registry);

            if let Some(message) = error {
                warn!(task = %record.name, error = %message, "weak dependency failed, continuing");
                self.emit(BarrierEvent::Error(BarrierError::TaskFailed {
                    task: record.name.clone(),
                    message,
                }));
            }
            debug!(task = %record.name, remain = remain.len(), "ready task completed");
            self.emit(BarrierEvent::Stat(ReadyStat {
                id: record.name,
                remain,
            }));

            drained
        };

        if drained {
            self.resolve_success().await;
        }
    }

    /// Run the will-ready hooks, then resolve with success (or with the
    /// first hook failure).
    async fn resolve_success(&self) {
        if self.is_resolved() || self.is_errored() {
            return;
        }
        // drain so the hooks can only ever run once
        let hooks: Vec<Arc<dyn WillReadyHook>> = {
            let mut registry = self.registry();
            registry.hooks.drain(..).collect()
        };
        for hook in hooks {
            if let Err(message) = hook.run().await {
                self.errored.store(true, Ordering::SeqCst);
                let failure = BarrierError::WillReadyFailed { message };
                debug!(error = %failure, "will-ready hook failed");
                self.emit(BarrierEvent::Error(failure.clone()));
                self.finish(Err(failure));
                return;
            }
        }
        debug!("all ready tasks completed, resolving");
        self.finish(Ok(()));
    }

    fn finish(&self, outcome: Result<(), BarrierError>) {
        if self.resolved.swap(true, Ordering::SeqCst) {
            return;
        }
        // 解決後はいかなるシグナルも流さない。残っているタイマーを止める
        for record in self.registry().pending.values() {
            record.timer.abort();
        }
        self.outcome.send_replace(Some(outcome));
    }
}

/// The readiness barrier.
///
/// Cheap to clone; clones share the same registry, latches, and event
/// stream. Construct one per logical application instance, inside a Tokio
/// runtime (timers and deferred completions are spawned tasks).
#[derive(Clone)]
pub struct Barrier {
    inner: Arc<Inner>,
}

impl Barrier {
    /// Barrier with library defaults, started immediately.
    pub fn new() -> Self {
        Self::with_options(BarrierOptions::default())
    }

    pub fn with_options(options: BarrierOptions) -> Self {
        let (outcome, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let lazy_start = options.lazy_start;
        let barrier = Self {
            inner: Arc::new(Inner {
                options,
                registry: Mutex::new(Registry::new()),
                errored: AtomicBool::new(false),
                resolved: AtomicBool::new(false),
                started: AtomicBool::new(false),
                outcome,
                events,
            }),
        };
        if !lazy_start {
            barrier.start();
        }
        barrier
    }

    /// Run the empty-registry check one scheduling turn from now.
    ///
    /// With `lazy_start` this is the explicit trigger; otherwise it already
    /// ran at construction. Idempotent.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            // 同じターンに行われる登録を先に通す
            tokio::task::yield_now().await;
            if inner.registry().pending.is_empty() {
                debug!("no tasks registered, resolving directly");
                inner.resolve_success().await;
            }
        });
    }

    /// Register a named task with instance-default options.
    ///
    /// Fails synchronously when `name` is already pending; the name becomes
    /// reusable once that task completes.
    pub fn register(&self, name: &str) -> Result<CompletionHandle, RegisterError> {
        self.register_inner(Some(name), TaskOptions::default())
    }

    /// Register a named task with per-task option overrides.
    pub fn register_with(
        &self,
        name: &str,
        options: TaskOptions,
    ) -> Result<CompletionHandle, RegisterError> {
        self.register_inner(Some(name), options)
    }

    /// Register a task under a generated unique name.
    ///
    /// Rejected when the barrier was built with `require_name`.
    pub fn register_anonymous(&self) -> Result<CompletionHandle, RegisterError> {
        self.register_inner(None, TaskOptions::default())
    }

    fn register_inner(
        &self,
        name: Option<&str>,
        options: TaskOptions,
    ) -> Result<CompletionHandle, RegisterError> {
        let resolved = options.resolve(&self.inner.options);
        let key = TaskKey::generate();

        let mut registry = self.inner.registry();
        let name = match name {
            Some(name) => {
                if registry.pending.values().any(|r| r.name == name) {
                    return Err(RegisterError::DuplicateTask(name.to_string()));
                }
                name.to_string()
            }
            None if self.inner.options.require_name => return Err(RegisterError::MissingName),
            None => key.to_string(),
        };

        let timer = self.spawn_timer(key, name.clone(), resolved.timeout);
        debug!(
            task = %name,
            key = %key,
            timeout_ms = resolved.timeout.as_millis() as u64,
            weak = resolved.is_weak_dep,
            "register ready task"
        );
        registry.pending.insert(
            key,
            TaskRecord {
                name: name.clone(),
                is_weak_dep: resolved.is_weak_dep,
                timer: timer.clone(),
            },
        );
        registry.order.push(key);
        drop(registry);

        Ok(CompletionHandle::new(
            key,
            name,
            timer,
            Arc::clone(&self.inner),
        ))
    }

    fn spawn_timer(&self, key: TaskKey, name: String, timeout: Duration) -> AbortHandle {
        // Weak: タイマーだけが barrier を延命しないように
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let join = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.task_timed_out(key, &name);
        });
        join.abort_handle()
    }

    /// Wait for the aggregate notification.
    ///
    /// Any number of listeners may wait, before or after resolution; late
    /// listeners receive the stored outcome.
    pub async fn ready(&self) -> Result<(), BarrierError> {
        let mut rx = self.inner.outcome.subscribe();
        loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // unreachable: the sender lives in Inner, which `self`
                // keeps alive
                return Ok(());
            }
        }
    }

    /// Register a hook to run before a successful resolution.
    pub fn will_ready(&self, hook: Arc<dyn WillReadyHook>) {
        self.inner.registry().hooks.push(hook);
    }

    /// Closure form of [`Barrier::will_ready`].
    pub fn will_ready_fn<F, Fut>(&self, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.will_ready(Arc::new(FnHook(hook)));
    }

    /// Subscribe to the `error` / `stat` / `timeout` event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BarrierEvent> {
        self.inner.events.subscribe()
    }

    /// Bind this barrier to a host object.
    ///
    /// Single-use: the first call returns the delegate surface, every later
    /// call returns `None`. When the host advertises an event sink, barrier
    /// events are forwarded to it; hosts without one are fine too.
    pub fn attach(&self, host: Arc<dyn Host>) -> Option<ReadyHandle> {
        {
            let mut registry = self.inner.registry();
            if registry.attached {
                return None;
            }
            registry.attached = true;
        }

        if let Some(sink) = host.event_sink() {
            let mut events = self.inner.events.subscribe();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => sink.emit(&event),
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }

        Some(ReadyHandle {
            barrier: self.clone(),
        })
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

/// Bound delegate surface handed to an attached host.
///
/// The host stores this instead of inheriting from anything; both methods
/// delegate straight to the barrier.
#[derive(Clone)]
pub struct ReadyHandle {
    barrier: Barrier,
}

impl ReadyHandle {
    pub async fn ready(&self) -> Result<(), BarrierError> {
        self.barrier.ready().await
    }

    pub fn ready_callback(&self, name: &str) -> Result<CompletionHandle, RegisterError> {
        self.barrier.register(name)
    }

    pub fn ready_callback_with(
        &self,
        name: &str,
        options: TaskOptions,
    ) -> Result<CompletionHandle, RegisterError> {
        self.barrier.register_with(name, options)
    }
}
