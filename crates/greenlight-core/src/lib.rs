//! greenlight-core
//!
//! Core building blocks for the Greenlight readiness barrier.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, options, events, errors）
//! - **ports**: 抽象化レイヤー（Host, EventSink, WillReadyHook）
//! - **barrier**: バリア本体（registry, latches, timers, resolution）
//!
//! A [`Barrier`] tracks named boot tasks registered by independent pieces of
//! initialization work. Each registration hands back a [`CompletionHandle`];
//! when the last handle resolves (or the first hard failure latches), the
//! barrier fires its aggregate notification exactly once. Listeners can
//! attach before or after that point and always observe the stored outcome.

pub mod barrier;
pub mod domain;
pub mod ports;

pub use barrier::{Barrier, CompletionHandle, ReadyHandle};
pub use domain::{
    BarrierError, BarrierEvent, BarrierOptions, ReadyStat, RegisterError, TaskKey, TaskOptions,
};
pub use ports::{EventSink, Host, WillReadyHook};
