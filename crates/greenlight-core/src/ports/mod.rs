//! Ports - 抽象化レイヤー（Host, EventSink, WillReadyHook）。
//!
//! The barrier touches its surroundings only through these traits, so a
//! host can be anything from an HTTP server to a test double.

pub mod event_sink;
pub mod host;
pub mod will_ready;

pub use event_sink::EventSink;
pub use host::Host;
pub use will_ready::WillReadyHook;
