//! Domain model (task keys, options, events, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod options;

pub use errors::{BarrierError, RegisterError};
pub use events::{BarrierEvent, ReadyStat};
pub use ids::TaskKey;
pub use options::{BarrierOptions, DEFAULT_TIMEOUT, TaskOptions};
