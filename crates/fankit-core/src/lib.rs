//! # Fankit Core
//!
//! Core data model for the Fankit gcode post-processor:
//! - the command/parameter model and its parsing/serialization rules
//! - the chronological [`Timeline`] buffer with sliding-window eviction
//! - the [`Toolhead`] and [`Fan`] simulators that reconstruct approximate
//!   print time and fan state from a raw command stream

pub mod command;
pub mod fan;
pub mod timeline;
pub mod toolhead;

pub use command::{Command, CommandName, Parameters, COMMENT_KEY};
pub use fan::Fan;
pub use timeline::{EvictionObserver, Timeline, TimelineItem};
pub use toolhead::{AxisMode, Displacement, Position, Toolhead};
