//! # Fankit
//!
//! A gcode post-processor for 3D-printer slicer output. Fankit streams a
//! sliced file through a chain of transformation pipes and writes the result
//! back in place. The built-in pipes fight part-cooling fan "chatter":
//!
//! - **fan smoothing** collapses bursts of fan speed changes into one
//!   windowed-maximum command
//! - **fan spinup** re-issues fan speed increases early so the fan has time
//!   to reach speed before the feature that requested it
//!
//! ## Architecture
//!
//! Fankit is organized as a workspace:
//!
//! 1. **fankit-core** - command model, timeline buffer, toolhead/fan
//!    simulators
//! 2. **fankit-pipeline** - pipe protocol, algorithms, file processor
//! 3. **fankit** - the command-line binary

pub use fankit_core::{
    AxisMode, Command, CommandName, Displacement, Fan, Parameters, Position, Timeline,
    TimelineItem, Toolhead,
};

pub use fankit_pipeline::{
    supports_command, Error, GcodeWriterPipe, Pipe, Processor, Result, SmoothingPipe, SpinupPipe,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with console output and RUST_LOG environment
/// variable support.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
