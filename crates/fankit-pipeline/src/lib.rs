//! # Fankit Pipeline
//!
//! The streaming transformation layer of Fankit: the [`Pipe`] abstraction
//! and chaining protocol, the two built-in fan post-processing algorithms
//! ([`SmoothingPipe`], [`SpinupPipe`]), the terminal [`GcodeWriterPipe`]
//! sink, and the [`Processor`] that streams a gcode file through a chain
//! and atomically replaces it with the result.
//!
//! The whole layer is single-threaded and push-based: one input line
//! propagates synchronously through every stage before the next line is
//! read.

pub mod error;
pub mod pipe;
pub mod processor;
pub mod smoothing;
pub mod spinup;
pub mod writer;

pub use error::{Error, Result};
pub use pipe::{supports_command, Pipe};
pub use processor::Processor;
pub use smoothing::SmoothingPipe;
pub use spinup::SpinupPipe;
pub use writer::GcodeWriterPipe;
