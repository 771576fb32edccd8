//! Terminal sink pipe that serializes commands to the output file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fankit_core::{Command, CommandName};
use tracing::debug;

use crate::error::Result;
use crate::pipe::Pipe;

/// Tail of every chain: writes each command it receives and forwards
/// nothing.
pub struct GcodeWriterPipe {
    writer: BufWriter<File>,
    path: PathBuf,
    lines_written: u64,
    bytes_written: u64,
}

impl GcodeWriterPipe {
    /// Create the output file and a writer pipe over it.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            lines_written: 0,
            bytes_written: 0,
        })
    }

    /// Lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl Pipe for GcodeWriterPipe {
    fn name(&self) -> &str {
        "gcode_writer"
    }

    fn description(&self) -> &str {
        "Serializes commands to the output file"
    }

    fn supported_commands(&self) -> &[CommandName] {
        &[]
    }

    fn input(&mut self, command: Command, _out: &mut Vec<Command>) -> Result<()> {
        let line = command.serialize();
        self.writer.write_all(line.as_bytes())?;
        self.lines_written += 1;
        self.bytes_written += line.len() as u64;
        Ok(())
    }

    fn cooldown(&mut self, _out: &mut Vec<Command>) -> Result<()> {
        self.writer.flush()?;
        debug!(
            path = %self.path.display(),
            lines = self.lines_written,
            bytes = self.bytes_written,
            "output flushed"
        );
        Ok(())
    }
}
