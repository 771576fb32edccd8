//! File processor: wires pipes into a chain and streams a gcode file
//! through it

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use fankit_core::{Command, CommandName};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pipe::{cooldown_chain, feed_chain, warmup_chain, Pipe};
use crate::writer::GcodeWriterPipe;

/// Owns an ordered list of pipes and runs a source file through them.
///
/// The transformation is all-or-nothing with respect to the source: output
/// goes to a sibling file which replaces the original only after the whole
/// stream has been processed and flushed. On error the sibling is removed
/// and the original is left untouched.
#[derive(Default)]
pub struct Processor {
    pipes: Vec<Box<dyn Pipe>>,
}

impl Processor {
    /// Create a processor with no pipes; running it copies the file through
    /// the writer unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pipe. List order is chain order.
    pub fn add_pipe(&mut self, pipe: Box<dyn Pipe>) -> &mut Self {
        self.pipes.push(pipe);
        self
    }

    /// Number of configured pipes, terminal writer excluded.
    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Stream `path` through the chain and atomically replace it with the
    /// result.
    pub fn run(mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(Error::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let output_path = sibling_path(path);
        info!(path = %path.display(), pipes = self.pipes.len(), "processing gcode file");

        self.pipes
            .push(Box::new(GcodeWriterPipe::create(&output_path)?));

        // Commands no pipe interprets take the name-only parse fast path.
        let supported: HashSet<CommandName> = self
            .pipes
            .iter()
            .flat_map(|pipe| pipe.supported_commands().iter().cloned())
            .collect();

        let streamed = warmup_chain(&mut self.pipes)
            .and_then(|()| stream_file(&mut self.pipes, path, &supported));
        // Cooldown runs regardless so buffered state flushes best-effort.
        let cooled = cooldown_chain(&mut self.pipes);

        match streamed.and(cooled) {
            Ok(()) => {
                fs::rename(&output_path, path)?;
                info!(path = %path.display(), "gcode file replaced");
                Ok(())
            }
            Err(error) => {
                let _ = fs::remove_file(&output_path);
                Err(error)
            }
        }
    }
}

fn stream_file(
    pipes: &mut [Box<dyn Pipe>],
    path: &Path,
    supported: &HashSet<CommandName>,
) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines_read = 0u64;

    for line in reader.lines() {
        let line = line?;
        let quick = Command::parse(&line, true);
        let command = if supported.contains(&quick.name) {
            Command::parse(&line, false)
        } else {
            quick
        };
        feed_chain(pipes, command)?;
        lines_read += 1;
    }

    debug!(lines = lines_read, "input exhausted");
    Ok(())
}

/// Output path beside the input; renamed over the input on success.
fn sibling_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".fankit.tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_path_keeps_directory_and_extension() {
        let path = Path::new("/prints/benchy.gcode");
        assert_eq!(
            sibling_path(path),
            PathBuf::from("/prints/benchy.gcode.fankit.tmp")
        );
    }
}
