//! The pipe abstraction and the chaining protocol
//!
//! A [`Pipe`] is one stage of the streaming transformation: it receives
//! commands one at a time and emits zero or more (possibly different,
//! possibly delayed) commands for the next stage. The chain itself is an
//! ordered list owned by the processor; forwarding happens by handing each
//! stage an output buffer and pushing its emissions into the remainder of
//! the list, which keeps ordering identical to a linked push chain while
//! making the terminal condition explicit.
//!
//! Lifecycle per pipe: `warmup` exactly once before any input, then inputs
//! in stream order, then `cooldown` exactly once. Cooldown must flush any
//! buffered commands; after it returns no pipe may hold unflushed state.

use fankit_core::{Command, CommandName};

use crate::error::Result;

/// One stage of the command pipeline.
pub trait Pipe {
    /// Short identifier, used in logs.
    fn name(&self) -> &str;

    /// One-line description of what this pipe does.
    fn description(&self) -> &str;

    /// The command names this pipe interprets semantically. Commands outside
    /// this set still flow through, but their parameters need not be parsed.
    fn supported_commands(&self) -> &[CommandName];

    /// Setup hook, called exactly once before any input.
    fn warmup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Receive one command, pushing any forwarded commands into `out` in
    /// emission order.
    fn input(&mut self, command: Command, out: &mut Vec<Command>) -> Result<()>;

    /// Teardown hook, called exactly once after the stream is exhausted (or
    /// on error). Must flush buffered commands into `out`.
    fn cooldown(&mut self, out: &mut Vec<Command>) -> Result<()> {
        let _ = out;
        Ok(())
    }

    /// Membership test against this pipe's supported set.
    fn supports(&self, command: &Command) -> bool {
        supports_command(command, self.supported_commands())
    }
}

/// Membership test of a command's name in an arbitrary command-name set.
pub fn supports_command(command: &Command, set: &[CommandName]) -> bool {
    set.contains(&command.name)
}

/// Push one command into the head of `pipes`, cascading every emission
/// through the remaining stages. An empty slice is the tail of the chain and
/// swallows the command.
pub fn feed_chain(pipes: &mut [Box<dyn Pipe>], command: Command) -> Result<()> {
    let Some((head, rest)) = pipes.split_first_mut() else {
        return Ok(());
    };
    let mut emitted = Vec::new();
    head.input(command, &mut emitted)?;
    for command in emitted {
        feed_chain(rest, command)?;
    }
    Ok(())
}

/// Warm up every pipe, head first.
pub fn warmup_chain(pipes: &mut [Box<dyn Pipe>]) -> Result<()> {
    for pipe in pipes {
        pipe.warmup()?;
    }
    Ok(())
}

/// Cool down every pipe, head first, cascading flushed commands through the
/// stages behind it. Teardown is best-effort: every pipe gets its cooldown
/// call even if an earlier one fails, and the first error is returned.
pub fn cooldown_chain(pipes: &mut [Box<dyn Pipe>]) -> Result<()> {
    let mut first_error = None;
    for index in 0..pipes.len() {
        if let Some((pipe, rest)) = pipes[index..].split_first_mut() {
            let mut emitted = Vec::new();
            let result = pipe
                .cooldown(&mut emitted)
                .and_then(|()| {
                    for command in emitted {
                        feed_chain(rest, command)?;
                    }
                    Ok(())
                });
            if let Err(error) = result {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }
    match first_error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
