//! Fan simulator: tracks part-cooling duty and its last change

use crate::command::{Command, CommandName};

/// Commands the fan simulator interprets.
pub const SUPPORTED_COMMANDS: &[CommandName] = &[CommandName::SetFanSpeed, CommandName::FanOff];

/// Default duty when M106 carries no S parameter (full speed, Marlin
/// convention).
const DEFAULT_DUTY: f64 = 255.0;

/// Tracks the current fan duty and the signed delta of the last change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fan {
    duty: f64,
    delta: f64,
}

impl Fan {
    /// Create a fan at zero duty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`Fan::apply`] would interpret this command.
    pub fn supports(command: &Command) -> bool {
        SUPPORTED_COMMANDS.contains(&command.name)
    }

    /// Feed one command to the simulator. Non-fan commands leave the duty
    /// untouched and zero the delta.
    pub fn apply(&mut self, command: &Command) {
        let new_duty = match command.name {
            CommandName::SetFanSpeed => command.arg_f64("S").unwrap_or(DEFAULT_DUTY),
            CommandName::FanOff => 0.0,
            _ => {
                self.delta = 0.0;
                return;
            }
        };
        self.delta = new_duty - self.duty;
        self.duty = new_duty;
    }

    /// Current duty value.
    pub fn duty(&self) -> f64 {
        self.duty
    }

    /// Signed change of the last applied fan command.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Synthesize an M106 carrying the current duty, for re-injection into
    /// the stream.
    pub fn to_command(&self) -> Command {
        duty_command(self.duty)
    }
}

/// Build an M106 command for an arbitrary duty value.
pub fn duty_command(duty: f64) -> Command {
    let mut command = Command::new(CommandName::SetFanSpeed);
    command.parameters.insert("S", format!("{:.2}", duty));
    command
}
