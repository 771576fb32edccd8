//! Premature fan activation
//!
//! A mechanical fan takes real time to reach a commanded duty. This pipe
//! delays the whole stream by a configured lead time and, whenever the duty
//! increases, injects a copy of the fan command one lead time earlier on the
//! simulated time axis. The window releases items in timestamp order, so the
//! shifted copy leaves before the commands that originally preceded it and
//! the fan is already spinning when the feature that wanted it starts.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use fankit_core::{fan, toolhead, Command, CommandName, Fan, Timeline, Toolhead};
use tracing::debug;

use crate::error::Result;
use crate::pipe::{supports_command, Pipe};

const SUPPORTED: &[CommandName] = &[
    CommandName::RapidMove,
    CommandName::LinearMove,
    CommandName::SetPosition,
    CommandName::AbsolutePositioning,
    CommandName::RelativePositioning,
    CommandName::AbsoluteExtrusion,
    CommandName::RelativeExtrusion,
    CommandName::SetFanSpeed,
    CommandName::FanOff,
];

/// Shifts every fan duty increase earlier by a fixed lead time.
pub struct SpinupPipe {
    /// Lead time in milliseconds of print time; also the retention window.
    lead_time: f64,
    toolhead: Toolhead,
    fan: Fan,
    window: Timeline<Command>,
    released: Rc<RefCell<VecDeque<Command>>>,
}

impl SpinupPipe {
    /// Create a spinup pipe with the given lead time in milliseconds.
    pub fn new(lead_time: f64) -> Self {
        let released: Rc<RefCell<VecDeque<Command>>> = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&released);
        let mut window = Timeline::new(lead_time);
        window.add_observer(Box::new(move |_, command: &Command| {
            sink.borrow_mut().push_back(command.clone());
        }));

        Self {
            lead_time,
            toolhead: Toolhead::new(),
            fan: Fan::new(),
            window,
            released,
        }
    }

    fn drain_released(&mut self, out: &mut Vec<Command>) {
        let mut released = self.released.borrow_mut();
        while let Some(command) = released.pop_front() {
            out.push(command);
        }
    }
}

impl Pipe for SpinupPipe {
    fn name(&self) -> &str {
        "fan_spinup"
    }

    fn description(&self) -> &str {
        "Re-issues fan speed increases a configured lead time earlier in the stream"
    }

    fn supported_commands(&self) -> &[CommandName] {
        SUPPORTED
    }

    fn warmup(&mut self) -> Result<()> {
        debug!(lead_time = self.lead_time, "fan spinup armed");
        Ok(())
    }

    fn input(&mut self, command: Command, out: &mut Vec<Command>) -> Result<()> {
        if supports_command(&command, toolhead::SUPPORTED_COMMANDS) {
            self.toolhead.apply(&command);
        }
        if supports_command(&command, fan::SUPPORTED_COMMANDS) {
            self.fan.apply(&command);
            if self.fan.delta() > 0.0 {
                let shifted = self.toolhead.elapsed() - self.lead_time;
                debug!(duty = self.fan.duty(), at = shifted, "shifting fan increase earlier");
                self.window.insert(shifted, self.fan.to_command());
            }
        }

        self.window.insert(self.toolhead.elapsed(), command);
        self.drain_released(out);
        Ok(())
    }

    fn cooldown(&mut self, out: &mut Vec<Command>) -> Result<()> {
        self.window.reset();
        self.drain_released(out);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(pipe: &mut SpinupPipe, line: &str) -> Vec<String> {
        let mut out = Vec::new();
        pipe.input(Command::parse(line, false), &mut out).unwrap();
        out.iter()
            .map(|c| c.serialize().trim_end().to_string())
            .collect()
    }

    fn finish(pipe: &mut SpinupPipe) -> Vec<String> {
        let mut out = Vec::new();
        pipe.cooldown(&mut out).unwrap();
        out.iter()
            .map(|c| c.serialize().trim_end().to_string())
            .collect()
    }

    #[test]
    fn fan_increase_is_released_before_preceding_commands() {
        // 100mm/s feed: a 10mm move is 100ms of print time.
        let mut pipe = SpinupPipe::new(250.0);
        let mut output = Vec::new();
        output.extend(feed(&mut pipe, "G1 X10 E0.1 F6000")); // t=100
        output.extend(feed(&mut pipe, "G1 X20 E0.1")); // t=200
        output.extend(feed(&mut pipe, "G1 X30 E0.1")); // t=300
        output.extend(feed(&mut pipe, "M106 S255")); // t=300, shifted copy at t=50
        output.extend(feed(&mut pipe, "G1 X40 E0.1")); // t=400
        output.extend(finish(&mut pipe));

        let synth = output
            .iter()
            .position(|l| l == "M106 S255.00")
            .expect("shifted fan command present");
        let first_move = output
            .iter()
            .position(|l| l == "G1 X10 E0.1 F6000")
            .expect("original move present");
        // The shifted copy (t=50) leaves before every original command in
        // [t-lead, t): the moves at 100, 200, 300.
        assert!(synth < first_move);
        assert_eq!(output.first().map(String::as_str), Some("M106 S255.00"));
    }

    #[test]
    fn original_fan_command_is_kept_at_its_own_time() {
        let mut pipe = SpinupPipe::new(100.0);
        let mut output = Vec::new();
        output.extend(feed(&mut pipe, "G1 X10 E0.1 F6000"));
        output.extend(feed(&mut pipe, "M106 S255"));
        output.extend(finish(&mut pipe));

        let fan_lines: Vec<&String> = output.iter().filter(|l| l.starts_with("M106")).collect();
        assert_eq!(fan_lines, vec!["M106 S255.00", "M106 S255"]);
    }

    #[test]
    fn duty_decrease_is_not_shifted() {
        let mut pipe = SpinupPipe::new(100.0);
        let mut output = Vec::new();
        output.extend(feed(&mut pipe, "M106 S255"));
        output.extend(feed(&mut pipe, "G1 X10 E0.1 F6000"));
        output.extend(feed(&mut pipe, "M107"));
        output.extend(finish(&mut pipe));

        // One synthesized increase for the initial S255, none for M107.
        let synthesized: Vec<&String> = output
            .iter()
            .filter(|l| l.contains("S0.00") || l.contains("S255.00"))
            .collect();
        assert_eq!(synthesized, vec!["M106 S255.00"]);
        assert!(output.contains(&"M107".to_string()));
    }

    #[test]
    fn stream_order_is_preserved_for_delayed_commands() {
        let mut pipe = SpinupPipe::new(1_000.0);
        let mut output = Vec::new();
        output.extend(feed(&mut pipe, "G1 X10 E0.1 F6000"));
        for step in 2..=5 {
            output.extend(feed(&mut pipe, &format!("G1 X{} E0.1", step * 10)));
        }
        output.extend(finish(&mut pipe));
        assert_eq!(
            output,
            vec![
                "G1 X10 E0.1 F6000",
                "G1 X20 E0.1",
                "G1 X30 E0.1",
                "G1 X40 E0.1",
                "G1 X50 E0.1"
            ]
        );
    }

    #[test]
    fn cooldown_flushes_everything_buffered() {
        let mut pipe = SpinupPipe::new(10_000.0);
        assert!(feed(&mut pipe, "G1 X10 E0.1 F6000").is_empty());
        assert!(feed(&mut pipe, "M106 S255").is_empty());
        let output = finish(&mut pipe);
        assert!(!output.is_empty());
        assert!(pipe.window.is_empty());
    }
}
