//! Fan chatter suppression
//!
//! Slicers that modulate the part-cooling fan per feature can emit dozens of
//! M106/M107 lines within a few hundred milliseconds of print time. This
//! pipe collapses each burst into a single command carrying the maximum duty
//! observed in the window, so the fan holds the most demanding setting
//! instead of chattering. Motion context still matters: a long travel move
//! or a layer change ends the window early, because the feature that asked
//! for the duty is over.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use fankit_core::{fan, toolhead, Command, CommandName, Fan, Timeline, Toolhead};
use tracing::debug;

use crate::error::Result;
use crate::pipe::{supports_command, Pipe};

/// Pending commands at exactly the last sample's time are released with it.
const LOOKAHEAD_EPSILON: f64 = 1e-6;

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

/// Collapses rapid fan duty changes into one representative command.
///
/// Two manually managed timelines carry the state: `pending` buffers every
/// non-fan command seen since smoothing began, `samples` records each
/// observed duty change at its simulated time. Smoothing is active whenever
/// `samples` is non-empty; resolution emits the maximum recorded duty ahead
/// of the buffered commands.
pub struct SmoothingPipe {
    /// Window length in milliseconds of print time.
    smooth_time: f64,
    /// Travel distance in mm that ends the window early.
    reset_distance: f64,
    toolhead: Toolhead,
    fan: Fan,
    pending: Timeline<Command>,
    samples: Timeline<f64>,
    /// Commands released by `pending` evictions, drained into `out` after
    /// every operation.
    released: Rc<RefCell<VecDeque<Command>>>,
    /// Duty of the last command actually emitted downstream.
    last_emitted: Option<f64>,
}

impl SmoothingPipe {
    /// Create a smoothing pipe. `smooth_time` is the suppression window in
    /// milliseconds, `reset_distance` the travel length in mm that ends it.
    pub fn new(smooth_time: f64, reset_distance: f64) -> Self {
        let released: Rc<RefCell<VecDeque<Command>>> = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&released);
        let mut pending = Timeline::unbounded();
        pending.add_observer(Box::new(move |_, command: &Command| {
            sink.borrow_mut().push_back(command.clone());
        }));

        Self {
            smooth_time,
            reset_distance,
            toolhead: Toolhead::new(),
            fan: Fan::new(),
            pending,
            samples: Timeline::unbounded(),
            released,
            last_emitted: None,
        }
    }

    fn active(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Whether the stream has moved past the point where the buffered duty
    /// must be decided.
    fn should_resolve(&self) -> bool {
        let Some(last_sample) = self.samples.last() else {
            return false;
        };
        if self.toolhead.elapsed() - last_sample.timestamp >= self.smooth_time {
            return true;
        }
        let displacement = self.toolhead.displacement();
        if displacement.is_free_move() && displacement.move_length() > self.reset_distance {
            return true;
        }
        displacement.is_layer_change()
    }

    /// Emit the maximum recorded duty and release buffered commands.
    ///
    /// With more than one sample recorded, only commands up to the newest
    /// sample are released and that sample is kept, so a reversal landing in
    /// the same window can still be folded into the next resolution. With a
    /// single sample the original duty stands confirmed and both stores are
    /// cleared outright.
    fn resolve(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        let max_duty = self
            .samples
            .iter()
            .map(|item| item.payload)
            .fold(f64::MIN, f64::max);

        if self.last_emitted != Some(max_duty) {
            let mut front = self
                .samples
                .first()
                .map(|item| item.timestamp)
                .unwrap_or_else(|| self.toolhead.elapsed());
            if let Some(item) = self.pending.first() {
                front = front.min(item.timestamp);
            }
            debug!(duty = max_duty, "resolving smoothed fan duty");
            self.pending.insert(front - 1.0, fan::duty_command(max_duty));
        }

        if self.samples.len() > 1 {
            // Keep only the newest sample for look-ahead; everything
            // buffered up to its time leaves now. Samples can share a
            // timestamp (several fan commands between moves), so the
            // collapse is positional rather than time-based.
            let keep = self.samples.last().cloned();
            self.samples.reset();
            if let Some(item) = keep {
                self.samples.insert(item.timestamp, item.payload);
                self.pending
                    .evict_all_older_than(item.timestamp + LOOKAHEAD_EPSILON);
            }
        } else {
            self.samples.reset();
            self.pending.reset();
        }
        self.last_emitted = Some(max_duty);
    }

    fn drain_released(&mut self, out: &mut Vec<Command>) {
        let mut released = self.released.borrow_mut();
        while let Some(command) = released.pop_front() {
            out.push(command);
        }
    }
}

impl Pipe for SmoothingPipe {
    fn name(&self) -> &str {
        "fan_smoothing"
    }

    fn description(&self) -> &str {
        "Collapses bursts of fan speed changes into one windowed-maximum command"
    }

    fn supported_commands(&self) -> &[CommandName] {
        SUPPORTED
    }

    fn warmup(&mut self) -> Result<()> {
        debug!(
            smooth_time = self.smooth_time,
            reset_distance = self.reset_distance,
            "fan smoothing armed"
        );
        Ok(())
    }

    fn input(&mut self, command: Command, out: &mut Vec<Command>) -> Result<()> {
        if supports_command(&command, toolhead::SUPPORTED_COMMANDS) {
            self.toolhead.apply(&command);
        }

        if self.active() && self.should_resolve() {
            self.resolve();
        }

        let now = self.toolhead.elapsed();
        if supports_command(&command, fan::SUPPORTED_COMMANDS) {
            // The original fan command is consumed here; only resolved
            // duties are forwarded.
            self.fan.apply(&command);
            if self.fan.delta() != 0.0 {
                self.samples.insert(now, self.fan.duty());
            }
        } else {
            self.pending.insert(now, command);
        }

        if !self.active() {
            // Nothing to buffer for; pass everything straight through.
            self.pending.reset();
        }

        self.drain_released(out);
        Ok(())
    }

    fn cooldown(&mut self, out: &mut Vec<Command>) -> Result<()> {
        if self.active() {
            // First resolution flushes the look-ahead window, the second
            // finalizes whatever it kept.
            self.resolve();
            self.resolve();
        }
        self.samples.reset();
        self.pending.reset();
        self.drain_released(out);
        Ok(())
    }
}
