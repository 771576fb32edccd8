//! Toolhead simulator: reconstructs position, velocity, and print time
//!
//! Slicer output carries no wall-clock timestamps, so the pipeline rebuilds
//! an approximate time axis by replaying motion commands against a simulated
//! toolhead. The approximation is deliberately simple: every move runs at the
//! last commanded feed rate, with no acceleration model.

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandName};

/// Commands the toolhead simulator interprets; everything else is a no-op.
pub const SUPPORTED_COMMANDS: &[CommandName] = &[
    CommandName::RapidMove,
    CommandName::LinearMove,
    CommandName::SetPosition,
    CommandName::AbsolutePositioning,
    CommandName::RelativePositioning,
    CommandName::AbsoluteExtrusion,
    CommandName::RelativeExtrusion,
];

/// How coordinates on an axis group are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisMode {
    /// Parameters are absolute target coordinates (G90/M82).
    Absolute,
    /// Parameters are deltas from the current position (G91/M83).
    Relative,
}

/// Absolute toolhead position, extrusion included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

/// Displacement of the most recent motion command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

impl Displacement {
    /// Euclidean length of the XYZ component; extrusion does not count as
    /// travel.
    pub fn move_length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// A planar move that extrudes nothing (travel / wipe).
    pub fn is_free_move(&self) -> bool {
        (self.x != 0.0 || self.y != 0.0) && self.e == 0.0
    }

    /// A pure Z move with no planar component.
    pub fn is_layer_change(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z != 0.0
    }
}

/// Replays motion commands to track position, modes, velocity, and an
/// accumulated approximate print time in milliseconds.
///
/// One instance per pipe that needs time context; it is mutated only by
/// feeding it commands in stream order and is never reset mid-stream.
#[derive(Debug, Clone)]
pub struct Toolhead {
    position: Position,
    positioning: AxisMode,
    extrusion: AxisMode,
    displacement: Displacement,
    velocity: f64,
    elapsed: f64,
}

impl Default for Toolhead {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolhead {
    /// Create a toolhead at the origin in absolute positioning, with no
    /// established feed rate.
    pub fn new() -> Self {
        Self {
            position: Position::default(),
            positioning: AxisMode::Absolute,
            extrusion: AxisMode::Absolute,
            displacement: Displacement::default(),
            velocity: 0.0,
            elapsed: 0.0,
        }
    }

    /// Whether [`Toolhead::apply`] would interpret this command.
    pub fn supports(command: &Command) -> bool {
        SUPPORTED_COMMANDS.contains(&command.name)
    }

    /// Feed one command to the simulator. Mode switches, position overrides,
    /// and motion are handled in that fixed order; unsupported commands are
    /// no-ops.
    pub fn apply(&mut self, command: &Command) {
        match command.name {
            CommandName::AbsolutePositioning => self.positioning = AxisMode::Absolute,
            CommandName::RelativePositioning => self.positioning = AxisMode::Relative,
            CommandName::AbsoluteExtrusion => self.extrusion = AxisMode::Absolute,
            CommandName::RelativeExtrusion => self.extrusion = AxisMode::Relative,
            CommandName::SetPosition => self.apply_set_position(command),
            CommandName::RapidMove | CommandName::LinearMove => self.apply_motion(command),
            _ => {}
        }
    }

    /// G92: overwrite position without moving or advancing time.
    fn apply_set_position(&mut self, command: &Command) {
        if let Some(x) = command.arg_f64("X") {
            self.position.x = x;
        }
        if let Some(y) = command.arg_f64("Y") {
            self.position.y = y;
        }
        if let Some(z) = command.arg_f64("Z") {
            self.position.z = z;
        }
        if let Some(e) = command.arg_f64("E") {
            self.position.e = e;
        }
    }

    fn apply_motion(&mut self, command: &Command) {
        // F is mm/min on the wire; the feed applies to the move on the same
        // line, so update velocity first.
        if let Some(feed) = command.arg_f64("F") {
            self.velocity = feed / 60.0;
        }

        let positioning = self.positioning;
        let extrusion = self.extrusion;
        let displacement = Displacement {
            x: Self::axis_delta(positioning, &mut self.position.x, command.arg_f64("X")),
            y: Self::axis_delta(positioning, &mut self.position.y, command.arg_f64("Y")),
            z: Self::axis_delta(positioning, &mut self.position.z, command.arg_f64("Z")),
            e: Self::axis_delta(extrusion, &mut self.position.e, command.arg_f64("E")),
        };
        self.displacement = displacement;

        // A move issued before any feed rate is established would divide by
        // zero; it is treated as instantaneous instead.
        let length = displacement.move_length();
        if length > 0.0 && self.velocity > 0.0 {
            self.elapsed += length / self.velocity * 1000.0;
        }
    }

    fn axis_delta(mode: AxisMode, current: &mut f64, parameter: Option<f64>) -> f64 {
        match (parameter, mode) {
            (Some(target), AxisMode::Absolute) => {
                let delta = target - *current;
                *current = target;
                delta
            }
            (Some(step), AxisMode::Relative) => {
                *current += step;
                step
            }
            (None, _) => 0.0,
        }
    }

    /// Current absolute position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Displacement of the last motion command.
    pub fn displacement(&self) -> Displacement {
        self.displacement
    }

    /// Current feed velocity in units per second.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Accumulated approximate print time in milliseconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
