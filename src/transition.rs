//! Timed transitions.
//!
//! A settling piece moves from where it was released to where it will rest.
//! The move is a plain record of start, end, elapsed and duration; it
//! finishes exactly when `elapsed >= duration`, whatever the tick sizes were.

use crate::geometry::Vec3;

/// A linear move between two positions over a fixed duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    duration: f32,
}

impl Transition {
    pub fn new(from: Vec3, to: Vec3, duration: f32) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Advances the clock by `dt` seconds; returns `true` once finished.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt.max(0.0);
        self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Fraction of the move completed, in `0..=1`.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        }
    }

    /// Position to present at the current point of the move.
    pub fn position(&self) -> Vec3 {
        self.from.lerp(self.to, self.progress())
    }

    pub const fn target(&self) -> Vec3 {
        self.to
    }
}
