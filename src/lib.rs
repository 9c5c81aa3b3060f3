//! Shardstorm - deterministic arcade space-combat simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, physics, collisions, combat)
//! - `config`: Immutable session tunables
//! - `events`: Discrete notifications for audio/UI collaborators
//! - `progression`: Score/currency/achievement counters and save snapshots
//!
//! The crate performs no drawing, audio, or file I/O. Collaborators consume
//! a read-only render snapshot, a per-frame event queue, and a flat
//! progression snapshot at save points.

pub mod config;
pub mod events;
pub mod progression;
pub mod sim;

pub use config::{ComboRetention, Tunables};
pub use events::GameEvent;
pub use progression::{Achievement, ProgressionSnapshot};

use glam::Vec2;

/// Simulation timing constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Ticks per second, for converting per-tick decay constants
    pub const TICK_RATE: f32 = 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;
}

/// Normalize angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector for a heading angle (radians)
#[inline]
pub fn heading_vec(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Wrap a point into the [0, w) × [0, h) field
///
/// Entities are never destroyed by leaving the field; they re-enter on the
/// opposite edge.
#[inline]
pub fn wrap_point(p: Vec2, field: Vec2) -> Vec2 {
    Vec2::new(p.x.rem_euclid(field.x), p.y.rem_euclid(field.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((normalize_angle(2.0 * PI + 0.5) - 0.5).abs() < 1e-5);
        assert!((normalize_angle(-2.0 * PI - 0.5) + 0.5).abs() < 1e-5);
        // Odd multiples of π land within rounding of the ±π seam; only the
        // half-open range is guaranteed
        for angle in [3.0 * PI, -3.0 * PI, PI, -PI] {
            let n = normalize_angle(angle);
            assert!((-PI..PI).contains(&n), "{angle} -> {n}");
            assert!((n.abs() - PI).abs() < 1e-5);
        }
    }

    #[test]
    fn test_wrap_point() {
        let field = Vec2::new(800.0, 600.0);
        assert_eq!(wrap_point(Vec2::new(810.0, -10.0), field), Vec2::new(10.0, 590.0));
        assert_eq!(wrap_point(Vec2::new(400.0, 300.0), field), Vec2::new(400.0, 300.0));
    }
}
