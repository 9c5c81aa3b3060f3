//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod combat;
pub mod particles;
pub mod state;
pub mod tick;

pub use collision::{resolve_collisions, toroidal_delta, toroidal_distance_sq};
pub use combat::{ComboState, ExecStage, FinisherPhase, FinisherState};
pub use particles::{Particle, ParticleKind, ParticlePool};
pub use state::{
    Asteroid, Bullet, Enemy, EnemyBrain, EntityId, FloatingText, GamePhase, GameState, Owner,
    PowerUp, PowerUpKind, RenderSnapshot, Ship,
};
pub use tick::{TickInput, tick};
