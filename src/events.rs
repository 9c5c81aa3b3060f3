//! Discrete notifications for audio/UI collaborators
//!
//! Queued on the game state during a tick and drained afterwards. Delivery is
//! fire-and-forget: the queue is cleared at the start of every tick, so a
//! session with no consumer never grows unbounded.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::progression::Achievement;
use crate::sim::state::PowerUpKind;

/// Something noteworthy that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Player weapon fired
    Fired,
    /// Enemy weapon fired
    EnemyFired,
    ExplosionSmall { pos: Vec2 },
    ExplosionMedium { pos: Vec2 },
    ExplosionLarge { pos: Vec2 },
    Dash,
    ShipHit,
    ShieldBroken,
    ShipDestroyed,
    PowerUpCollected { kind: PowerUpKind },
    /// Streak extended; carries the new kill count
    ComboIncrement { count: u32 },
    /// Kill count crossed a configured milestone
    ComboMilestone { count: u32 },
    /// Decay window expired with no kill
    ComboBroken { count: u32 },
    /// Finisher meter reached its threshold
    FinisherReady,
    FinisherLockOn,
    FinisherImpact { pos: Vec2 },
    LevelTransition { level: u32 },
    GameOver,
    AchievementUnlocked { achievement: Achievement },
}
