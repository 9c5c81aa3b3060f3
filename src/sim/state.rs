//! Game state and core simulation types
//!
//! All state that must be persisted for Continue/determinism lives here.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::combat::{ComboState, FinisherPhase, FinisherState};
use super::particles::ParticlePool;
use crate::config::Tunables;
use crate::events::GameEvent;
use crate::progression::{Progression, ProgressionSnapshot};

/// Monotonic entity identifier, never reused within a session
pub type EntityId = u32;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Field cleared, pausing before the next level spawns
    LevelClear,
    /// Game is paused
    Paused,
    /// Run ended
    GameOver,
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Heading angle in radians
    pub heading: f32,
    pub radius: f32,
    /// False while waiting to respawn
    pub alive: bool,
    pub respawn_timer: f32,
    /// Post-hit / post-respawn grace period
    pub invuln_timer: f32,
    /// Shield absorbs one hit
    pub shield: bool,
    pub rapid_fire_timer: f32,
    pub triple_shot_timer: f32,
    pub fire_cooldown: f32,
    /// Remaining dash burst time; invulnerable while > 0
    pub dash_timer: f32,
    pub dash_cooldown: f32,
    /// Set during the physics stage when thrust input is held
    #[serde(skip)]
    pub thrusting: bool,
}

impl Ship {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            heading: -std::f32::consts::FRAC_PI_2,
            radius,
            alive: true,
            respawn_timer: 0.0,
            invuln_timer: 0.0,
            shield: false,
            rapid_fire_timer: 0.0,
            triple_shot_timer: 0.0,
            fire_cooldown: 0.0,
            dash_timer: 0.0,
            dash_cooldown: 0.0,
            thrusting: false,
        }
    }

    pub fn dash_active(&self) -> bool {
        self.dash_timer > 0.0
    }
}

/// An asteroid; size tiers 1 (small) through 3 (large)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: u8,
    pub radius: f32,
    pub rotation: f32,
    /// Spin rate in radians/sec
    pub spin: f32,
    /// Marked for removal by the collision pass
    #[serde(skip)]
    pub doomed: bool,
}

/// Enemy steering behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnemyBrain {
    /// Closes to a preferred distance, backs off when crowded
    Hunter,
    /// Orbits the ship while slowly closing in
    Circler { orbit_angle: f32, clockwise: bool },
    /// Slow drift toward the ship; high health, crystal shower on death
    Boss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub brain: EnemyBrain,
    pub health: i32,
    pub radius: f32,
    /// Countdown to the next shot
    pub fire_timer: f32,
    #[serde(skip)]
    pub doomed: bool,
}

/// Who fired a bullet; enemy ids are weak references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy(EntityId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub owner: Owner,
    pub ttl: f32,
    #[serde(skip)]
    pub doomed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    RapidFire,
    TripleShot,
    Shield,
    ExtraLife,
    /// Currency pickup
    Crystal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: EntityId,
    pub pos: Vec2,
    pub kind: PowerUpKind,
    pub ttl: f32,
    #[serde(skip)]
    pub doomed: bool,
}

/// Floating score/combo text marker (visual only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingText {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub text: String,
    pub ttl: f32,
}

/// RNG state wrapper for serialization
///
/// Each tick derives a fresh generator from (seed, stream) and bumps the
/// stream, so replaying a serialized state stays deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }

    /// Generator for the next tick; advances the stream
    pub fn next_tick_rng(&mut self) -> Pcg32 {
        let rng = self.to_rng();
        self.stream = self.stream.wrapping_add(1);
        rng
    }
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// RNG state
    pub rng_state: RngState,
    /// Session tunables, immutable after construction
    pub tunables: Tunables,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Current level (1-based)
    pub level: u32,
    pub lives: u32,
    pub phase: GamePhase,
    /// Remaining level-clear pause
    pub transition_timer: f32,
    pub ship: Ship,
    /// Entity collections, sorted by id for determinism
    pub asteroids: Vec<Asteroid>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub powerups: Vec<PowerUp>,
    pub texts: Vec<FloatingText>,
    pub combo: ComboState,
    pub finisher: FinisherState,
    pub progression: Progression,
    /// Screen shake magnitude, decays per tick
    pub screen_shake: f32,
    /// Visual particles (not gameplay-affecting)
    #[serde(skip)]
    pub particles: ParticlePool,
    /// Events queued this tick, drained by collaborators
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: EntityId,
}

impl GameState {
    /// Create a new game state with the given seed and tunables
    pub fn new(seed: u64, tunables: Tunables) -> Self {
        let ship = Ship::new(tunables.field * 0.5, tunables.ship.radius);
        let capacity = tunables.particles.capacity;
        let lives = tunables.ship.starting_lives;
        Self {
            seed,
            rng_state: RngState::new(seed),
            tunables,
            time_ticks: 0,
            level: 1,
            lives,
            phase: GamePhase::Playing,
            transition_timer: 0.0,
            ship,
            asteroids: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            powerups: Vec::new(),
            texts: Vec::new(),
            combo: ComboState::default(),
            finisher: FinisherState::default(),
            progression: Progression::default(),
            screen_shake: 0.0,
            particles: ParticlePool::with_capacity(capacity),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take this tick's queued events; ignoring them is a safe no-op
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn spawn_asteroid(&mut self, pos: Vec2, vel: Vec2, size: u8, spin: f32) -> EntityId {
        let id = self.next_entity_id();
        let radius = size as f32 * self.tunables.asteroids.radius_per_size;
        self.asteroids.push(Asteroid {
            id,
            pos,
            vel,
            size,
            radius,
            rotation: 0.0,
            spin,
            doomed: false,
        });
        id
    }

    pub fn spawn_enemy(&mut self, pos: Vec2, brain: EnemyBrain, fire_timer: f32) -> EntityId {
        let id = self.next_entity_id();
        let (health, radius) = match brain {
            EnemyBrain::Boss => (self.tunables.enemies.boss_health, self.tunables.enemies.boss_radius),
            _ => (self.tunables.enemies.health, self.tunables.enemies.radius),
        };
        self.enemies.push(Enemy {
            id,
            pos,
            vel: Vec2::ZERO,
            brain,
            health,
            radius,
            fire_timer,
            doomed: false,
        });
        id
    }

    pub fn spawn_bullet(&mut self, pos: Vec2, vel: Vec2, owner: Owner) -> EntityId {
        let id = self.next_entity_id();
        let ttl = self.tunables.weapons.bullet_lifetime;
        self.bullets.push(Bullet {
            id,
            pos,
            vel,
            owner,
            ttl,
            doomed: false,
        });
        id
    }

    pub fn spawn_powerup(&mut self, pos: Vec2, kind: PowerUpKind) -> EntityId {
        let id = self.next_entity_id();
        let ttl = self.tunables.powerups.lifetime;
        self.powerups.push(PowerUp {
            id,
            pos,
            kind,
            ttl,
            doomed: false,
        });
        id
    }

    pub fn spawn_floating_text(&mut self, pos: Vec2, vel: Vec2, text: String) -> EntityId {
        let id = self.next_entity_id();
        let ttl = self.tunables.effects.floating_text_life;
        self.texts.push(FloatingText {
            id,
            pos,
            vel,
            text,
            ttl,
        });
        id
    }

    /// Remove an entity by id from whichever collection holds it
    pub fn remove(&mut self, id: EntityId) {
        self.asteroids.retain(|a| a.id != id);
        self.enemies.retain(|e| e.id != id);
        self.bullets.retain(|b| b.id != id);
        self.powerups.retain(|p| p.id != id);
        self.texts.retain(|t| t.id != id);
    }

    /// Drop everything the collision pass marked
    pub fn sweep_doomed(&mut self) {
        self.asteroids.retain(|a| !a.doomed);
        self.enemies.retain(|e| !e.doomed);
        self.bullets.retain(|b| !b.doomed);
        self.powerups.retain(|p| !p.doomed);
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.asteroids.sort_by_key(|a| a.id);
        self.enemies.sort_by_key(|e| e.id);
        self.bullets.sort_by_key(|b| b.id);
        self.powerups.sort_by_key(|p| p.id);
        self.texts.sort_by_key(|t| t.id);
    }

    /// True while the ship cannot take damage
    pub fn ship_invulnerable(&self) -> bool {
        !self.ship.alive
            || self.ship.invuln_timer > 0.0
            || self.ship.dash_active()
            || matches!(self.finisher.phase, FinisherPhase::Executing { .. })
    }

    pub fn add_screen_shake(&mut self, amount: f32) {
        self.screen_shake = (self.screen_shake + amount).min(self.tunables.effects.shake_max);
    }

    /// Read-only view for the drawing collaborator
    pub fn render_snapshot(&self) -> RenderSnapshot<'_> {
        RenderSnapshot {
            ship: &self.ship,
            asteroids: &self.asteroids,
            enemies: &self.enemies,
            bullets: &self.bullets,
            powerups: &self.powerups,
            texts: &self.texts,
            particles: &self.particles,
            combo: &self.combo,
            finisher: &self.finisher,
            screen_shake: self.screen_shake,
            level: self.level,
            lives: self.lives,
            score: self.progression.score,
            phase: self.phase,
        }
    }

    /// Flat progression counters for the persistence collaborator
    pub fn progression_snapshot(&self) -> ProgressionSnapshot {
        self.progression.snapshot()
    }
}

/// Borrowed view of everything a renderer needs for one frame
#[derive(Debug)]
pub struct RenderSnapshot<'a> {
    pub ship: &'a Ship,
    pub asteroids: &'a [Asteroid],
    pub enemies: &'a [Enemy],
    pub bullets: &'a [Bullet],
    pub powerups: &'a [PowerUp],
    pub texts: &'a [FloatingText],
    pub particles: &'a ParticlePool,
    pub combo: &'a ComboState,
    pub finisher: &'a FinisherState,
    pub screen_shake: f32,
    pub level: u32,
    pub lives: u32,
    pub score: u64,
    pub phase: GamePhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_monotonic() {
        let mut state = GameState::new(7, Tunables::default());
        let a = state.spawn_asteroid(Vec2::new(100.0, 100.0), Vec2::ZERO, 3, 0.0);
        let b = state.spawn_bullet(Vec2::ZERO, Vec2::ZERO, Owner::Player);
        let c = state.spawn_powerup(Vec2::ZERO, PowerUpKind::Shield);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_remove_by_id() {
        let mut state = GameState::new(7, Tunables::default());
        let a = state.spawn_asteroid(Vec2::new(100.0, 100.0), Vec2::ZERO, 2, 0.0);
        state.spawn_asteroid(Vec2::new(200.0, 200.0), Vec2::ZERO, 2, 0.0);
        state.remove(a);
        assert_eq!(state.asteroids.len(), 1);
        assert_ne!(state.asteroids[0].id, a);
    }

    #[test]
    fn test_normalize_order_sorts_by_id() {
        let mut state = GameState::new(7, Tunables::default());
        state.spawn_asteroid(Vec2::ZERO, Vec2::ZERO, 1, 0.0);
        state.spawn_asteroid(Vec2::ZERO, Vec2::ZERO, 1, 0.0);
        state.asteroids.swap(0, 1);
        state.normalize_order();
        assert!(state.asteroids[0].id < state.asteroids[1].id);
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let mut state = GameState::new(42, Tunables::default());
        state.spawn_asteroid(Vec2::new(50.0, 60.0), Vec2::new(1.0, 2.0), 3, 0.5);
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, 42);
        assert_eq!(back.asteroids.len(), 1);
        assert_eq!(back.asteroids[0].size, 3);
    }

    #[test]
    fn test_dash_grants_invulnerability() {
        let mut state = GameState::new(1, Tunables::default());
        assert!(!state.ship_invulnerable());
        state.ship.dash_timer = 0.1;
        assert!(state.ship_invulnerable());
    }
}
