//! Session tunables
//!
//! Supplied once at session start and treated as constants thereafter.
//! All speeds are units/second, accelerations units/second², timers seconds,
//! evaluated against the fixed simulation timestep.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// What happens to the combo multiplier when a finisher completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ComboRetention {
    /// Keep the streak and refresh its decay window
    #[default]
    Keep,
    /// Halve the kill count (rounding down)
    Halve,
    /// Reset to baseline
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipTunables {
    pub max_speed: f32,
    pub turn_speed: f32,
    pub thrust: f32,
    pub reverse_thrust_factor: f32,
    /// Per-tick velocity retention factor
    pub friction: f32,
    pub radius: f32,
    pub max_lives: u32,
    pub starting_lives: u32,
    /// Post-hit grace period
    pub invulnerability_time: f32,
    pub respawn_duration: f32,
}

impl Default for ShipTunables {
    fn default() -> Self {
        Self {
            max_speed: 384.0,
            turn_speed: 2.0 * std::f32::consts::PI,
            thrust: 1800.0,
            reverse_thrust_factor: 0.4,
            friction: 0.985,
            radius: 10.0,
            max_lives: 5,
            starting_lives: 3,
            invulnerability_time: 2.0,
            respawn_duration: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponTunables {
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    pub bullet_lifetime: f32,
    pub fire_cooldown: f32,
    pub rapid_fire_cooldown: f32,
    /// Angular offset of the side bullets in a triple shot (radians)
    pub triple_shot_spread: f32,
    /// Muzzle offset from ship center
    pub muzzle_offset: f32,
    pub enemy_bullet_speed_factor: f32,
}

impl Default for WeaponTunables {
    fn default() -> Self {
        Self {
            bullet_speed: 720.0,
            bullet_radius: 2.0,
            bullet_lifetime: 0.83,
            fire_cooldown: 0.167,
            rapid_fire_cooldown: 0.083,
            triple_shot_spread: 10.0_f32.to_radians(),
            muzzle_offset: 15.0,
            enemy_bullet_speed_factor: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsteroidTunables {
    pub base_speed: f32,
    pub speed_multiplier: f32,
    /// Speed reduction per size tier
    pub speed_size_adjustment: f32,
    /// Radius per size tier
    pub radius_per_size: f32,
    /// Extra reach added to asteroid radius in collision tests
    pub collision_margin: f32,
    /// Score for size tiers 1..=3
    pub scores: [u32; 3],
    pub crystal_chance: f32,
    pub split_count: u32,
    /// Field population: base + per_level, clamped at max
    pub base_count: u32,
    pub per_level: u32,
    pub max_count: u32,
    pub spawn_margin: f32,
}

impl Default for AsteroidTunables {
    fn default() -> Self {
        Self {
            base_speed: 120.0,
            speed_multiplier: 1.5,
            speed_size_adjustment: 0.2,
            radius_per_size: 10.0,
            collision_margin: 12.0,
            scores: [20, 50, 100],
            crystal_chance: 0.2,
            split_count: 2,
            base_count: 3,
            per_level: 1,
            max_count: 12,
            spawn_margin: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTunables {
    pub speed: f32,
    pub radius: f32,
    pub health: i32,
    pub score: u32,
    pub max_count: usize,
    /// Chance of a spawn per asteroid destroyed
    pub spawn_chance: f32,
    pub min_spawn_distance: f32,
    pub spawn_margin: f32,
    pub fire_interval: f32,
    pub fire_interval_variance: f32,
    pub min_fire_distance: f32,
    pub max_fire_distance: f32,
    pub aim_inaccuracy: f32,
    pub friction: f32,
    pub speed_limit_factor: f32,
    /// Hunter keeps at least this distance before backing off
    pub preferred_distance: f32,
    pub hunter_approach_rate: f32,
    pub hunter_retreat_rate: f32,
    pub circler_orbit_speed: f32,
    pub circler_orbit_radius: f32,
    pub circler_approach_rate: f32,
    pub crystal_drop_chance: f32,
    // Boss variant
    pub boss_health: i32,
    pub boss_speed_factor: f32,
    pub boss_radius: f32,
    pub boss_score: u32,
    pub boss_crystal_drops: u32,
    /// A boss spawns every N levels
    pub boss_level_interval: u32,
}

impl Default for EnemyTunables {
    fn default() -> Self {
        Self {
            speed: 90.0,
            radius: 12.0,
            health: 3,
            score: 200,
            max_count: 2,
            spawn_chance: 0.1,
            min_spawn_distance: 200.0,
            spawn_margin: 50.0,
            fire_interval: 1.5,
            fire_interval_variance: 0.17,
            min_fire_distance: 50.0,
            max_fire_distance: 250.0,
            aim_inaccuracy: 5.0_f32.to_radians(),
            friction: 0.96,
            speed_limit_factor: 0.75,
            preferred_distance: 100.0,
            hunter_approach_rate: 3.0,
            hunter_retreat_rate: 6.0,
            circler_orbit_speed: 1.57,
            circler_orbit_radius: 180.0,
            circler_approach_rate: 4.8,
            crystal_drop_chance: 0.5,
            boss_health: 50,
            boss_speed_factor: 0.5,
            boss_radius: 36.0,
            boss_score: 1000,
            boss_crystal_drops: 5,
            boss_level_interval: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashTunables {
    pub cooldown: f32,
    pub duration: f32,
    /// Dash speed as a multiple of ship max speed
    pub speed_multiplier: f32,
}

impl Default for DashTunables {
    fn default() -> Self {
        Self {
            cooldown: 2.0,
            duration: 0.25,
            speed_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboTunables {
    /// Decay window refreshed by every kill
    pub decay_window: f32,
    /// Multiplier gained per kill in a streak
    pub multiplier_per_kill: f32,
    /// Meter threshold that arms the finisher
    pub meter_max: f32,
    /// Meter gain per kill at low/medium/high combo
    pub fill_base: f32,
    pub fill_medium: f32,
    pub fill_high: f32,
    pub medium_threshold: u32,
    pub high_threshold: u32,
    /// Meter drain per second while no streak is active
    pub meter_decay: f32,
    /// Kill counts that emit milestone events
    pub milestones: [u32; 4],
}

impl Default for ComboTunables {
    fn default() -> Self {
        Self {
            decay_window: 3.0,
            multiplier_per_kill: 0.1,
            meter_max: 100.0,
            fill_base: 10.0,
            fill_medium: 15.0,
            fill_high: 20.0,
            medium_threshold: 5,
            high_threshold: 10,
            meter_decay: 2.0,
            milestones: [5, 10, 15, 20],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinisherTunables {
    pub lock_on_time: f32,
    pub approach_time: f32,
    pub impact_time: f32,
    pub recovery_time: f32,
    /// Time scale during lock-on
    pub lock_on_time_scale: f32,
    /// Time scale during impact
    pub impact_time_scale: f32,
    pub shockwave_radius: f32,
    /// Fraction of the shockwave radius that deals close-range damage
    pub close_range_fraction: f32,
    pub damage_close: i32,
    pub damage_far: i32,
    pub knockback: f32,
    pub score: u32,
    pub particle_count: u32,
    /// Extra invulnerability granted past the end of execution
    pub invuln_buffer: f32,
    pub combo_retention: ComboRetention,
}

impl Default for FinisherTunables {
    fn default() -> Self {
        Self {
            lock_on_time: 0.5,
            approach_time: 0.1,
            impact_time: 1.0,
            recovery_time: 0.5,
            lock_on_time_scale: 0.5,
            impact_time_scale: 0.1,
            shockwave_radius: 200.0,
            close_range_fraction: 0.5,
            damage_close: 3,
            damage_far: 2,
            knockback: 900.0,
            score: 500,
            particle_count: 100,
            invuln_buffer: 0.5,
            combo_retention: ComboRetention::Keep,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUpTunables {
    pub drop_chance: f32,
    pub crystal_chance: f32,
    pub lifetime: f32,
    pub pickup_radius: f32,
    pub visual_radius: f32,
    pub rapid_fire_duration: f32,
    pub triple_shot_duration: f32,
    pub shield_duration: f32,
    pub crystal_value: u32,
    pub pickup_score: u32,
}

impl Default for PowerUpTunables {
    fn default() -> Self {
        Self {
            drop_chance: 0.2,
            crystal_chance: 0.3,
            lifetime: 10.0,
            pickup_radius: 15.0,
            visual_radius: 20.0,
            rapid_fire_duration: 10.0,
            triple_shot_duration: 10.0,
            shield_duration: 5.0,
            crystal_value: 10,
            pickup_score: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleTunables {
    /// Pool capacity; active particles never exceed this
    pub capacity: usize,
    pub base_life: f32,
    pub life_variance: f32,
    /// Per-tick velocity retention factor
    pub drag: f32,
    pub explosion_small: u32,
    pub explosion_medium: u32,
    pub explosion_large: u32,
    pub ship_explosion: u32,
    pub thruster_count: u32,
    pub muzzle_flash_base: u32,
    pub muzzle_flash_triple: u32,
    /// Streak particles accelerate toward the ship beyond this distance
    pub streak_min_distance: f32,
    pub streak_attraction: f32,
    pub dash_trail_count: u32,
    pub dash_trail_life: f32,
}

impl Default for ParticleTunables {
    fn default() -> Self {
        Self {
            capacity: 1000,
            base_life: 0.5,
            life_variance: 0.33,
            drag: 0.95,
            explosion_small: 15,
            explosion_medium: 20,
            explosion_large: 30,
            ship_explosion: 50,
            thruster_count: 2,
            muzzle_flash_base: 3,
            muzzle_flash_triple: 5,
            streak_min_distance: 10.0,
            streak_attraction: 540.0,
            dash_trail_count: 3,
            dash_trail_life: 0.33,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectTunables {
    /// Screen shake units shed per second
    pub shake_decay: f32,
    pub shake_max: f32,
    pub floating_text_life: f32,
    pub floating_text_speed: f32,
    /// Per-tick velocity retention for floating text
    pub floating_text_friction: f32,
    pub floating_text_spread: f32,
    pub level_transition_duration: f32,
}

impl Default for EffectTunables {
    fn default() -> Self {
        Self {
            shake_decay: 60.0,
            shake_max: 20.0,
            floating_text_life: 1.0,
            floating_text_speed: 120.0,
            floating_text_friction: 0.95,
            floating_text_spread: 10.0,
            level_transition_duration: 2.0,
        }
    }
}

/// All session tunables
///
/// The simulation never mutates these after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tunables {
    pub field: Vec2,
    pub ship: ShipTunables,
    pub weapons: WeaponTunables,
    pub asteroids: AsteroidTunables,
    pub enemies: EnemyTunables,
    pub dash: DashTunables,
    pub combo: ComboTunables,
    pub finisher: FinisherTunables,
    pub powerups: PowerUpTunables,
    pub particles: ParticleTunables,
    pub effects: EffectTunables,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            field: Vec2::new(800.0, 600.0),
            ship: ShipTunables::default(),
            weapons: WeaponTunables::default(),
            asteroids: AsteroidTunables::default(),
            enemies: EnemyTunables::default(),
            dash: DashTunables::default(),
            combo: ComboTunables::default(),
            finisher: FinisherTunables::default(),
            powerups: PowerUpTunables::default(),
            particles: ParticleTunables::default(),
            effects: EffectTunables::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_json() {
        let t = Tunables::default();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tunables = serde_json::from_str(&json).unwrap();
        assert_eq!(back.field, t.field);
        assert_eq!(back.particles.capacity, t.particles.capacity);
        assert_eq!(back.finisher.combo_retention, ComboRetention::Keep);
    }
}
