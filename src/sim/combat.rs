//! Combo streak and finisher state machine
//!
//! Kills extend a combo streak while its decay window is open; the streak
//! feeds a finisher meter. A ready finisher is triggered by the dash input
//! when a target lies along the ship's heading: lock-on in slow motion, a
//! dash to the target, a shockwave impact, then recovery. Exactly one
//! finisher can be in flight, and execution always runs to completion.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::toroidal_delta;
use super::particles::ParticleKind;
use super::state::{EntityId, GameState, PowerUpKind};
use crate::config::{ComboRetention, ComboTunables, FinisherTunables};
use crate::events::GameEvent;
use crate::wrap_point;

/// Kill streak state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboState {
    pub count: u32,
    /// Score multiplier, 1.0 baseline
    pub multiplier: f32,
    /// Remaining decay window; the streak breaks when it reaches zero
    pub timer: f32,
}

impl Default for ComboState {
    fn default() -> Self {
        Self {
            count: 0,
            multiplier: 1.0,
            timer: 0.0,
        }
    }
}

impl ComboState {
    /// Extend the streak; returns the new kill count
    pub fn register_kill(&mut self, cfg: &ComboTunables) -> u32 {
        self.count += 1;
        self.multiplier = 1.0 + self.count as f32 * cfg.multiplier_per_kill;
        self.timer = cfg.decay_window;
        self.count
    }

    /// Advance the decay window; returns the broken streak's kill count
    pub fn update(&mut self, dt: f32) -> Option<u32> {
        if self.count == 0 {
            return None;
        }
        self.timer -= dt;
        if self.timer > 0.0 {
            return None;
        }
        let broken = self.count;
        self.reset();
        Some(broken)
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.multiplier = 1.0;
        self.timer = 0.0;
    }
}

/// Sub-stage of a finisher execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecStage {
    /// Dash toward the locked target
    Approach,
    /// Shockwave expands; heavy slow motion
    Impact,
    /// Shockwave fades, time scale restored
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FinisherPhase {
    /// Meter empty
    Idle,
    /// Meter filling
    Charging,
    /// Meter full, waiting for the trigger
    Ready,
    /// Target acquired, world slowed; the only cancellable phase
    Locking { timer: f32, target: EntityId },
    /// Modal execution; always runs to completion
    Executing { stage: ExecStage, timer: f32, target_pos: Vec2 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinisherState {
    /// 0 to meter_max
    pub meter: f32,
    pub phase: FinisherPhase,
}

impl Default for FinisherState {
    fn default() -> Self {
        Self {
            meter: 0.0,
            phase: FinisherPhase::Idle,
        }
    }
}

impl FinisherState {
    pub fn is_executing(&self) -> bool {
        matches!(
            self.phase,
            FinisherPhase::Locking { .. } | FinisherPhase::Executing { .. }
        )
    }

    /// Meter gain for a kill at the given combo level; returns true when the
    /// meter just reached the ready threshold
    pub fn add_meter(&mut self, combo_count: u32, cfg: &ComboTunables) -> bool {
        if self.is_executing() {
            return false;
        }
        let fill = if combo_count >= cfg.high_threshold {
            cfg.fill_high
        } else if combo_count >= cfg.medium_threshold {
            cfg.fill_medium
        } else {
            cfg.fill_base
        };
        self.meter = (self.meter + fill).min(cfg.meter_max);
        if self.meter >= cfg.meter_max {
            let was_ready = self.phase == FinisherPhase::Ready;
            self.phase = FinisherPhase::Ready;
            !was_ready
        } else {
            self.phase = FinisherPhase::Charging;
            false
        }
    }

    /// Meter drain while no streak is active
    pub fn decay(&mut self, dt: f32, cfg: &ComboTunables) {
        if self.is_executing() {
            return;
        }
        self.meter = (self.meter - cfg.meter_decay * dt).max(0.0);
        self.phase = if self.meter >= cfg.meter_max {
            FinisherPhase::Ready
        } else if self.meter > 0.0 {
            FinisherPhase::Charging
        } else {
            FinisherPhase::Idle
        };
    }

    /// Global time-scale multiplier for the current phase
    pub fn time_scale(&self, cfg: &FinisherTunables) -> f32 {
        match self.phase {
            FinisherPhase::Locking { .. } => cfg.lock_on_time_scale,
            FinisherPhase::Executing { stage, .. } => match stage {
                ExecStage::Approach => cfg.lock_on_time_scale,
                ExecStage::Impact => cfg.impact_time_scale,
                ExecStage::Recovery => 1.0,
            },
            _ => 1.0,
        }
    }
}

impl GameState {
    /// Central kill bookkeeping: streak, meter, score, floating text, events
    pub fn register_kill<R: Rng>(&mut self, rng: &mut R, pos: Vec2, base_score: u32) {
        let count = self.combo.register_kill(&self.tunables.combo);
        self.push_event(GameEvent::ComboIncrement { count });
        if self.tunables.combo.milestones.contains(&count) {
            self.push_event(GameEvent::ComboMilestone { count });
            let vel = Vec2::new(0.0, -self.tunables.effects.floating_text_speed);
            self.spawn_floating_text(pos, vel, format!("{count} HIT COMBO"));
        }
        if self.finisher.add_meter(count, &self.tunables.combo) {
            self.push_event(GameEvent::FinisherReady);
        }

        let points = (base_score as f32 * self.combo.multiplier).round() as u64;
        self.progression.add_score(points);
        let spread = self.tunables.effects.floating_text_spread;
        let vel = Vec2::new(
            rng.random_range(-spread..spread),
            -self.tunables.effects.floating_text_speed,
        );
        self.spawn_floating_text(pos, vel, format!("+{points}"));

        let mut unlocked = Vec::new();
        self.progression.record_kill(count, &mut unlocked);
        for achievement in unlocked {
            self.push_event(GameEvent::AchievementUnlocked { achievement });
        }
    }

    /// Advance streak decay and idle meter drain
    pub fn update_combat(&mut self, dt: f32) {
        if let Some(broken) = self.combo.update(dt) {
            self.push_event(GameEvent::ComboBroken { count: broken });
        }
        if self.combo.count == 0 {
            self.finisher.decay(dt, &self.tunables.combo);
        }
    }

    /// Dash input while the meter is ready: lock onto a target in the dash
    /// lane. No target leaves the meter untouched and the phase at Ready, so
    /// the attempt is free and repeatable.
    pub fn try_trigger_finisher(&mut self) -> bool {
        if self.finisher.phase != FinisherPhase::Ready || !self.ship.alive {
            return false;
        }
        let Some(target) = self.find_finisher_target() else {
            return false;
        };
        self.finisher.phase = FinisherPhase::Locking {
            timer: self.tunables.finisher.lock_on_time,
            target,
        };
        self.push_event(GameEvent::FinisherLockOn);
        log::info!("finisher lock-on: target {target}");
        true
    }

    /// Nearest enemy whose circle intersects the dash segment along the
    /// ship's heading, using wrapped deltas
    fn find_finisher_target(&self) -> Option<EntityId> {
        let dir = crate::heading_vec(self.ship.heading);
        let range = self.tunables.ship.max_speed
            * self.tunables.dash.speed_multiplier
            * self.tunables.dash.duration;
        let field = self.tunables.field;
        let mut best: Option<(f32, EntityId)> = None;
        for enemy in &self.enemies {
            let delta = toroidal_delta(self.ship.pos, enemy.pos, field);
            let t = delta.dot(dir).clamp(0.0, range);
            let closest = dir * t;
            let reach = enemy.radius + self.ship.radius;
            if (delta - closest).length_squared() <= reach * reach
                && best.is_none_or(|(bt, _)| t < bt)
            {
                best = Some((t, enemy.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Advance the lock-on/execution phases. Runs on unscaled time so slow
    /// motion stretches the world, not the finisher itself.
    pub fn update_finisher<R: Rng>(&mut self, rng: &mut R, dt: f32) {
        let cfg = self.tunables.finisher.clone();
        match self.finisher.phase {
            FinisherPhase::Locking { timer, target } => {
                let Some(enemy) = self.enemies.iter().find(|e| e.id == target) else {
                    // Target died during lock-on: the one legal abort
                    self.finisher.phase = FinisherPhase::Ready;
                    log::info!("finisher aborted: target {target} gone");
                    return;
                };
                let target_pos = enemy.pos;
                let timer = timer - dt;
                if timer > 0.0 {
                    self.finisher.phase = FinisherPhase::Locking { timer, target };
                } else {
                    let delta = toroidal_delta(self.ship.pos, target_pos, self.tunables.field);
                    self.ship.vel = delta / cfg.approach_time.max(1e-3);
                    self.finisher.phase = FinisherPhase::Executing {
                        stage: ExecStage::Approach,
                        timer: cfg.approach_time,
                        target_pos,
                    };
                }
            }
            FinisherPhase::Executing { stage, timer, target_pos } => {
                let timer = timer - dt;
                if timer > 0.0 {
                    self.finisher.phase = FinisherPhase::Executing { stage, timer, target_pos };
                    return;
                }
                match stage {
                    ExecStage::Approach => {
                        self.ship.pos = wrap_point(target_pos, self.tunables.field);
                        self.ship.vel = Vec2::ZERO;
                        self.apply_shockwave(rng);
                        self.push_event(GameEvent::FinisherImpact { pos: self.ship.pos });
                        self.add_screen_shake(self.tunables.effects.shake_max);
                        let pos = self.ship.pos;
                        let count = cfg.particle_count;
                        let pcfg = self.tunables.particles.clone();
                        self.particles.spawn_burst(
                            rng,
                            &pcfg,
                            ParticleKind::Spark,
                            pos,
                            Vec2::ZERO,
                            count,
                        );
                        self.finisher.phase = FinisherPhase::Executing {
                            stage: ExecStage::Impact,
                            timer: cfg.impact_time,
                            target_pos,
                        };
                    }
                    ExecStage::Impact => {
                        self.finisher.phase = FinisherPhase::Executing {
                            stage: ExecStage::Recovery,
                            timer: cfg.recovery_time,
                            target_pos,
                        };
                    }
                    ExecStage::Recovery => {
                        self.complete_finisher();
                    }
                }
            }
            _ => {}
        }
    }

    fn complete_finisher(&mut self) {
        let cfg = &self.tunables.finisher;
        self.finisher.meter = 0.0;
        self.finisher.phase = FinisherPhase::Idle;
        self.ship.invuln_timer = self.ship.invuln_timer.max(cfg.invuln_buffer);
        self.progression.add_score(cfg.score as u64);
        match cfg.combo_retention {
            ComboRetention::Keep => {
                if self.combo.count > 0 {
                    self.combo.timer = self.tunables.combo.decay_window;
                }
            }
            ComboRetention::Halve => {
                self.combo.count /= 2;
                if self.combo.count == 0 {
                    self.combo.reset();
                } else {
                    self.combo.multiplier =
                        1.0 + self.combo.count as f32 * self.tunables.combo.multiplier_per_kill;
                    self.combo.timer = self.tunables.combo.decay_window;
                }
            }
            ComboRetention::Reset => self.combo.reset(),
        }
        let mut unlocked = Vec::new();
        self.progression.record_finisher(&mut unlocked);
        for achievement in unlocked {
            self.push_event(GameEvent::AchievementUnlocked { achievement });
        }
        log::info!("finisher complete");
    }

    /// Area damage around the ship: close targets take the heavy tier, the
    /// rest of the blast radius the light tier, everything gets knocked back
    fn apply_shockwave<R: Rng>(&mut self, rng: &mut R) {
        let cfg = self.tunables.finisher.clone();
        let field = self.tunables.field;
        let center = self.ship.pos;
        let close_range = cfg.shockwave_radius * cfg.close_range_fraction;

        let mut killed_enemies: Vec<EntityId> = Vec::new();
        for enemy in &mut self.enemies {
            let delta = toroidal_delta(center, enemy.pos, field);
            let dist = delta.length();
            if dist > cfg.shockwave_radius {
                continue;
            }
            let damage = if dist <= close_range {
                cfg.damage_close
            } else {
                cfg.damage_far
            };
            enemy.health -= damage;
            enemy.vel += delta.normalize_or_zero() * cfg.knockback;
            if enemy.health <= 0 {
                killed_enemies.push(enemy.id);
            }
        }
        for id in killed_enemies {
            self.destroy_enemy(rng, id);
        }

        // Shockwaves evaporate asteroids outright, no splitting
        let mut killed_asteroids: Vec<EntityId> = Vec::new();
        for asteroid in &mut self.asteroids {
            let delta = toroidal_delta(center, asteroid.pos, field);
            let dist = delta.length();
            if dist > cfg.shockwave_radius {
                continue;
            }
            let damage = if dist <= close_range {
                cfg.damage_close
            } else {
                cfg.damage_far
            };
            if damage >= asteroid.size as i32 {
                killed_asteroids.push(asteroid.id);
            } else {
                asteroid.vel += delta.normalize_or_zero() * cfg.knockback;
            }
        }
        for id in killed_asteroids {
            self.destroy_asteroid(rng, id);
        }
    }

    /// Destroy an asteroid: explosion, score, streak, drops. Splitting is
    /// the bullet policy's concern, not this function's.
    pub fn destroy_asteroid<R: Rng>(&mut self, rng: &mut R, id: EntityId) {
        let Some(asteroid) = self.asteroids.iter_mut().find(|a| a.id == id && !a.doomed) else {
            return;
        };
        asteroid.doomed = true;
        let pos = asteroid.pos;
        let size = asteroid.size;
        let acfg = self.tunables.asteroids.clone();
        let pcfg = self.tunables.particles.clone();

        let (event, burst) = match size {
            3 => (GameEvent::ExplosionLarge { pos }, pcfg.explosion_large),
            2 => (GameEvent::ExplosionMedium { pos }, pcfg.explosion_medium),
            _ => (GameEvent::ExplosionSmall { pos }, pcfg.explosion_small),
        };
        self.push_event(event);
        self.particles.spawn_burst(rng, &pcfg, ParticleKind::Spark, pos, Vec2::ZERO, burst);

        let base_score = acfg.scores[(size.clamp(1, 3) - 1) as usize];
        self.register_kill(rng, pos, base_score);

        if rng.random_bool(acfg.crystal_chance as f64) {
            self.spawn_powerup(pos, PowerUpKind::Crystal);
        } else if rng.random_bool(self.tunables.powerups.drop_chance as f64) {
            let kind = self.roll_powerup_kind(rng);
            self.spawn_powerup(pos, kind);
        }
    }

    /// Destroy an enemy: explosion, score, streak, crystal drops
    pub fn destroy_enemy<R: Rng>(&mut self, rng: &mut R, id: EntityId) {
        let Some(enemy) = self.enemies.iter_mut().find(|e| e.id == id && !e.doomed) else {
            return;
        };
        enemy.doomed = true;
        let pos = enemy.pos;
        let is_boss = enemy.brain == super::state::EnemyBrain::Boss;
        let ecfg = self.tunables.enemies.clone();
        let pcfg = self.tunables.particles.clone();

        self.push_event(GameEvent::ExplosionLarge { pos });
        self.particles.spawn_burst(
            rng,
            &pcfg,
            ParticleKind::Spark,
            pos,
            Vec2::ZERO,
            pcfg.explosion_large,
        );

        if is_boss {
            self.register_kill(rng, pos, ecfg.boss_score);
            for _ in 0..ecfg.boss_crystal_drops {
                let jitter = Vec2::new(rng.random_range(-30.0..30.0), rng.random_range(-30.0..30.0));
                let drop_pos = wrap_point(pos + jitter, self.tunables.field);
                self.spawn_powerup(drop_pos, PowerUpKind::Crystal);
            }
            let mut unlocked = Vec::new();
            self.progression.record_boss_kill(&mut unlocked);
            for achievement in unlocked {
                self.push_event(GameEvent::AchievementUnlocked { achievement });
            }
        } else {
            self.register_kill(rng, pos, ecfg.score);
            if rng.random_bool(ecfg.crystal_drop_chance as f64) {
                self.spawn_powerup(pos, PowerUpKind::Crystal);
            }
        }
    }

    fn roll_powerup_kind<R: Rng>(&self, rng: &mut R) -> PowerUpKind {
        if rng.random_bool(self.tunables.powerups.crystal_chance as f64) {
            return PowerUpKind::Crystal;
        }
        match rng.random_range(0..4) {
            0 => PowerUpKind::RapidFire,
            1 => PowerUpKind::TripleShot,
            2 => PowerUpKind::Shield,
            _ => PowerUpKind::ExtraLife,
        }
    }
}
