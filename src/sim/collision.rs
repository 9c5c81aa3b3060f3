//! Wrap-aware collision detection and per-pair resolution
//!
//! The field is a torus: the shortest distance between two points may cross
//! an edge, so all circle tests use the per-axis wrapped delta. Resolution
//! runs as one pass per tick; entities consumed by a pair are marked doomed
//! and skipped by later pairs in the same pass, then swept at the end.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use std::f32::consts::TAU;

use super::particles::ParticleKind;
use super::state::{EntityId, GamePhase, GameState, Owner, PowerUpKind};
use crate::events::GameEvent;

/// Shortest vector from `from` to `to` on the wrapped field
pub fn toroidal_delta(from: Vec2, to: Vec2, field: Vec2) -> Vec2 {
    let mut d = to - from;
    if d.x > field.x * 0.5 {
        d.x -= field.x;
    } else if d.x < -field.x * 0.5 {
        d.x += field.x;
    }
    if d.y > field.y * 0.5 {
        d.y -= field.y;
    } else if d.y < -field.y * 0.5 {
        d.y += field.y;
    }
    d
}

pub fn toroidal_distance_sq(a: Vec2, b: Vec2, field: Vec2) -> f32 {
    toroidal_delta(a, b, field).length_squared()
}

/// Circle overlap test using the shortest wrapped distance
pub fn circles_collide(a: Vec2, ra: f32, b: Vec2, rb: f32, field: Vec2) -> bool {
    let reach = ra + rb;
    toroidal_distance_sq(a, b, field) <= reach * reach
}

/// One collision pass: player bullets against asteroids and enemies, enemy
/// bullets and bodies against the ship, then powerup pickups. Runs after
/// physics and before visual effects.
pub fn resolve_collisions(state: &mut GameState, rng: &mut Pcg32) {
    bullets_vs_asteroids(state, rng);
    bullets_vs_enemies(state, rng);
    ship_vs_hazards(state, rng);
    ship_vs_powerups(state, rng);
    state.sweep_doomed();
}

fn bullets_vs_asteroids(state: &mut GameState, rng: &mut Pcg32) {
    let field = state.tunables.field;
    let bullet_radius = state.tunables.weapons.bullet_radius;
    let mut hits: Vec<(EntityId, EntityId)> = Vec::new();
    for bullet in state.bullets.iter().filter(|b| b.owner == Owner::Player) {
        for asteroid in &state.asteroids {
            if circles_collide(bullet.pos, bullet_radius, asteroid.pos, asteroid.radius, field) {
                hits.push((bullet.id, asteroid.id));
                break;
            }
        }
    }
    for (bullet_id, asteroid_id) in hits {
        // Someone else got it first this pass; the bullet flies on
        let Some(asteroid) = state
            .asteroids
            .iter()
            .find(|a| a.id == asteroid_id && !a.doomed)
        else {
            continue;
        };
        let (pos, vel, size) = (asteroid.pos, asteroid.vel, asteroid.size);
        if let Some(bullet) = state.bullets.iter_mut().find(|b| b.id == bullet_id) {
            bullet.doomed = true;
        }
        state.destroy_asteroid(rng, asteroid_id);
        if size > 1 {
            split_asteroid(state, rng, pos, vel, size);
        }
    }
}

/// Children inherit half the parent's drift plus a random kick
fn split_asteroid(state: &mut GameState, rng: &mut Pcg32, pos: Vec2, vel: Vec2, size: u8) {
    let cfg = state.tunables.asteroids.clone();
    let child_speed = cfg.base_speed * (1.0 + (3 - size.min(3)) as f32 * cfg.speed_size_adjustment);
    for _ in 0..cfg.split_count {
        let angle = rng.random_range(0.0..TAU);
        let dir = Vec2::new(angle.cos(), angle.sin());
        let spin = rng.random_range(-2.0..2.0);
        state.spawn_asteroid(pos, vel * 0.5 + dir * child_speed, size - 1, spin);
    }
}

fn bullets_vs_enemies(state: &mut GameState, rng: &mut Pcg32) {
    let field = state.tunables.field;
    let bullet_radius = state.tunables.weapons.bullet_radius;
    let mut hits: Vec<(EntityId, EntityId)> = Vec::new();
    for bullet in state.bullets.iter().filter(|b| b.owner == Owner::Player && !b.doomed) {
        for enemy in state.enemies.iter().filter(|e| !e.doomed) {
            if circles_collide(bullet.pos, bullet_radius, enemy.pos, enemy.radius, field) {
                hits.push((bullet.id, enemy.id));
                break;
            }
        }
    }
    for (bullet_id, enemy_id) in hits {
        let Some(enemy) = state.enemies.iter_mut().find(|e| e.id == enemy_id && !e.doomed) else {
            continue;
        };
        enemy.health -= 1;
        let dead = enemy.health <= 0;
        let pos = enemy.pos;
        if let Some(bullet) = state.bullets.iter_mut().find(|b| b.id == bullet_id) {
            bullet.doomed = true;
        }
        if dead {
            state.destroy_enemy(rng, enemy_id);
        } else {
            let pcfg = state.tunables.particles.clone();
            state.particles.spawn_burst(rng, &pcfg, ParticleKind::Spark, pos, Vec2::ZERO, 5);
        }
    }
}

/// Enemy bullets, asteroid bodies, and enemy bodies against the ship
fn ship_vs_hazards(state: &mut GameState, rng: &mut Pcg32) {
    if !state.ship.alive {
        return;
    }
    let field = state.tunables.field;
    let ship_pos = state.ship.pos;
    let ship_radius = state.ship.radius;
    let bullet_radius = state.tunables.weapons.bullet_radius;
    let margin = state.tunables.asteroids.collision_margin;

    let hit_by_bullet = state
        .bullets
        .iter()
        .find(|b| {
            matches!(b.owner, Owner::Enemy(_))
                && !b.doomed
                && circles_collide(b.pos, bullet_radius, ship_pos, ship_radius, field)
        })
        .map(|b| b.id);
    if let Some(id) = hit_by_bullet {
        if !state.ship_invulnerable()
            && let Some(bullet) = state.bullets.iter_mut().find(|b| b.id == id)
        {
            bullet.doomed = true;
        }
        damage_ship(state, rng);
        return;
    }

    let hit_asteroid = state.asteroids.iter().any(|a| {
        !a.doomed && circles_collide(a.pos, a.radius + margin, ship_pos, ship_radius, field)
    });
    if hit_asteroid {
        damage_ship(state, rng);
        return;
    }

    let hit_enemy = state
        .enemies
        .iter()
        .any(|e| !e.doomed && circles_collide(e.pos, e.radius, ship_pos, ship_radius, field));
    if hit_enemy {
        damage_ship(state, rng);
    }
}

/// Apply one hit to the ship, respecting invulnerability and the shield
fn damage_ship(state: &mut GameState, rng: &mut Pcg32) {
    if state.ship_invulnerable() {
        return;
    }
    if state.ship.shield {
        state.ship.shield = false;
        state.ship.invuln_timer = state.tunables.ship.invulnerability_time;
        state.push_event(GameEvent::ShieldBroken);
        state.add_screen_shake(5.0);
        return;
    }

    let pos = state.ship.pos;
    let pcfg = state.tunables.particles.clone();
    state
        .particles
        .spawn_burst(rng, &pcfg, ParticleKind::Spark, pos, Vec2::ZERO, pcfg.ship_explosion);
    state.push_event(GameEvent::ShipHit);
    state.push_event(GameEvent::ShipDestroyed);
    state.add_screen_shake(state.tunables.effects.shake_max);

    if state.combo.count > 0 {
        let broken = state.combo.count;
        state.combo.reset();
        state.push_event(GameEvent::ComboBroken { count: broken });
    }

    state.lives = state.lives.saturating_sub(1);
    state.ship.alive = false;
    state.ship.vel = Vec2::ZERO;
    state.ship.respawn_timer = state.tunables.ship.respawn_duration;
    if state.lives == 0 {
        state.phase = GamePhase::GameOver;
        state.push_event(GameEvent::GameOver);
        log::info!("game over at level {}", state.level);
    }
}

fn ship_vs_powerups(state: &mut GameState, rng: &mut Pcg32) {
    if !state.ship.alive {
        return;
    }
    let field = state.tunables.field;
    let ship_pos = state.ship.pos;
    let ship_radius = state.ship.radius;
    let pickup_radius = state.tunables.powerups.pickup_radius;

    let collected: Vec<(EntityId, PowerUpKind, Vec2)> = state
        .powerups
        .iter()
        .filter(|p| {
            !p.doomed && circles_collide(p.pos, pickup_radius, ship_pos, ship_radius, field)
        })
        .map(|p| (p.id, p.kind, p.pos))
        .collect();

    for (id, kind, pos) in collected {
        if let Some(p) = state.powerups.iter_mut().find(|p| p.id == id) {
            p.doomed = true;
        }
        apply_powerup(state, rng, kind, pos);
    }
}

fn apply_powerup(state: &mut GameState, rng: &mut Pcg32, kind: PowerUpKind, pos: Vec2) {
    let cfg = state.tunables.powerups.clone();
    let text_vel = Vec2::new(0.0, -state.tunables.effects.floating_text_speed);
    match kind {
        PowerUpKind::RapidFire => {
            state.ship.rapid_fire_timer = cfg.rapid_fire_duration;
            state.spawn_floating_text(pos, text_vel, "RAPID FIRE".into());
        }
        PowerUpKind::TripleShot => {
            state.ship.triple_shot_timer = cfg.triple_shot_duration;
            state.spawn_floating_text(pos, text_vel, "TRIPLE SHOT".into());
        }
        PowerUpKind::Shield => {
            state.ship.shield = true;
            state.spawn_floating_text(pos, text_vel, "SHIELD".into());
        }
        PowerUpKind::ExtraLife => {
            if state.lives < state.tunables.ship.max_lives {
                state.lives += 1;
                state.spawn_floating_text(pos, text_vel, "EXTRA LIFE".into());
            } else {
                state.spawn_floating_text(pos, text_vel, "MAX LIVES".into());
            }
        }
        PowerUpKind::Crystal => {
            let mut unlocked = Vec::new();
            state
                .progression
                .add_crystals(cfg.crystal_value as u64, &mut unlocked);
            for achievement in unlocked {
                state.push_event(GameEvent::AchievementUnlocked { achievement });
            }
            let pcfg = state.tunables.particles.clone();
            state
                .particles
                .spawn_burst(rng, &pcfg, ParticleKind::Streak, pos, Vec2::ZERO, 8);
            state.spawn_floating_text(pos, text_vel, format!("+{}", cfg.crystal_value));
        }
    }
    state.progression.add_score(cfg.pickup_score as u64);
    state.push_event(GameEvent::PowerUpCollected { kind });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tunables;
    use crate::sim::state::EnemyBrain;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn state() -> GameState {
        GameState::new(3, Tunables::default())
    }

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(0)
    }

    #[test]
    fn test_collision_across_wrap_seam() {
        // Bullet at x=1 and asteroid at x=W-1 are 2 apart through the seam,
        // not W-2 apart.
        let field = Vec2::new(800.0, 600.0);
        let a = Vec2::new(1.0, 300.0);
        let b = Vec2::new(799.0, 300.0);
        assert!((toroidal_delta(a, b, field).length() - 2.0).abs() < 1e-4);
        assert!(circles_collide(a, 2.0, b, 10.0, field));
    }

    #[test]
    fn test_bullet_destroys_small_asteroid() {
        let mut s = state();
        s.ship.pos = Vec2::new(700.0, 500.0); // keep the ship clear
        s.spawn_asteroid(Vec2::new(100.0, 100.0), Vec2::ZERO, 1, 0.0);
        s.spawn_bullet(Vec2::new(100.0, 100.0), Vec2::ZERO, Owner::Player);
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert!(s.asteroids.is_empty());
        assert!(s.bullets.is_empty());
        assert_eq!(s.combo.count, 1);
        assert!(s.progression.score > 0);
    }

    #[test]
    fn test_large_asteroid_splits_into_two_children() {
        let mut s = state();
        s.ship.pos = Vec2::new(700.0, 500.0);
        s.spawn_asteroid(Vec2::new(100.0, 100.0), Vec2::ZERO, 3, 0.0);
        s.spawn_bullet(Vec2::new(100.0, 100.0), Vec2::ZERO, Owner::Player);
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert_eq!(s.asteroids.len(), 2);
        assert!(s.asteroids.iter().all(|a| a.size == 2));
    }

    #[test]
    fn test_doomed_asteroid_not_processed_twice() {
        let mut s = state();
        s.ship.pos = Vec2::new(700.0, 500.0);
        s.spawn_asteroid(Vec2::new(100.0, 100.0), Vec2::ZERO, 1, 0.0);
        s.spawn_bullet(Vec2::new(100.0, 100.0), Vec2::ZERO, Owner::Player);
        s.spawn_bullet(Vec2::new(101.0, 100.0), Vec2::ZERO, Owner::Player);
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        // One bullet consumed the asteroid; the other flies on
        assert_eq!(s.bullets.len(), 1);
        assert_eq!(s.combo.count, 1);
    }

    #[test]
    fn test_enemy_takes_damage_then_dies() {
        let mut s = state();
        s.ship.pos = Vec2::new(700.0, 500.0);
        let id = s.spawn_enemy(Vec2::new(100.0, 100.0), EnemyBrain::Hunter, 1.0);
        let mut r = rng();
        for _ in 0..s.tunables.enemies.health {
            s.spawn_bullet(Vec2::new(100.0, 100.0), Vec2::ZERO, Owner::Player);
            resolve_collisions(&mut s, &mut r);
        }
        assert!(!s.enemies.iter().any(|e| e.id == id));
        assert_eq!(s.combo.count, 1);
    }

    #[test]
    fn test_invulnerable_ship_ignores_asteroid() {
        let mut s = state();
        s.ship.invuln_timer = 1.0;
        s.spawn_asteroid(s.ship.pos, Vec2::ZERO, 3, 0.0);
        let lives = s.lives;
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert_eq!(s.lives, lives);
        assert!(s.ship.alive);
    }

    #[test]
    fn test_shield_absorbs_one_hit() {
        let mut s = state();
        s.ship.invuln_timer = 0.0;
        s.ship.shield = true;
        s.spawn_asteroid(s.ship.pos, Vec2::ZERO, 3, 0.0);
        let lives = s.lives;
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert_eq!(s.lives, lives);
        assert!(!s.ship.shield);
        assert!(s.ship.invuln_timer > 0.0);
        assert!(s.events.contains(&GameEvent::ShieldBroken));
    }

    #[test]
    fn test_ship_hit_loses_life_and_breaks_combo() {
        let mut s = state();
        s.ship.invuln_timer = 0.0;
        s.combo.register_kill(&s.tunables.combo.clone());
        s.spawn_asteroid(s.ship.pos, Vec2::ZERO, 3, 0.0);
        let lives = s.lives;
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert_eq!(s.lives, lives - 1);
        assert!(!s.ship.alive);
        assert_eq!(s.combo.count, 0);
    }

    #[test]
    fn test_last_life_ends_game() {
        let mut s = state();
        s.ship.invuln_timer = 0.0;
        s.lives = 1;
        s.spawn_asteroid(s.ship.pos, Vec2::ZERO, 3, 0.0);
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert_eq!(s.phase, GamePhase::GameOver);
        assert!(s.events.contains(&GameEvent::GameOver));
    }

    #[test]
    fn test_powerup_pickup_applies_effect() {
        let mut s = state();
        s.spawn_powerup(s.ship.pos, PowerUpKind::RapidFire);
        s.spawn_powerup(s.ship.pos, PowerUpKind::Crystal);
        let mut r = rng();
        resolve_collisions(&mut s, &mut r);
        assert!(s.powerups.is_empty());
        assert!(s.ship.rapid_fire_timer > 0.0);
        assert_eq!(
            s.progression.crystals,
            s.tunables.powerups.crystal_value as u64
        );
    }

    proptest! {
        /// The per-axis wrapped delta matches the brute-force minimum over
        /// all nine wrap translations of the target point.
        #[test]
        fn prop_toroidal_distance_is_min_over_nine_images(
            ax in 0.0f32..800.0, ay in 0.0f32..600.0,
            bx in 0.0f32..800.0, by in 0.0f32..600.0,
        ) {
            let field = Vec2::new(800.0, 600.0);
            let a = Vec2::new(ax, ay);
            let b = Vec2::new(bx, by);
            let fast = toroidal_delta(a, b, field).length();
            let mut brute = f32::MAX;
            for ix in -1..=1 {
                for iy in -1..=1 {
                    let image = b + Vec2::new(ix as f32 * field.x, iy as f32 * field.y);
                    brute = brute.min(a.distance(image));
                }
            }
            prop_assert!((fast - brute).abs() < 1e-3);
        }
    }
}
