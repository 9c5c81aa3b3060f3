//! Fixed-capacity particle pool
//!
//! All slots are allocated up front. Spawning is O(1): a free slot is claimed
//! when one exists, otherwise the oldest active slot is overwritten. Callers
//! only spawn batched bursts; no slot handles escape the pool.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ParticleTunables;

/// Particle behavior class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Explosion debris, drag-slowed
    Spark,
    /// Engine exhaust, short-lived
    Thruster,
    /// Muzzle flash, very short-lived
    MuzzleFlash,
    /// Crystal streak, accelerates toward the ship
    Streak,
    /// Afterimage left by a dash
    DashTrail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: ParticleKind,
    /// Remaining lifetime in seconds
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    pub color: [f32; 3],
}

impl Particle {
    fn inert() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            kind: ParticleKind::Spark,
            life: 0.0,
            max_life: 0.0,
            size: 0.0,
            color: [0.0; 3],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    particle: Particle,
    /// Bumped on every release and eviction; stale ring entries are skipped
    generation: u32,
    active: bool,
}

/// Pre-allocated particle store with oldest-slot eviction
///
/// `free` holds released slot indices; `claim_order` is a FIFO of
/// (slot, generation) claims so the oldest active slot is found in
/// amortized O(1) when the pool is full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticlePool {
    slots: Vec<Slot>,
    free: Vec<usize>,
    claim_order: VecDeque<(usize, u32)>,
    active_count: usize,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::with_capacity(ParticleTunables::default().capacity)
    }
}

impl ParticlePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![
                Slot {
                    particle: Particle::inert(),
                    generation: 0,
                    active: false,
                };
                capacity
            ],
            free: (0..capacity).rev().collect(),
            claim_order: VecDeque::with_capacity(capacity),
            active_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
            slot.generation = slot.generation.wrapping_add(1);
        }
        self.free = (0..self.slots.len()).rev().collect();
        self.claim_order.clear();
        self.active_count = 0;
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &Particle> {
        self.slots
            .iter()
            .filter(|s| s.active)
            .map(|s| &s.particle)
    }

    /// Claim a slot: free list first, else overwrite the oldest active slot
    fn claim(&mut self) -> Option<usize> {
        self.drop_stale_front();
        // Stale entries stranded behind a long-lived front claim are
        // compacted once the ring outgrows twice the slot count, keeping it
        // O(capacity) with amortized O(1) claims
        if self.claim_order.len() >= self.slots.len().saturating_mul(2).max(8) {
            let slots = &self.slots;
            self.claim_order
                .retain(|&(i, stamp)| slots[i].active && slots[i].generation == stamp);
        }

        if let Some(i) = self.free.pop() {
            let stamp = self.slots[i].generation;
            self.slots[i].active = true;
            self.claim_order.push_back((i, stamp));
            self.active_count += 1;
            return Some(i);
        }
        // Pool full: pop ring entries until one still names a live claim
        while let Some((i, stamp)) = self.claim_order.pop_front() {
            let slot = &mut self.slots[i];
            if slot.active && slot.generation == stamp {
                slot.generation = slot.generation.wrapping_add(1);
                let new_stamp = slot.generation;
                self.claim_order.push_back((i, new_stamp));
                return Some(i);
            }
        }
        None
    }

    /// Shed released claims from the ring front
    fn drop_stale_front(&mut self) {
        while let Some(&(i, stamp)) = self.claim_order.front() {
            let slot = &self.slots[i];
            if slot.active && slot.generation == stamp {
                break;
            }
            self.claim_order.pop_front();
        }
    }

    fn release(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(i);
        self.active_count -= 1;
    }

    /// Spawn a burst of `count` particles of `kind` at `pos`
    ///
    /// `base_vel` biases the burst direction (exhaust, debris inheritance).
    /// Invalid requests are logged and dropped; spawning never fails.
    pub fn spawn_burst<R: Rng>(
        &mut self,
        rng: &mut R,
        cfg: &ParticleTunables,
        kind: ParticleKind,
        pos: Vec2,
        base_vel: Vec2,
        count: u32,
    ) {
        if !pos.is_finite() || !base_vel.is_finite() {
            log::warn!("rejected particle burst with non-finite params: {kind:?}");
            return;
        }
        if count == 0 {
            return;
        }
        for _ in 0..count {
            let Some(i) = self.claim() else {
                return; // zero-capacity pool
            };
            let angle = rng.random_range(0.0..TAU);
            let dir = Vec2::new(angle.cos(), angle.sin());
            let p = &mut self.slots[i].particle;
            *p = match kind {
                ParticleKind::Spark => {
                    let life = cfg.base_life + rng.random_range(0.0..cfg.life_variance);
                    Particle {
                        pos,
                        vel: base_vel + dir * rng.random_range(30.0..180.0),
                        kind,
                        life,
                        max_life: life,
                        size: rng.random_range(1.5..3.5),
                        color: [1.0, rng.random_range(0.4..0.8), 0.1],
                    }
                }
                ParticleKind::Thruster => {
                    let life = rng.random_range(0.15..0.3);
                    Particle {
                        pos,
                        vel: base_vel + dir * rng.random_range(5.0..25.0),
                        kind,
                        life,
                        max_life: life,
                        size: rng.random_range(1.0..2.5),
                        color: [1.0, rng.random_range(0.3..0.6), 0.0],
                    }
                }
                ParticleKind::MuzzleFlash => {
                    let life = rng.random_range(0.05..0.12);
                    Particle {
                        pos,
                        vel: base_vel + dir * rng.random_range(10.0..60.0),
                        kind,
                        life,
                        max_life: life,
                        size: rng.random_range(1.0..2.0),
                        color: [1.0, 1.0, rng.random_range(0.5..0.9)],
                    }
                }
                ParticleKind::Streak => {
                    let life = cfg.base_life + rng.random_range(0.0..cfg.life_variance) + 0.3;
                    Particle {
                        pos,
                        vel: base_vel + dir * rng.random_range(20.0..80.0),
                        kind,
                        life,
                        max_life: life,
                        size: rng.random_range(1.0..2.0),
                        color: [0.3, rng.random_range(0.7..1.0), 1.0],
                    }
                }
                ParticleKind::DashTrail => {
                    let life = cfg.dash_trail_life;
                    Particle {
                        pos: pos + dir * rng.random_range(0.0..3.0),
                        vel: base_vel * 0.1,
                        kind,
                        life,
                        max_life: life,
                        size: rng.random_range(2.0..4.0),
                        color: [0.4, 0.6, 1.0],
                    }
                }
            };
        }
    }

    /// Advance all active particles; expired slots return to the free list
    ///
    /// `attract_to` is the ship position; streak particles beyond the minimum
    /// distance accelerate toward it.
    pub fn update(&mut self, dt: f32, cfg: &ParticleTunables, attract_to: Option<Vec2>) {
        let mut expired: Vec<usize> = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            let p = &mut slot.particle;
            p.life -= dt;
            if p.life <= 0.0 {
                expired.push(i);
                continue;
            }
            if p.kind == ParticleKind::Streak
                && let Some(target) = attract_to
            {
                let delta = target - p.pos;
                if delta.length() > cfg.streak_min_distance {
                    p.vel += delta.normalize_or_zero() * cfg.streak_attraction * dt;
                }
            }
            p.vel *= cfg.drag;
            p.pos += p.vel * dt;
        }
        for i in expired {
            self.release(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn cfg() -> ParticleTunables {
        ParticleTunables::default()
    }

    #[test]
    fn test_burst_spawns_requested_count() {
        let mut pool = ParticlePool::with_capacity(100);
        let mut rng = Pcg32::seed_from_u64(1);
        pool.spawn_burst(&mut rng, &cfg(), ParticleKind::Spark, Vec2::ZERO, Vec2::ZERO, 30);
        assert_eq!(pool.active_count(), 30);
    }

    #[test]
    fn test_overflow_evicts_oldest_never_exceeds_capacity() {
        // 5000 requests into a 1000-slot pool: exactly 1000 active, the
        // survivors being the 1000 most recent spawns.
        let mut pool = ParticlePool::with_capacity(1000);
        let mut rng = Pcg32::seed_from_u64(2);
        for burst in 0..50 {
            let kind = if burst < 40 {
                ParticleKind::Spark
            } else {
                ParticleKind::Streak
            };
            pool.spawn_burst(&mut rng, &cfg(), kind, Vec2::ZERO, Vec2::ZERO, 100);
        }
        assert_eq!(pool.active_count(), 1000);
        // The last 10 bursts (1000 particles) were all streaks
        assert!(pool.iter_active().all(|p| p.kind == ParticleKind::Streak));
    }

    #[test]
    fn test_expiry_returns_slots_to_free_list() {
        let mut pool = ParticlePool::with_capacity(50);
        let mut rng = Pcg32::seed_from_u64(3);
        pool.spawn_burst(&mut rng, &cfg(), ParticleKind::MuzzleFlash, Vec2::ZERO, Vec2::ZERO, 50);
        assert_eq!(pool.active_count(), 50);
        // Muzzle flashes live at most 0.12s
        for _ in 0..30 {
            pool.update(1.0 / 60.0, &cfg(), None);
        }
        assert_eq!(pool.active_count(), 0);
        pool.spawn_burst(&mut rng, &cfg(), ParticleKind::Spark, Vec2::ZERO, Vec2::ZERO, 10);
        assert_eq!(pool.active_count(), 10);
    }

    #[test]
    fn test_claim_ring_stays_bounded_under_spawn_expire_cycles() {
        // Repeated spawn/expire churn must not grow the claim ring; it stays
        // O(capacity) even though the pool itself never fills.
        let mut pool = ParticlePool::with_capacity(100);
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..2000 {
            pool.spawn_burst(
                &mut rng,
                &cfg(),
                ParticleKind::MuzzleFlash,
                Vec2::ZERO,
                Vec2::ZERO,
                10,
            );
            // Muzzle flashes live at most 0.12s
            for _ in 0..10 {
                pool.update(0.05, &cfg(), None);
            }
            assert!(pool.claim_order.len() <= pool.capacity() * 2);
        }
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_invalid_burst_is_dropped() {
        let mut pool = ParticlePool::with_capacity(10);
        let mut rng = Pcg32::seed_from_u64(4);
        pool.spawn_burst(
            &mut rng,
            &cfg(),
            ParticleKind::Spark,
            Vec2::new(f32::NAN, 0.0),
            Vec2::ZERO,
            5,
        );
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_streaks_pull_toward_target() {
        let mut pool = ParticlePool::with_capacity(10);
        let mut rng = Pcg32::seed_from_u64(5);
        pool.spawn_burst(&mut rng, &cfg(), ParticleKind::Streak, Vec2::ZERO, Vec2::ZERO, 1);
        let target = Vec2::new(400.0, 0.0);
        let before = pool.iter_active().next().unwrap().pos;
        for _ in 0..30 {
            pool.update(1.0 / 60.0, &cfg(), Some(target));
        }
        let after = pool.iter_active().next().unwrap().pos;
        assert!(target.distance(after) < target.distance(before));
    }

    #[test]
    fn test_clear_resets_pool() {
        let mut pool = ParticlePool::with_capacity(20);
        let mut rng = Pcg32::seed_from_u64(6);
        pool.spawn_burst(&mut rng, &cfg(), ParticleKind::Spark, Vec2::ZERO, Vec2::ZERO, 20);
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        pool.spawn_burst(&mut rng, &cfg(), ParticleKind::Spark, Vec2::ZERO, Vec2::ZERO, 20);
        assert_eq!(pool.active_count(), 20);
    }

    proptest! {
        #[test]
        fn prop_active_count_never_exceeds_capacity(
            ops in prop::collection::vec((0u32..200, 0u8..4), 1..40),
            capacity in 1usize..64,
        ) {
            let mut pool = ParticlePool::with_capacity(capacity);
            let mut rng = Pcg32::seed_from_u64(99);
            for (count, op) in ops {
                if op == 0 {
                    for _ in 0..4 {
                        pool.update(0.05, &cfg(), None);
                    }
                } else {
                    pool.spawn_burst(
                        &mut rng,
                        &cfg(),
                        ParticleKind::Spark,
                        Vec2::ZERO,
                        Vec2::ZERO,
                        count,
                    );
                }
                prop_assert!(pool.active_count() <= capacity);
                prop_assert_eq!(
                    pool.iter_active().count(),
                    pool.active_count()
                );
            }
        }
    }
}
