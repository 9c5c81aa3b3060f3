//! Progression counters and save snapshots
//!
//! Tracks score, crystal currency, and achievement flags across a session.
//! `snapshot()` produces the flat struct handed to whatever persistence layer
//! the host wires up at save points (level transition, game over).

use serde::{Deserialize, Serialize};

/// Unlockable achievement flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Achievement {
    /// First enemy or asteroid destroyed
    FirstBlood,
    /// Reached a 5-kill combo
    ComboNovice,
    /// Reached a 10-kill combo
    ComboMaster,
    /// Completed a finisher
    Showstopper,
    /// Destroyed a boss
    BossSlayer,
    /// Collected 1000 lifetime crystals
    CrystalHoarder,
    /// Reached level 10
    Survivor,
}

const CRYSTAL_HOARDER_THRESHOLD: u64 = 1000;
const SURVIVOR_LEVEL: u32 = 10;

/// Session-scoped progression state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Progression {
    pub score: u64,
    pub high_score: u64,
    pub crystals: u64,
    pub lifetime_crystals: u64,
    pub total_kills: u64,
    pub boss_kills: u64,
    pub finishers_performed: u64,
    pub best_combo: u32,
    pub highest_level: u32,
    unlocked: Vec<Achievement>,
}

impl Progression {
    pub fn is_unlocked(&self, a: Achievement) -> bool {
        self.unlocked.contains(&a)
    }

    /// Unlock once; returns true the first time only
    fn unlock(&mut self, a: Achievement) -> bool {
        if self.unlocked.contains(&a) {
            return false;
        }
        log::info!("achievement unlocked: {a:?}");
        self.unlocked.push(a);
        true
    }

    pub fn add_score(&mut self, points: u64) {
        self.score += points;
        self.high_score = self.high_score.max(self.score);
    }

    /// Record a kill; appends any newly unlocked achievements
    pub fn record_kill(&mut self, combo_count: u32, unlocked: &mut Vec<Achievement>) {
        self.total_kills += 1;
        self.best_combo = self.best_combo.max(combo_count);
        if self.total_kills == 1 && self.unlock(Achievement::FirstBlood) {
            unlocked.push(Achievement::FirstBlood);
        }
        if combo_count >= 5 && self.unlock(Achievement::ComboNovice) {
            unlocked.push(Achievement::ComboNovice);
        }
        if combo_count >= 10 && self.unlock(Achievement::ComboMaster) {
            unlocked.push(Achievement::ComboMaster);
        }
    }

    pub fn record_boss_kill(&mut self, unlocked: &mut Vec<Achievement>) {
        self.boss_kills += 1;
        if self.unlock(Achievement::BossSlayer) {
            unlocked.push(Achievement::BossSlayer);
        }
    }

    pub fn record_finisher(&mut self, unlocked: &mut Vec<Achievement>) {
        self.finishers_performed += 1;
        if self.unlock(Achievement::Showstopper) {
            unlocked.push(Achievement::Showstopper);
        }
    }

    pub fn add_crystals(&mut self, amount: u64, unlocked: &mut Vec<Achievement>) {
        self.crystals += amount;
        self.lifetime_crystals += amount;
        if self.lifetime_crystals >= CRYSTAL_HOARDER_THRESHOLD
            && self.unlock(Achievement::CrystalHoarder)
        {
            unlocked.push(Achievement::CrystalHoarder);
        }
    }

    pub fn record_level(&mut self, level: u32, unlocked: &mut Vec<Achievement>) {
        self.highest_level = self.highest_level.max(level);
        if level >= SURVIVOR_LEVEL && self.unlock(Achievement::Survivor) {
            unlocked.push(Achievement::Survivor);
        }
    }

    pub fn snapshot(&self) -> ProgressionSnapshot {
        ProgressionSnapshot {
            score: self.score,
            high_score: self.high_score,
            crystals: self.crystals,
            lifetime_crystals: self.lifetime_crystals,
            total_kills: self.total_kills,
            boss_kills: self.boss_kills,
            finishers_performed: self.finishers_performed,
            best_combo: self.best_combo,
            highest_level: self.highest_level,
            achievements: self.unlocked.clone(),
        }
    }
}

/// Flat progression counters captured at a save point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSnapshot {
    pub score: u64,
    pub high_score: u64,
    pub crystals: u64,
    pub lifetime_crystals: u64,
    pub total_kills: u64,
    pub boss_kills: u64,
    pub finishers_performed: u64,
    pub best_combo: u32,
    pub highest_level: u32,
    pub achievements: Vec<Achievement>,
}
