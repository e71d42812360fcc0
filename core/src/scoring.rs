//! Combo multiplier and per-hit point values.

use crate::constants::*;
use crate::hit::{HitLocation, PaddleContact};

/// What a paddle hit did to the combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboChange {
    /// The hit came too late and the combo was dropped
    Broken,
    /// Counter advanced, nothing else happened
    Extended,
    /// Multiplier stepped up to the contained value
    LevelUp(u32),
    /// Milestone without a level change; contains the bonus points
    Bonus(u32),
}

#[derive(Debug, Clone)]
pub struct ComboTracker {
    consecutive_hits: u32,
    multiplier: u32,
    last_hit_ms: Option<u64>,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self {
            consecutive_hits: 0,
            multiplier: 1,
            last_hit_ms: None,
        }
    }
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    pub fn reset(&mut self) {
        self.consecutive_hits = 0;
        self.multiplier = 1;
    }

    /// Advance the combo for a paddle hit at `now_ms`.
    pub fn register_paddle_hit(&mut self, now_ms: u64) -> ComboChange {
        let since_last = self
            .last_hit_ms
            .map(|last| now_ms.saturating_sub(last))
            .unwrap_or(0);
        self.last_hit_ms = Some(now_ms);

        if since_last > COMBO_WINDOW_MS && self.consecutive_hits > 0 {
            self.reset();
            return ComboChange::Broken;
        }

        self.consecutive_hits += 1;
        let hits = self.consecutive_hits;

        if hits % COMBO_STEP != 0 {
            return ComboChange::Extended;
        }

        let level = hits / COMBO_STEP + 1;
        if level <= MAX_MULTIPLIER && level > self.multiplier {
            self.multiplier = level;
            ComboChange::LevelUp(level)
        } else {
            let bonus = (hits / COMBO_STEP).min(MAX_COMBO_BONUS) * self.multiplier;
            ComboChange::Bonus(bonus)
        }
    }
}

/// Base paddle points before multipliers.
pub fn paddle_base_points(contact: &PaddleContact) -> u32 {
    let center_distance = distance(0.5, contact.hit_point);
    let mut points = if center_distance > EDGE_HIT_DISTANCE {
        EDGE_HIT_POINTS
    } else {
        CENTER_HIT_POINTS
    };
    if distance(0.0, contact.paddle_velocity_y) > SKILL_SHOT_SPEED {
        points += SKILL_SHOT_POINTS;
    }
    points
}

/// Points for a paddle hit with the current combo multiplier and power factor.
pub fn paddle_points(contact: &PaddleContact, multiplier: u32, power_factor: u32) -> u32 {
    paddle_base_points(contact)
        .saturating_mul(multiplier)
        .saturating_mul(power_factor)
}

/// Wall and ceiling bonuses only pay out while a combo is running.
pub fn wall_points(location: HitLocation, multiplier: u32, power_factor: u32) -> u32 {
    if multiplier <= 1 {
        return 0;
    }
    let per_level = if location.is_ceiling() {
        CEILING_BONUS
    } else if location.is_side_wall() {
        SIDE_WALL_BONUS
    } else {
        0
    };
    per_level
        .saturating_mul(multiplier)
        .saturating_mul(power_factor)
}

// no_std has no f32::abs
fn distance(a: f32, b: f32) -> f32 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
