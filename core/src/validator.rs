//! Per-session anti-cheat filter.
//!
//! The validator never touches ball physics. It only answers whether a
//! collision may award points, so play feels identical whether or not a hit
//! is admitted.

use serde::{Deserialize, Serialize};

use crate::constants::{
    HIT_HISTORY_LEN, MAX_SAME_LOCATION_HITS, STILL_FRAME_LIMIT, STILL_TOLERANCE_PX,
};
use crate::hit::HitLocation;

/// Why a hit was denied points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "camelCase")]
pub enum RejectReason {
    /// The paddle has not moved for too many frames
    Idle,
    /// Strict paddle/other A-B-A-B alternation
    Pattern,
    /// Too many consecutive hits at the same location
    Repetition(u32),
}

impl core::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RejectReason::Idle => f.write_str("paddle idle"),
            RejectReason::Pattern => f.write_str("alternating hit pattern"),
            RejectReason::Repetition(n) => write!(f, "{} consecutive hits at one location", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Admit,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_admit(&self) -> bool {
        matches!(self, Verdict::Admit)
    }
}

/// Rolling state for one play session (reset on every new ball).
#[derive(Debug, Clone, Default)]
pub struct ScoreValidator {
    history: [Option<HitLocation>; HIT_HISTORY_LEN],
    last_hit_location: Option<HitLocation>,
    consecutive_hit_count: u32,
    last_paddle_pos: Option<(f32, f32)>,
    still_frames: u32,
}

impl ScoreValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the all-zero state. Called at session start and on ball reset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed the paddle reference point once per simulation frame.
    ///
    /// A frame whose displacement stays under the pixel tolerance (including
    /// the very first observation) counts toward the stillness limit; any real
    /// movement clears it.
    pub fn observe_paddle(&mut self, x: f32, y: f32) {
        let moved = match self.last_paddle_pos {
            Some((px, py)) => {
                let dx = x - px;
                let dy = y - py;
                dx * dx + dy * dy >= STILL_TOLERANCE_PX * STILL_TOLERANCE_PX
            }
            None => false,
        };

        if moved {
            self.still_frames = 0;
        } else {
            self.still_frames = self.still_frames.saturating_add(1);
        }
        self.last_paddle_pos = Some((x, y));
    }

    pub fn is_idle(&self) -> bool {
        self.still_frames >= STILL_FRAME_LIMIT
    }

    pub fn still_frames(&self) -> u32 {
        self.still_frames
    }

    pub fn consecutive_hit_count(&self) -> u32 {
        self.consecutive_hit_count
    }

    /// Oldest to newest; empty slots are `None`.
    pub fn history(&self) -> &[Option<HitLocation>; HIT_HISTORY_LEN] {
        &self.history
    }

    /// Record the hit and decide whether it may score.
    ///
    /// `now_ms` is accepted so callers can log against it; the decision itself
    /// is purely positional.
    pub fn evaluate_hit(&mut self, location: HitLocation, _now_ms: u64) -> Verdict {
        if self.last_hit_location == Some(location) {
            self.consecutive_hit_count += 1;
        } else {
            self.consecutive_hit_count = 1;
            self.last_hit_location = Some(location);
        }

        self.history.rotate_left(1);
        self.history[HIT_HISTORY_LEN - 1] = Some(location);

        if self.is_idle() {
            return Verdict::Reject(RejectReason::Idle);
        }
        if self.is_alternating() {
            return Verdict::Reject(RejectReason::Pattern);
        }
        if self.consecutive_hit_count > MAX_SAME_LOCATION_HITS {
            return Verdict::Reject(RejectReason::Repetition(self.consecutive_hit_count));
        }
        Verdict::Admit
    }

    // A-B-A-B over the full window, with the paddle as one of the two points.
    fn is_alternating(&self) -> bool {
        match self.history {
            [Some(h0), Some(h1), Some(h2), Some(h3)] => {
                h0 == h2 && h1 == h3 && h0 != h1 && (h0.is_paddle() || h1.is_paddle())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HitLocation::*;

    fn feed(v: &mut ScoreValidator, hits: &[HitLocation]) -> Vec<Verdict> {
        hits.iter()
            .enumerate()
            .map(|(i, h)| v.evaluate_hit(*h, i as u64 * 100))
            .collect()
    }

    fn moving(v: &mut ScoreValidator) {
        v.observe_paddle(0.0, 0.0);
        v.observe_paddle(10.0, 0.0);
    }

    #[test]
    fn paddle_wall_alternation_is_rejected() {
        let mut v = ScoreValidator::new();
        moving(&mut v);
        let verdicts = feed(&mut v, &[Paddle, LeftWall, Paddle, LeftWall]);
        assert_eq!(verdicts[..3], [Verdict::Admit; 3]);
        assert_eq!(verdicts[3], Verdict::Reject(RejectReason::Pattern));
    }

    #[test]
    fn alternation_starting_on_wall_is_rejected() {
        let mut v = ScoreValidator::new();
        moving(&mut v);
        let verdicts = feed(&mut v, &[TopWall, Paddle, TopWall, Paddle]);
        assert_eq!(verdicts[3], Verdict::Reject(RejectReason::Pattern));
    }

    #[test]
    fn changing_partner_is_admitted() {
        let mut v = ScoreValidator::new();
        moving(&mut v);
        let verdicts = feed(&mut v, &[Paddle, LeftWall, Paddle, RightWall]);
        assert!(verdicts.iter().all(Verdict::is_admit));
    }

    #[test]
    fn wall_to_wall_alternation_is_not_a_pattern() {
        let mut v = ScoreValidator::new();
        moving(&mut v);
        let verdicts = feed(&mut v, &[LeftWall, RightWall, LeftWall, RightWall]);
        assert!(verdicts.iter().all(Verdict::is_admit));
    }

    #[test]
    fn third_consecutive_hit_at_same_spot_is_rejected() {
        let mut v = ScoreValidator::new();
        moving(&mut v);
        let verdicts = feed(&mut v, &[Paddle, Paddle, Paddle, Paddle]);
        assert_eq!(verdicts[0], Verdict::Admit);
        assert_eq!(verdicts[1], Verdict::Admit);
        assert_eq!(verdicts[2], Verdict::Reject(RejectReason::Repetition(3)));
        assert_eq!(verdicts[3], Verdict::Reject(RejectReason::Repetition(4)));
        assert_eq!(v.consecutive_hit_count(), 4);
    }

    #[test]
    fn frozen_paddle_rejects_every_hit_as_idle() {
        let mut v = ScoreValidator::new();
        for _ in 0..STILL_FRAME_LIMIT {
            v.observe_paddle(200.0, 400.0);
        }
        assert!(v.is_idle());

        let locations = [Paddle, LeftWall, Paddle, TopWall, RightWall];
        for i in 0..10 {
            let verdict = v.evaluate_hit(locations[i % locations.len()], i as u64);
            assert_eq!(verdict, Verdict::Reject(RejectReason::Idle));
        }
    }

    #[test]
    fn moving_again_clears_idle() {
        let mut v = ScoreValidator::new();
        for _ in 0..STILL_FRAME_LIMIT + 30 {
            v.observe_paddle(50.0, 50.0);
        }
        assert_eq!(v.evaluate_hit(Paddle, 0), Verdict::Reject(RejectReason::Idle));

        v.observe_paddle(80.0, 50.0);
        assert!(!v.is_idle());
        assert_eq!(v.evaluate_hit(LeftWall, 1), Verdict::Admit);
    }

    #[test]
    fn sub_pixel_jitter_still_counts_as_still() {
        let mut v = ScoreValidator::new();
        for i in 0..STILL_FRAME_LIMIT {
            let jitter = if i % 2 == 0 { 0.3 } else { 0.0 };
            v.observe_paddle(100.0 + jitter, 100.0);
        }
        assert!(v.is_idle());
    }

    #[test]
    fn reset_clears_history_and_counters() {
        let mut v = ScoreValidator::new();
        moving(&mut v);
        feed(&mut v, &[Paddle, LeftWall, Paddle]);
        v.reset();
        assert_eq!(v.history(), &[None; HIT_HISTORY_LEN]);
        assert_eq!(v.consecutive_hit_count(), 0);
        assert_eq!(v.still_frames(), 0);
        // a fresh ball cannot complete the old alternation
        assert_eq!(v.evaluate_hit(LeftWall, 0), Verdict::Admit);
    }
}
