use crate::constants::MAX_POWER_FACTOR;
use crate::hit::{HitEvent, PaddleContact};
use crate::messages::GameOver;
use crate::scoring::{paddle_points, wall_points, ComboChange, ComboTracker};
use crate::validator::{ScoreValidator, Verdict};
use crate::{SessionEvent, SessionLog};

/// Result of feeding one collision into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitOutcome {
    pub verdict: Verdict,
    /// Points added to the running score (0 when rejected)
    pub points: u32,
    /// Combo effect, paddle hits only
    pub combo: Option<ComboChange>,
}

/// Drives one play session: validator, combo and running score together.
///
/// The game loop calls `observe_paddle` every frame and `record_hit` on each
/// collision. A dropped ball goes through `ball_lost`, which starts the
/// validator over so no history leaks between lives.
#[derive(Debug, Clone)]
pub struct PlaySession {
    validator: ScoreValidator,
    combo: ComboTracker,
    score: u64,
    power_factor: u32,
    balls_lost: u32,
    log: Option<SessionLog>,
}

impl PlaySession {
    pub fn new() -> Self {
        Self {
            validator: ScoreValidator::new(),
            combo: ComboTracker::new(),
            score: 0,
            power_factor: 1,
            balls_lost: 0,
            log: None,
        }
    }

    /// Same as `new`, but every input is also written to a `SessionLog`.
    pub fn recording(session_id: u32) -> Self {
        Self {
            log: Some(SessionLog::new(session_id)),
            ..Self::new()
        }
    }

    /// Reset all per-session state. Keeps recording if it was on.
    pub fn start(&mut self) {
        let log = self.log.as_ref().map(|l| SessionLog::new(l.session_id));
        *self = Self {
            log,
            ..Self::new()
        };
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn multiplier(&self) -> u32 {
        self.combo.multiplier()
    }

    pub fn balls_lost(&self) -> u32 {
        self.balls_lost
    }

    pub fn validator(&self) -> &ScoreValidator {
        &self.validator
    }

    pub fn observe_paddle(&mut self, x: f32, y: f32) {
        self.validator.observe_paddle(x, y);
        if let Some(log) = self.log.as_mut() {
            log.push_paddle(x, y);
        }
    }

    /// Activate or clear a special-power point factor (1 = none), clamped
    /// to `MAX_POWER_FACTOR`.
    pub fn set_power_factor(&mut self, factor: u32) {
        let factor = factor.clamp(1, MAX_POWER_FACTOR);
        if factor == self.power_factor {
            return;
        }
        self.power_factor = factor;
        if let Some(log) = self.log.as_mut() {
            log.push(SessionEvent::Power { factor });
        }
    }

    pub fn record_hit(&mut self, event: HitEvent) -> HitOutcome {
        if let Some(log) = self.log.as_mut() {
            log.push(SessionEvent::Hit(event));
        }

        let verdict = self
            .validator
            .evaluate_hit(event.location, event.timestamp_ms);
        let admitted = verdict.is_admit();
        let multiplier = self.combo.multiplier();

        let (mut points, combo) = if event.location.is_paddle() {
            let contact = event.contact.unwrap_or_else(PaddleContact::centered);
            let points = if admitted {
                paddle_points(&contact, multiplier, self.power_factor)
            } else {
                0
            };
            // rejected hits still drive the combo
            let change = self.combo.register_paddle_hit(event.timestamp_ms);
            (points, Some(change))
        } else {
            let points = if admitted {
                wall_points(event.location, multiplier, self.power_factor)
            } else {
                0
            };
            (points, None)
        };

        if let Some(ComboChange::Bonus(bonus)) = combo {
            if admitted {
                points = points.saturating_add(bonus.saturating_mul(self.power_factor));
            }
        }

        self.score = self.score.saturating_add(u64::from(points));
        HitOutcome {
            verdict,
            points,
            combo,
        }
    }

    /// The ball dropped: combo ends and the validator starts a fresh window.
    pub fn ball_lost(&mut self) {
        self.balls_lost += 1;
        self.combo.reset();
        self.validator.reset();
        if let Some(log) = self.log.as_mut() {
            log.push(SessionEvent::BallLost);
        }
    }

    /// End the session, producing the game-over message and the stamped log.
    pub fn finish(self) -> (GameOver, Option<SessionLog>) {
        let log = self.log.map(|mut log| {
            log.claimed_score = self.score;
            log
        });
        (
            GameOver {
                final_score: self.score,
            },
            log,
        )
    }
}

impl Default for PlaySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::HitLocation;
    use crate::validator::RejectReason;

    fn wiggle(session: &mut PlaySession, frame: u32) {
        session.observe_paddle((frame % 40) as f32 * 5.0, 400.0);
    }

    #[test]
    fn admitted_hits_accumulate_points() {
        let mut s = PlaySession::new();
        wiggle(&mut s, 1);
        wiggle(&mut s, 2);

        let first = s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        assert_eq!(first.verdict, Verdict::Admit);
        assert_eq!(first.points, 2);

        let wall = s.record_hit(HitEvent::wall(HitLocation::LeftWall, 300));
        assert_eq!(wall.points, 0, "no wall bonus without a combo");
        assert_eq!(s.score(), 2);
    }

    #[test]
    fn rejected_hit_scores_nothing_but_advances_combo() {
        let mut s = PlaySession::new();
        for f in 0..3 {
            wiggle(&mut s, f);
        }
        s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        s.record_hit(HitEvent::paddle(100, PaddleContact::centered()));
        let third = s.record_hit(HitEvent::paddle(200, PaddleContact::centered()));

        assert_eq!(third.verdict, Verdict::Reject(RejectReason::Repetition(3)));
        assert_eq!(third.points, 0);
        assert_eq!(third.combo, Some(ComboChange::Extended));
        assert_eq!(s.score(), 4);
    }

    #[test]
    fn ball_lost_resets_validator_window() {
        let mut s = PlaySession::new();
        wiggle(&mut s, 0);
        wiggle(&mut s, 1);
        s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        s.record_hit(HitEvent::wall(HitLocation::LeftWall, 100));
        s.record_hit(HitEvent::paddle(200, PaddleContact::centered()));
        s.ball_lost();

        assert_eq!(s.balls_lost(), 1);
        let next = s.record_hit(HitEvent::wall(HitLocation::LeftWall, 300));
        assert_eq!(next.verdict, Verdict::Admit);
    }

    #[test]
    fn power_factor_scales_paddle_points() {
        let mut s = PlaySession::new();
        wiggle(&mut s, 0);
        wiggle(&mut s, 1);
        s.set_power_factor(2);
        let out = s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        assert_eq!(out.points, 4);
    }

    #[test]
    fn power_factor_is_clamped() {
        let mut s = PlaySession::new();
        wiggle(&mut s, 0);
        wiggle(&mut s, 1);
        s.set_power_factor(u32::MAX);
        let out = s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        assert_eq!(out.points, 2 * MAX_POWER_FACTOR);
    }

    #[test]
    fn finish_stamps_claimed_score() {
        let mut s = PlaySession::recording(42);
        wiggle(&mut s, 0);
        wiggle(&mut s, 1);
        s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        let (over, log) = s.finish();
        let log = log.unwrap();
        assert_eq!(over.final_score, 2);
        assert_eq!(log.claimed_score, 2);
        assert_eq!(log.session_id, 42);
        assert_eq!(log.events.len(), 3);
    }

    #[test]
    fn start_clears_score_and_log() {
        let mut s = PlaySession::recording(9);
        wiggle(&mut s, 0);
        wiggle(&mut s, 1);
        s.record_hit(HitEvent::paddle(0, PaddleContact::centered()));
        s.start();
        assert_eq!(s.score(), 0);
        let (_, log) = s.finish();
        let log = log.unwrap();
        assert!(log.events.is_empty());
        assert_eq!(log.session_id, 9);
    }
}
