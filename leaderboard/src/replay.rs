//! Server-side replay of a recorded session.
//!
//! The log is fed through the same `PlaySession` the client runs, so the
//! validator and combo rules are applied exactly as during play. A claim
//! above the replayed score is rejected; a lower claim is accepted as-is.

use dontdrop_core::constants::{
    MAX_POWER_FACTOR, MAX_SESSION_EVENTS, MAX_SESSION_FRAMES, SESSION_LOG_VERSION,
};
use dontdrop_core::{compute_session_hash, PlaySession, SessionEvent, SessionLog};
use serde::Serialize;

use crate::error::ReplayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub session_id: u32,
    pub claimed_score: u64,
    pub replayed_score: u64,
    pub events_len: u32,
    pub admitted_hits: u32,
    pub rejected_hits: u32,
    /// Hex SHA-256 of the log
    pub log_hash: String,
}

/// Replay `log` and check its claimed score.
pub fn replay_session(log: &SessionLog) -> Result<ReplayReport, ReplayError> {
    tracing::info!(
        "Replaying session {} ({} events, claimed {})",
        log.session_id,
        log.events.len(),
        log.claimed_score
    );

    if log.v != SESSION_LOG_VERSION {
        return Err(ReplayError::UnsupportedVersion(log.v));
    }
    if log.events.len() > MAX_SESSION_EVENTS as usize {
        return Err(ReplayError::TooManyEvents {
            count: log.events.len(),
            max: MAX_SESSION_EVENTS,
        });
    }
    let mut frames = 0u64;
    for event in log.events.iter() {
        match event {
            SessionEvent::Paddle { frames: run, .. } => frames += u64::from(*run),
            SessionEvent::Power { factor } if *factor > MAX_POWER_FACTOR => {
                return Err(ReplayError::PowerFactorOutOfRange {
                    factor: *factor,
                    max: MAX_POWER_FACTOR,
                });
            }
            _ => {}
        }
    }
    if frames > MAX_SESSION_FRAMES {
        return Err(ReplayError::TooManyFrames {
            count: frames,
            max: MAX_SESSION_FRAMES,
        });
    }

    let mut session = PlaySession::new();
    session.start();
    let mut admitted_hits = 0u32;
    let mut rejected_hits = 0u32;

    for event in log.events.iter() {
        match event {
            SessionEvent::Paddle { x, y, frames } => {
                for _ in 0..*frames {
                    session.observe_paddle(*x, *y);
                }
            }
            SessionEvent::Hit(hit) => {
                let outcome = session.record_hit(*hit);
                if outcome.verdict.is_admit() {
                    admitted_hits += 1;
                } else {
                    rejected_hits += 1;
                }
            }
            SessionEvent::BallLost => session.ball_lost(),
            SessionEvent::Power { factor } => session.set_power_factor(*factor),
        }
    }

    let replayed_score = session.score();
    let log_hash = hex::encode(compute_session_hash(log));

    if log.claimed_score > replayed_score {
        tracing::warn!(
            "Session {} claims {} but replays to {} ({} hits rejected)",
            log.session_id,
            log.claimed_score,
            replayed_score,
            rejected_hits
        );
        return Err(ReplayError::ScoreMismatch {
            claimed: log.claimed_score,
            replayed: replayed_score,
        });
    }

    tracing::info!(
        "Session {} verified: {} points, {} admitted / {} rejected hits, hash 0x{}",
        log.session_id,
        replayed_score,
        admitted_hits,
        rejected_hits,
        log_hash
    );

    Ok(ReplayReport {
        session_id: log.session_id,
        claimed_score: log.claimed_score,
        replayed_score,
        events_len: log.events.len() as u32,
        admitted_hits,
        rejected_hits,
        log_hash,
    })
}

/// Check a game-over score against the session log that came with it.
pub fn verify_game_over(final_score: u64, log: &SessionLog) -> Result<ReplayReport, ReplayError> {
    if log.claimed_score != final_score {
        return Err(ReplayError::ClaimMismatch {
            submitted: final_score,
            claimed: log.claimed_score,
        });
    }
    replay_session(log)
}
