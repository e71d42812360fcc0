#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod cache;
pub mod constants;
pub mod hit;
pub mod messages;
pub mod scoring;
pub mod session;
pub mod validator;

pub use cache::{CachedEntry, LocalLeaderboard, PendingScores, SyncState};
pub use hit::{HitEvent, HitLocation, PaddleContact};
pub use messages::{
    GameOver, GameOverAck, GetLeaderboard, LeaderboardData, LeaderboardEntry, LeaderboardUpdate,
};
pub use scoring::{ComboChange, ComboTracker};
pub use session::{HitOutcome, PlaySession};
pub use validator::{RejectReason, ScoreValidator, Verdict};

/// One recorded step of a play session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Paddle reference point held for `frames` consecutive frames
    Paddle { x: f32, y: f32, frames: u32 },
    Hit(HitEvent),
    /// Ball dropped; a new life starts
    BallLost,
    /// Special-power point factor changed
    Power { factor: u32 },
}

/// Versioned record of a session, replayable on the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionLog {
    pub v: u32,
    /// Client-chosen session identifier, bound into the digest
    pub session_id: u32,
    pub events: Vec<SessionEvent>,
    /// Final score the client reports for this session
    pub claimed_score: u64,
}

impl SessionLog {
    pub fn new(session_id: u32) -> Self {
        Self {
            v: constants::SESSION_LOG_VERSION,
            session_id,
            events: Vec::new(),
            claimed_score: 0,
        }
    }

    /// Append a paddle frame, folding it into the previous run when unchanged.
    pub fn push_paddle(&mut self, x: f32, y: f32) {
        if let Some(SessionEvent::Paddle {
            x: px,
            y: py,
            frames,
        }) = self.events.last_mut()
        {
            if *px == x && *py == y {
                *frames += 1;
                return;
            }
        }
        self.events.push(SessionEvent::Paddle { x, y, frames: 1 });
    }

    pub fn push(&mut self, event: SessionEvent) {
        self.events.push(event);
    }
}

/// Compute SHA-256 digest of a session log.
/// This binds a replay verdict to the exact events that produced it.
pub fn compute_session_hash(log: &SessionLog) -> [u8; 32] {
    let mut h = Sha256::new();

    // Domain prefix, log version, session id, claimed score, then each event in order
    let mut buf = Vec::with_capacity(7 + 16 + log.events.len() * 16);
    buf.extend_from_slice(b"DDLOGv1");
    buf.extend_from_slice(&log.v.to_le_bytes());
    buf.extend_from_slice(&log.session_id.to_le_bytes());
    buf.extend_from_slice(&log.claimed_score.to_le_bytes());

    for event in log.events.iter() {
        match event {
            SessionEvent::Paddle { x, y, frames } => {
                buf.push(0);
                buf.extend_from_slice(&x.to_bits().to_le_bytes());
                buf.extend_from_slice(&y.to_bits().to_le_bytes());
                buf.extend_from_slice(&frames.to_le_bytes());
            }
            SessionEvent::Hit(hit) => {
                buf.push(1);
                buf.push(hit.location.tag());
                buf.extend_from_slice(&hit.timestamp_ms.to_le_bytes());
                match hit.contact {
                    Some(contact) => {
                        buf.push(1);
                        buf.extend_from_slice(&contact.hit_point.to_bits().to_le_bytes());
                        buf.extend_from_slice(&contact.paddle_velocity_y.to_bits().to_le_bytes());
                    }
                    None => buf.push(0),
                }
            }
            SessionEvent::BallLost => buf.push(2),
            SessionEvent::Power { factor } => {
                buf.push(3);
                buf.extend_from_slice(&factor.to_le_bytes());
            }
        }
    }

    h.update(&buf);

    let out = h.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}
