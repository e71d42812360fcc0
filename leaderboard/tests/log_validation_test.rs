// Server-side replay of recorded session logs
use dontdrop_core::constants::{MAX_POWER_FACTOR, MAX_SESSION_EVENTS, MAX_SESSION_FRAMES};
use dontdrop_core::{
    compute_session_hash, HitEvent, HitLocation, PaddleContact, PlaySession, SessionEvent,
    SessionLog,
};
use leaderboard::{replay_session, verify_game_over, ReplayError};

/// Plays a short, honest rally and returns the stamped log.
fn honest_session() -> SessionLog {
    let mut session = PlaySession::recording(7);
    session.start();

    let hits = [
        HitEvent::paddle(0, PaddleContact::centered()),
        HitEvent::wall(HitLocation::LeftWall, 400),
        HitEvent::paddle(
            800,
            PaddleContact {
                hit_point: 0.95,
                paddle_velocity_y: 6.0,
            },
        ),
        HitEvent::wall(HitLocation::RightWall, 1200),
        HitEvent::paddle(1600, PaddleContact::centered()),
    ];

    for (i, hit) in hits.iter().enumerate() {
        for frame in 0..10 {
            session.observe_paddle((i * 10 + frame) as f32 * 3.0, 400.0);
        }
        session.record_hit(*hit);
    }
    session.ball_lost();

    let (over, log) = session.finish();
    let log = log.expect("recording session produces a log");
    assert_eq!(over.final_score, log.claimed_score);
    log
}

#[test]
fn test_honest_session_replays_to_claimed_score() {
    let log = honest_session();

    let report = replay_session(&log).expect("honest session should verify");

    assert_eq!(report.replayed_score, log.claimed_score);
    assert!(report.replayed_score > 0);
    assert_eq!(report.admitted_hits, 5);
    assert_eq!(report.rejected_hits, 0);
    assert_eq!(report.session_id, 7);
    assert_eq!(report.events_len as usize, log.events.len());
    assert_eq!(report.log_hash, hex::encode(compute_session_hash(&log)));
}

#[test]
fn test_log_survives_json_round_trip() {
    let log = honest_session();
    let json = serde_json::to_string(&log).unwrap();
    let parsed: SessionLog = serde_json::from_str(&json).unwrap();

    let direct = replay_session(&log).unwrap();
    let from_json = replay_session(&parsed).unwrap();
    assert_eq!(direct, from_json);
}

#[test]
fn test_inflated_claim_is_rejected() {
    let mut log = honest_session();
    let honest = log.claimed_score;
    log.claimed_score = honest + 500;

    let err = replay_session(&log).unwrap_err();
    assert_eq!(
        err,
        ReplayError::ScoreMismatch {
            claimed: honest + 500,
            replayed: honest,
        }
    );
}

#[test]
fn test_lower_claim_is_accepted() {
    let mut log = honest_session();
    log.claimed_score = 1;

    let report = replay_session(&log).unwrap();
    assert_eq!(report.claimed_score, 1);
    assert!(report.replayed_score > 1);
}

#[test]
fn test_idle_paddle_hits_score_nothing() {
    let mut log = SessionLog::new(3);
    log.push(SessionEvent::Paddle {
        x: 100.0,
        y: 400.0,
        frames: 150,
    });
    log.push(SessionEvent::Hit(HitEvent::paddle(0, PaddleContact::centered())));
    log.push(SessionEvent::Hit(HitEvent::wall(HitLocation::TopWall, 500)));
    log.claimed_score = 10;

    let err = replay_session(&log).unwrap_err();
    assert_eq!(
        err,
        ReplayError::ScoreMismatch {
            claimed: 10,
            replayed: 0
        }
    );
}

#[test]
fn test_paddle_wall_farming_is_rejected() {
    let mut log = SessionLog::new(4);
    let pattern = [
        HitLocation::Paddle,
        HitLocation::LeftWall,
        HitLocation::Paddle,
        HitLocation::LeftWall,
    ];
    for (i, location) in pattern.iter().enumerate() {
        log.push_paddle(i as f32 * 20.0, 400.0);
        let hit = if location.is_paddle() {
            HitEvent::paddle(i as u64 * 300, PaddleContact::centered())
        } else {
            HitEvent::wall(*location, i as u64 * 300)
        };
        log.push(SessionEvent::Hit(hit));
    }

    let report = replay_session(&log).unwrap();
    assert_eq!(report.admitted_hits, 3);
    assert_eq!(report.rejected_hits, 1);
}

#[test]
fn test_unsupported_version_is_rejected() {
    let mut log = honest_session();
    log.v = 2;
    assert_eq!(
        replay_session(&log).unwrap_err(),
        ReplayError::UnsupportedVersion(2)
    );
}

#[test]
fn test_too_many_events_is_rejected() {
    let mut log = SessionLog::new(5);
    for _ in 0..=MAX_SESSION_EVENTS {
        log.push(SessionEvent::BallLost);
    }

    match replay_session(&log) {
        Err(ReplayError::TooManyEvents { count, max }) => {
            assert_eq!(count, MAX_SESSION_EVENTS as usize + 1);
            assert_eq!(max, MAX_SESSION_EVENTS);
        }
        other => panic!("expected TooManyEvents, got {:?}", other),
    }
}

#[test]
fn test_too_many_frames_is_rejected() {
    let mut log = SessionLog::new(6);
    log.push(SessionEvent::Paddle {
        x: 0.0,
        y: 0.0,
        frames: MAX_SESSION_FRAMES as u32 + 1,
    });

    assert_eq!(
        replay_session(&log).unwrap_err(),
        ReplayError::TooManyFrames {
            count: MAX_SESSION_FRAMES + 1,
            max: MAX_SESSION_FRAMES,
        }
    );
}

#[test]
fn test_game_over_must_match_log_claim() {
    let log = honest_session();

    assert!(verify_game_over(log.claimed_score, &log).is_ok());
    assert_eq!(
        verify_game_over(log.claimed_score + 1, &log).unwrap_err(),
        ReplayError::ClaimMismatch {
            submitted: log.claimed_score + 1,
            claimed: log.claimed_score,
        }
    );
}

#[test]
fn test_hash_changes_with_any_event() {
    let log = honest_session();
    let mut tampered = log.clone();
    if let Some(SessionEvent::Hit(hit)) = tampered
        .events
        .iter_mut()
        .find(|e| matches!(e, SessionEvent::Hit(_)))
    {
        hit.timestamp_ms += 1;
    }
    assert_ne!(compute_session_hash(&log), compute_session_hash(&tampered));
}

/// Moving paddle, a power event, then one centred paddle hit.
fn powered_hit_log(factor: u32) -> SessionLog {
    let mut log = SessionLog::new(8);
    log.push_paddle(10.0, 400.0);
    log.push_paddle(30.0, 400.0);
    log.push(SessionEvent::Power { factor });
    log.push(SessionEvent::Hit(HitEvent::paddle(0, PaddleContact::centered())));
    log
}

#[test]
fn test_overflowing_power_factor_is_rejected() {
    let log = powered_hit_log(u32::MAX);
    assert_eq!(
        replay_session(&log).unwrap_err(),
        ReplayError::PowerFactorOutOfRange {
            factor: u32::MAX,
            max: MAX_POWER_FACTOR,
        }
    );
}

#[test]
fn test_inflated_power_factor_is_rejected() {
    let mut log = powered_hit_log(1_000_000);
    log.claimed_score = 2_000_000;
    assert!(matches!(
        replay_session(&log),
        Err(ReplayError::PowerFactorOutOfRange { factor: 1_000_000, .. })
    ));
}

#[test]
fn test_allowed_power_factor_scales_score() {
    let mut log = powered_hit_log(MAX_POWER_FACTOR);
    log.claimed_score = 2 * u64::from(MAX_POWER_FACTOR);

    let report = replay_session(&log).unwrap();
    assert_eq!(report.replayed_score, 2 * u64::from(MAX_POWER_FACTOR));
}
