//! Global leaderboard for Don't Drop.
//!
//! Scores are ranked by a stable account id and only ever go up. Display names
//! are resolved separately so renames keep their history, and a new best that
//! lands in the top 5 is handed to an announcement scheduler.

pub mod announce;
pub mod digest;
pub mod error;
pub mod identity;
pub mod keys;
pub mod replay;
pub mod service;
pub mod store;

pub use announce::{
    run_announcement_worker, Announcement, AnnouncementScheduler, AnnouncementSink,
    ChannelScheduler, DisplacedPlayer, NoopScheduler, TracingSink,
};
pub use digest::{build_weekly_digest, WeeklyDigest};
pub use error::{LeaderboardError, ReplayError, SchedulerError, StoreError};
pub use identity::{IdentityResolver, PlayerIdentity};
pub use keys::StoreKeys;
pub use replay::{replay_session, verify_game_over, ReplayReport};
pub use service::{
    announcement_for, LeaderboardService, LeaderboardSnapshot, RankedEntry, SubmissionReport,
    SubmitOutcome,
};
pub use store::{JsonFileStore, MemoryStore, RankingStore, StoreSnapshot, ZMember};
