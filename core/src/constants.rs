// Scoring and anti-cheat constants.
// The client game loop and the server replay both read these, so they must
// stay identical on both sides.

/// Number of hit locations kept in the rolling history
pub const HIT_HISTORY_LEN: usize = 4;

/// Consecutive hits at one location allowed before scoring is withheld
pub const MAX_SAME_LOCATION_HITS: u32 = 2;

/// Frames without paddle movement before hits stop scoring (~2s at 60 Hz)
pub const STILL_FRAME_LIMIT: u32 = 120;

/// Paddle displacement (pixels) below which a frame counts as still
pub const STILL_TOLERANCE_PX: f32 = 1.0;

/// Time window (ms) in which consecutive paddle hits keep the combo alive
pub const COMBO_WINDOW_MS: u64 = 1500;

/// Consecutive paddle hits per multiplier step
pub const COMBO_STEP: u32 = 5;

/// Highest combo multiplier
pub const MAX_MULTIPLIER: u32 = 4;

/// Cap on the per-step combo bonus before the multiplier is applied
pub const MAX_COMBO_BONUS: u32 = 5;

/// Base points for a paddle hit near the centre
pub const CENTER_HIT_POINTS: u32 = 2;

/// Base points for a paddle hit near the edge
pub const EDGE_HIT_POINTS: u32 = 5;

/// Distance from paddle centre (0.0..=0.5) that counts as an edge hit
pub const EDGE_HIT_DISTANCE: f32 = 0.4;

/// Paddle vertical speed (px/frame) that earns the skill-shot bonus
pub const SKILL_SHOT_SPEED: f32 = 5.0;

/// Points added for a skill shot
pub const SKILL_SHOT_POINTS: u32 = 1;

/// Side wall bonus per multiplier level (only while multiplier > 1)
pub const SIDE_WALL_BONUS: u32 = 2;

/// Ceiling bonus per multiplier level (only while multiplier > 1)
pub const CEILING_BONUS: u32 = 3;

/// Number of leaderboard entries shown by default
pub const TOP_PLAYERS_COUNT: usize = 10;

/// Number of leaderboard slots that can trigger an announcement
pub const ANNOUNCE_TOP_N: usize = 5;

/// Maximum number of events accepted in a session log
pub const MAX_SESSION_EVENTS: u32 = 20_000;

/// Current session log format version
pub const SESSION_LOG_VERSION: u32 = 1;

/// Maximum number of paddle frames a replay will simulate (30 minutes at 60 Hz)
pub const MAX_SESSION_FRAMES: u64 = 60 * 60 * 30;

/// Largest special-power point factor (double points)
pub const MAX_POWER_FACTOR: u32 = 2;
