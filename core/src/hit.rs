use serde::{Deserialize, Serialize};

/// Where the ball touched something during play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HitLocation {
    Paddle,
    LeftWall,
    RightWall,
    TopWall,
    TopLeftCorner,
    TopRightCorner,
}

impl HitLocation {
    pub fn is_paddle(self) -> bool {
        matches!(self, HitLocation::Paddle)
    }

    pub fn is_side_wall(self) -> bool {
        matches!(self, HitLocation::LeftWall | HitLocation::RightWall)
    }

    /// Top wall and both top corners pay the ceiling bonus.
    pub fn is_ceiling(self) -> bool {
        matches!(
            self,
            HitLocation::TopWall | HitLocation::TopLeftCorner | HitLocation::TopRightCorner
        )
    }

    /// Stable single-byte tag used by the session log digest.
    pub fn tag(self) -> u8 {
        match self {
            HitLocation::Paddle => 0,
            HitLocation::LeftWall => 1,
            HitLocation::RightWall => 2,
            HitLocation::TopWall => 3,
            HitLocation::TopLeftCorner => 4,
            HitLocation::TopRightCorner => 5,
        }
    }
}

impl core::fmt::Display for HitLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            HitLocation::Paddle => "paddle",
            HitLocation::LeftWall => "left-wall",
            HitLocation::RightWall => "right-wall",
            HitLocation::TopWall => "top-wall",
            HitLocation::TopLeftCorner => "top-left-corner",
            HitLocation::TopRightCorner => "top-right-corner",
        };
        f.write_str(name)
    }
}

/// Contact details the game loop measures for a paddle hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaddleContact {
    /// Where along the paddle the ball landed, 0.0 (left edge) to 1.0 (right edge)
    pub hit_point: f32,
    /// Paddle vertical velocity at the moment of contact, px/frame
    pub paddle_velocity_y: f32,
}

impl PaddleContact {
    pub fn centered() -> Self {
        Self {
            hit_point: 0.5,
            paddle_velocity_y: 0.0,
        }
    }
}

/// A single collision, as fed into the validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitEvent {
    pub location: HitLocation,
    pub timestamp_ms: u64,
    /// Present for paddle hits only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<PaddleContact>,
}

impl HitEvent {
    pub fn wall(location: HitLocation, timestamp_ms: u64) -> Self {
        Self {
            location,
            timestamp_ms,
            contact: None,
        }
    }

    pub fn paddle(timestamp_ms: u64, contact: PaddleContact) -> Self {
        Self {
            location: HitLocation::Paddle,
            timestamp_ms,
            contact: Some(contact),
        }
    }
}
