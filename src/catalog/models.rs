//! Catalog and account-tier data models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn to_int(self) -> i32 {
        match self {
            Tier::Free => 0,
            Tier::Premium => 1,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(Tier::Free),
            1 => Some(Tier::Premium),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "premium" => Some(Tier::Premium),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Track,
    Podcast,
}

impl ContentKind {
    pub fn to_int(self) -> i32 {
        match self {
            ContentKind::Track => 0,
            ContentKind::Podcast => 1,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "track" => Some(ContentKind::Track),
            "podcast" => Some(ContentKind::Podcast),
            _ => None,
        }
    }
}

/// A catalog entry, visible to every authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub id: usize,
    pub kind: ContentKind,
    pub title: String,
    pub artist: String,
    pub duration_sec: u32,
}

/// A user-owned playlist. `owner` is the owner's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub id: usize,
    pub owner: String,
    pub title: String,
    pub track_count: u32,
}
