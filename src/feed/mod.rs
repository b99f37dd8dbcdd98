//! Draw-history feed types and the source abstraction.
//!
//! A [`DrawResult`] is one settled round of the remote number game. Batches
//! are ordered newest first; issue numbers are monotonically increasing
//! numeric strings.

pub(crate) mod fetch;

pub use fetch::FeedClient;

use crate::utils::serialization::de_u8_flexible;
use anyhow::Result;
use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Maximum results a single `fetch_latest` call will return.
pub const MAX_RESULTS: usize = 300;

/// Winning color of a draw round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Violet,
}

impl FromStr for Color {
    type Err = anyhow::Error;

    /// The endpoint sometimes reports combined colors ("red,violet");
    /// the first recognized token wins.
    fn from_str(s: &str) -> Result<Self> {
        for token in s.split(',') {
            match token.trim().to_ascii_lowercase().as_str() {
                "red" => return Ok(Color::Red),
                "green" => return Ok(Color::Green),
                "violet" => return Ok(Color::Violet),
                _ => continue,
            }
        }
        anyhow::bail!("unrecognized color: {s}")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "Red"),
            Color::Green => write!(f, "Green"),
            Color::Violet => write!(f, "Violet"),
        }
    }
}

fn de_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<Color>().map_err(de::Error::custom)
}

/// Size class derived from the winning number (Big = 6-9, Small = 0-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    Big,
    Small,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Size::Big => write!(f, "Big"),
            Size::Small => write!(f, "Small"),
        }
    }
}

/// One settled round from the draw-history feed.
#[derive(Debug, Clone, Deserialize)]
pub struct DrawResult {
    #[serde(rename = "issueNumber")]
    pub issue_number: String,
    #[serde(deserialize_with = "de_u8_flexible")]
    pub number: u8,
    #[serde(deserialize_with = "de_color")]
    pub color: Color,
}

impl DrawResult {
    pub fn size(&self) -> Size {
        if self.number >= 6 {
            Size::Big
        } else {
            Size::Small
        }
    }
}

/// Successor of a numeric issue identifier ("1050" -> "1051").
///
/// Returns `None` when the identifier is not numeric.
pub fn next_issue(issue: &str) -> Option<String> {
    issue.trim().parse::<u64>().ok().map(|n| (n + 1).to_string())
}

/// Source of draw-history batches.
///
/// The poll loop only depends on this trait, so tests can drive it with a
/// scripted source instead of the live endpoint.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the most recent results, newest first, at most `max_results`.
    ///
    /// An `Err` is a transient condition (network or decode failure); the
    /// caller decides whether to retry.
    async fn fetch_latest(&self, max_results: usize) -> Result<Vec<DrawResult>>;
}
