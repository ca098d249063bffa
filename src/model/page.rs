//! Wire model for the BallDontLie `/v1/games` endpoint.
//!
//! Everything the upstream may omit is optional here; defaults are applied
//! once, when a [`RawGame`] is turned into a
//! [`GameRecord`](crate::model::game::GameRecord). Fields we do not retain
//! (season, period, clock, ...) are ignored by serde.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// One page of the paginated games listing.
#[derive(Debug, Deserialize)]
pub struct GamesPage {
    #[serde(default)]
    pub data: Vec<RawGame>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl GamesPage {
    /// Token for the next page, if the server advertised one. A missing
    /// `meta` object counts as the last page.
    pub fn next_cursor(&self) -> Option<i64> {
        self.meta.as_ref().and_then(|m| m.next_cursor)
    }
}

/// Pagination metadata; `next_cursor` is null on the last page.
#[derive(Debug, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub next_cursor: Option<i64>,
}

/// A game entry as served by the API, before normalization.
#[derive(Debug, Deserialize)]
pub struct RawGame {
    pub id: i64,
    #[serde(deserialize_with = "de_calendar_date")]
    pub date: NaiveDate,
    /// Scheduled tipoff as an ISO-8601 UTC instant; null for games without a
    /// published time.
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub postseason: bool,
    #[serde(default)]
    pub visitor_team: Option<RawTeam>,
    #[serde(default)]
    pub home_team: Option<RawTeam>,
    #[serde(default)]
    pub visitor_team_score: i64,
    #[serde(default)]
    pub home_team_score: i64,
}

/// Nested team object; only the fields the table retains.
#[derive(Debug, Default, Deserialize)]
pub struct RawTeam {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

/// The API has served `date` both as a plain `YYYY-MM-DD` and, historically,
/// as a full ISO instant. Accept either by reading up to the `T`.
fn de_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let day = s.split('T').next().unwrap_or(&s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(serde::de::Error::custom)
}
