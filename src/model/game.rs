use std::collections::HashSet;

use chrono::NaiveDate;
use chrono_tz::Europe::Madrid;
use serde::{Deserialize, Serialize};

use crate::model::page::RawGame;

/// One row of the normalized schedule table. Produced once from a [`RawGame`]
/// and never mutated afterwards; the serde renames double as the CSV header
/// names, so field order here is the column order of the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: i64,
    pub date: NaiveDate,
    /// Tipoff in Europe/Madrid, "YYYY-MM-DD HH:MM"; None when upstream has
    /// no (parseable) start time.
    pub tipoff_local: Option<String>,
    pub status: String,
    pub postseason: bool,
    #[serde(rename = "visitor_team.abbreviation")]
    pub visitor_abbreviation: String,
    pub visitor_team_score: i64,
    #[serde(rename = "home_team.abbreviation")]
    pub home_abbreviation: String,
    pub home_team_score: i64,
    pub matchup: String,
}

impl GameRecord {
    /// Apply the boundary defaults and derive the display columns. This is
    /// the only place a raw timestamp is converted to local time.
    pub fn from_raw(raw: RawGame) -> Self {
        let visitor = raw.visitor_team.unwrap_or_default();
        let home = raw.home_team.unwrap_or_default();

        let matchup = format!(
            "{} @ {}",
            visitor.full_name.as_deref().unwrap_or(""),
            home.full_name.as_deref().unwrap_or("")
        );

        GameRecord {
            id: raw.id,
            date: raw.date,
            tipoff_local: raw.datetime.as_deref().and_then(localize_tipoff),
            status: raw.status.unwrap_or_default(),
            postseason: raw.postseason,
            visitor_abbreviation: visitor.abbreviation.unwrap_or_default(),
            visitor_team_score: raw.visitor_team_score,
            home_abbreviation: home.abbreviation.unwrap_or_default(),
            home_team_score: raw.home_team_score,
            matchup,
        }
    }
}

/// Turn raw rows into records, dropping any row whose id was already seen.
/// Upstream order is preserved; sorting is a separate, explicit step.
pub fn normalize(rows: Vec<RawGame>) -> Vec<GameRecord> {
    let mut seen: HashSet<i64> = HashSet::with_capacity(rows.len());
    let mut games = Vec::with_capacity(rows.len());
    for raw in rows {
        if !seen.insert(raw.id) {
            continue;
        }
        games.push(GameRecord::from_raw(raw));
    }
    games
}

/// Sort ascending by date, then by local tipoff string; rows without a
/// tipoff go after rows with one on the same date. Stable, so equal keys
/// keep their upstream order.
pub fn sort_schedule(games: &mut [GameRecord]) {
    games.sort_by(|a, b| {
        let ka = (a.date, a.tipoff_local.is_none(), a.tipoff_local.as_deref());
        let kb = (b.date, b.tipoff_local.is_none(), b.tipoff_local.as_deref());
        ka.cmp(&kb)
    });
}

/// Parse an upstream UTC instant (RFC 3339, or a bare `%Y-%m-%dT%H:%M:%S`
/// taken as UTC) and render it in Madrid local time. Unparseable input is
/// treated as "no tipoff published".
fn localize_tipoff(raw: &str) -> Option<String> {
    let utc = chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .map(|naive| chrono::TimeZone::from_utc_datetime(&chrono::Utc, &naive))
        })
        .ok()?;
    Some(utc.with_timezone(&Madrid).format("%Y-%m-%d %H:%M").to_string())
}
