use chrono::NaiveDate;
use csv::WriterBuilder;

use crate::error::ExportError;
use crate::model::game::GameRecord;

/// Column order of the export; matches [`GameRecord`] field order.
pub const CSV_HEADER: [&str; 10] = [
    "id",
    "date",
    "tipoff_local",
    "status",
    "postseason",
    "visitor_team.abbreviation",
    "visitor_team_score",
    "home_team.abbreviation",
    "home_team_score",
    "matchup",
];

/// Render the schedule as CSV in table order. The header row is always
/// written, even for an empty schedule.
pub fn schedule_to_csv(games: &[GameRecord]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for game in games {
        writer.serialize(game)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Attachment filename offered for a date range.
pub fn csv_filename(start_date: NaiveDate, end_date: NaiveDate) -> String {
    format!("games_{start_date}_{end_date}.csv")
}
