use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Europe::Madrid;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::balldontlie::BallDontLie;
use crate::cache::ScheduleCache;
use crate::export::{csv_filename, schedule_to_csv};
use crate::model::game::GameRecord;

/// Shared state behind every route.
pub struct AppState {
    pub client: Arc<BallDontLie>,
    pub cache: Arc<ScheduleCache>,
    pub per_page: u32,
}

/// Query string accepted by `/api/games` and `/games.csv`.
#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub only_live: bool,
    #[serde(default)]
    pub only_final: bool,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub games: Vec<GameRecord>,
    pub total: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/games", get(games_json))
        .route("/games.csv", get(games_csv))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Serve the dashboard page with the current week (Madrid time) prefilled.
async fn index() -> Html<String> {
    let today = Utc::now().with_timezone(&Madrid).date_naive();
    let (start, end) = week_bounds(today);
    let page = DASHBOARD_HTML
        .replace("{{start_date}}", &start.to_string())
        .replace("{{end_date}}", &end.to_string());
    Html(page)
}

async fn games_json(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<ScheduleResponse>, (StatusCode, String)> {
    let games = load_schedule(&state, &query).await?;
    let total = games.len();
    Ok(Json(ScheduleResponse { games, total }))
}

async fn games_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScheduleQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let games = load_schedule(&state, &query).await?;
    let body = schedule_to_csv(&games).map_err(|e| {
        error!(error = %e, "csv rendering failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to render csv".to_string(),
        )
    })?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                csv_filename(query.start_date, query.end_date)
            ),
        ),
    ];
    Ok((headers, body))
}

/// Validate the range, collect the schedule on a blocking thread, apply the
/// status filters.
async fn load_schedule(
    state: &Arc<AppState>,
    query: &ScheduleQuery,
) -> Result<Vec<GameRecord>, (StatusCode, String)> {
    if query.start_date > query.end_date {
        return Err((
            StatusCode::BAD_REQUEST,
            "Start date must be <= End date.".to_string(),
        ));
    }

    let client = state.client.clone();
    let cache = state.cache.clone();
    let (start, end, per_page) = (query.start_date, query.end_date, state.per_page);

    // The client is blocking by design; keep it off the async workers.
    let games =
        tokio::task::spawn_blocking(move || client.fetch_games_cached(&cache, start, end, per_page))
            .await
            .map_err(|e| {
                error!(error = %e, "schedule task failed to run");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            })?
            .map_err(|e| {
                error!(error = %e, "failed to collect schedule");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Failed to fetch games: {e}"),
                )
            })?;

    Ok(filter_games(games, query.only_live, query.only_final))
}

/// Narrow the schedule by status. Both filters at once keep only games that
/// satisfy both, which in practice returns nothing.
pub fn filter_games(games: Vec<GameRecord>, only_live: bool, only_final: bool) -> Vec<GameRecord> {
    games
        .into_iter()
        .filter(|game| {
            let status = game.status.to_lowercase();
            (!only_live || status.contains("qtr") || status.contains("half"))
                && (!only_final || status.contains("final"))
        })
        .collect()
}

/// Monday through Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = day - Duration::days(day.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>NBA Games</title>
<style>
  :root {
    --bg: #0f1115;
    --panel: #181b22;
    --border: #272b35;
    --text: #e8eaf0;
    --muted: #8b92a5;
    --accent: #e05b3d;
    --live: #3dd68c;
  }
  * { box-sizing: border-box; }
  body {
    margin: 0;
    background: var(--bg);
    color: var(--text);
    font-family: 'Segoe UI', system-ui, sans-serif;
  }
  .container { max-width: 1100px; margin: 0 auto; padding: 24px 16px 48px; }
  h1 { margin: 0 0 4px; font-size: 1.5rem; }
  .subtitle { color: var(--muted); margin: 0 0 20px; font-size: 0.9rem; }
  .cards { display: flex; gap: 12px; flex-wrap: wrap; margin-bottom: 20px; }
  .card {
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 10px;
    padding: 12px 18px;
    min-width: 150px;
  }
  .card .label { color: var(--muted); font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.06em; }
  .card .value { font-size: 1.3rem; font-weight: 600; margin-top: 2px; }
  .controls {
    display: flex;
    gap: 14px;
    align-items: end;
    flex-wrap: wrap;
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 10px;
    padding: 14px 16px;
    margin-bottom: 16px;
  }
  .field { display: flex; flex-direction: column; gap: 4px; }
  .field label { color: var(--muted); font-size: 0.8rem; }
  input[type=date] {
    background: var(--bg);
    color: var(--text);
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 6px 8px;
  }
  .checks { display: flex; gap: 16px; padding-bottom: 6px; }
  .checks label { color: var(--text); font-size: 0.85rem; display: flex; gap: 6px; align-items: center; }
  button {
    background: var(--accent);
    color: #fff;
    border: none;
    border-radius: 6px;
    padding: 8px 18px;
    font-size: 0.9rem;
    cursor: pointer;
  }
  button:hover { filter: brightness(1.1); }
  a.csv {
    color: var(--accent);
    font-size: 0.85rem;
    text-decoration: none;
    padding-bottom: 8px;
  }
  a.csv:hover { text-decoration: underline; }
  .error {
    display: none;
    background: #3a1d1d;
    border: 1px solid #5c2b2b;
    color: #f0b4b4;
    border-radius: 8px;
    padding: 10px 14px;
    margin-bottom: 16px;
    font-size: 0.9rem;
  }
  table { width: 100%; border-collapse: collapse; background: var(--panel); border-radius: 10px; overflow: hidden; }
  th, td { padding: 9px 12px; text-align: left; font-size: 0.88rem; }
  th { background: #1d212b; color: var(--muted); font-weight: 600; font-size: 0.78rem; text-transform: uppercase; letter-spacing: 0.05em; }
  tr { border-bottom: 1px solid var(--border); }
  tr:last-child { border-bottom: none; }
  td.score { font-variant-numeric: tabular-nums; }
  .status { font-size: 0.8rem; }
  .status.live { color: var(--live); font-weight: 600; }
  .status.final { color: var(--muted); }
  .empty { color: var(--muted); text-align: center; padding: 28px 0; }
</style>
</head>
<body>
<div class="container">
  <h1>NBA Games</h1>
  <p class="subtitle">Schedule and scores from the BallDontLie API, tipoffs in Madrid time.</p>

  <div class="cards">
    <div class="card"><div class="label">Games</div><div class="value" id="stat-total">&ndash;</div></div>
    <div class="card"><div class="label">Range</div><div class="value" id="stat-range">&ndash;</div></div>
  </div>

  <div class="controls">
    <div class="field">
      <label for="start">Start date</label>
      <input type="date" id="start" value="{{start_date}}">
    </div>
    <div class="field">
      <label for="end">End date</label>
      <input type="date" id="end" value="{{end_date}}">
    </div>
    <div class="checks">
      <label><input type="checkbox" id="only-live"> Only live / in-progress</label>
      <label><input type="checkbox" id="only-final"> Only finals</label>
    </div>
    <button id="apply">Apply</button>
    <a class="csv" id="csv-link" href="#">Download CSV</a>
  </div>

  <div class="error" id="error"></div>

  <table>
    <thead>
      <tr>
        <th>Date</th><th>Tipoff (Madrid)</th><th>Matchup</th><th>Status</th>
        <th>Visitor</th><th>Home</th><th>Postseason</th>
      </tr>
    </thead>
    <tbody id="rows"><tr><td colspan="7" class="empty">Loading&hellip;</td></tr></tbody>
  </table>
</div>

<script>
  const startInput = document.getElementById('start');
  const endInput = document.getElementById('end');
  const liveBox = document.getElementById('only-live');
  const finalBox = document.getElementById('only-final');
  const errorBanner = document.getElementById('error');
  const rows = document.getElementById('rows');

  function esc(value) {
    return String(value).replace(/[&<>"]/g, c =>
      ({'&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;'}[c]));
  }

  function queryString() {
    return new URLSearchParams({
      start_date: startInput.value,
      end_date: endInput.value,
      only_live: liveBox.checked,
      only_final: finalBox.checked,
    }).toString();
  }

  function statusClass(status) {
    const s = status.toLowerCase();
    if (s.includes('qtr') || s.includes('half')) return 'status live';
    if (s.includes('final')) return 'status final';
    return 'status';
  }

  function render(games) {
    if (games.length === 0) {
      rows.innerHTML = '<tr><td colspan="7" class="empty">No games returned for this date range.</td></tr>';
      return;
    }
    rows.innerHTML = games.map(g => `
      <tr>
        <td>${esc(g.date)}</td>
        <td>${esc(g.tipoff_local ?? '')}</td>
        <td>${esc(g.matchup)}</td>
        <td><span class="${statusClass(g.status)}">${esc(g.status)}</span></td>
        <td class="score">${esc(g['visitor_team.abbreviation'])} ${esc(g.visitor_team_score)}</td>
        <td class="score">${esc(g['home_team.abbreviation'])} ${esc(g.home_team_score)}</td>
        <td>${g.postseason ? 'Yes' : 'No'}</td>
      </tr>`).join('');
  }

  async function refresh() {
    errorBanner.style.display = 'none';
    const qs = queryString();
    document.getElementById('csv-link').href = '/games.csv?' + qs;
    document.getElementById('stat-range').textContent =
      startInput.value + ' to ' + endInput.value;
    try {
      const resp = await fetch('/api/games?' + qs);
      if (!resp.ok) {
        throw new Error(await resp.text());
      }
      const data = await resp.json();
      document.getElementById('stat-total').textContent = data.total;
      render(data.games);
    } catch (err) {
      errorBanner.textContent = err.message;
      errorBanner.style.display = 'block';
      rows.innerHTML = '<tr><td colspan="7" class="empty">No data.</td></tr>';
      document.getElementById('stat-total').textContent = '0';
    }
  }

  document.getElementById('apply').addEventListener('click', refresh);
  liveBox.addEventListener('change', refresh);
  finalBox.addEventListener('change', refresh);
  refresh();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(id: i64, status: &str) -> GameRecord {
        GameRecord {
            id,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            tipoff_local: None,
            status: status.to_string(),
            postseason: false,
            visitor_abbreviation: "BOS".to_string(),
            visitor_team_score: 0,
            home_abbreviation: "LAL".to_string(),
            home_team_score: 0,
            matchup: "Boston Celtics @ Los Angeles Lakers".to_string(),
        }
    }

    fn all_statuses() -> Vec<GameRecord> {
        vec![
            with_status(1, "1st Qtr"),
            with_status(2, "Halftime"),
            with_status(3, "Final"),
            with_status(4, "2024-03-01T23:00:00Z"),
        ]
    }

    #[test]
    fn live_filter_keeps_quarters_and_halftime() {
        let kept = filter_games(all_statuses(), true, false);
        let ids: Vec<i64> = kept.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn final_filter_matches_case_insensitively() {
        let games = vec![with_status(1, "FINAL"), with_status(2, "1st Qtr")];
        let kept = filter_games(games, false, true);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, 1);
    }

    #[test]
    fn combined_filters_narrow_to_the_intersection() {
        assert!(filter_games(all_statuses(), true, true).is_empty());
    }

    #[test]
    fn no_filters_pass_everything_through() {
        assert_eq!(filter_games(all_statuses(), false, false).len(), 4);
    }

    #[test]
    fn week_runs_monday_through_sunday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let (start, end) = week_bounds(wednesday);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

        // Monday and Sunday stay inside their own week.
        assert_eq!(week_bounds(start), (start, end));
        assert_eq!(week_bounds(end), (start, end));
    }

    #[test]
    fn query_filters_default_to_off() {
        let query: ScheduleQuery = serde_json::from_value(serde_json::json!({
            "start_date": "2024-03-01",
            "end_date": "2024-03-07",
        }))
        .unwrap();
        assert!(!query.only_live);
        assert!(!query.only_final);
    }

    #[test]
    fn page_template_carries_the_range_placeholders() {
        assert!(DASHBOARD_HTML.contains("{{start_date}}"));
        assert!(DASHBOARD_HTML.contains("{{end_date}}"));
        assert!(DASHBOARD_HTML.contains("/api/games"));
        assert!(DASHBOARD_HTML.contains("/games.csv"));
    }
}
