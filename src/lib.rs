//! NBA schedule dashboard.
//!
//! A resilient client for the BallDontLie games API (bounded retries,
//! exponential backoff, cursor pagination), a TTL cache over collected
//! schedules, and an axum dashboard that renders the schedule with status
//! filters and CSV export.

pub mod balldontlie;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod model;
