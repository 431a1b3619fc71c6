use std::time::Duration;

use crate::error::{AppError, Result};

pub const JOLPICA_API_URL: &str = "https://api.jolpi.ca/ergast/f1";
pub const OPENF1_API_URL: &str = "https://api.openf1.org/v1";

/// Page size used when a resource does not dictate one.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Lap records are high volume; larger pages bound the number of round-trips.
pub const LAP_PAGE_SIZE: u32 = 80;

/// A full season's standings fit in one page at this size.
pub const STANDINGS_PAGE_SIZE: u32 = 100;

/// Default number of requests the batch fetcher keeps in flight per group.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 3;

/// Per-slot dispatch stagger (milliseconds) inside a batch group.
pub const DEFAULT_DELAY_STEP_MS: u64 = 100;
pub const LAP_DELAY_STEP_MS: u64 = 150;

/// Size of the global fastest-lap board.
pub const FASTEST_LAPS_LIMIT: usize = 20;

/// Meetings whose name contains this (case-insensitive) are not race weekends.
pub const NON_RACE_MEETING_KEYWORD: &str = "testing";

/// A race counts as "next" until this long after its scheduled start.
pub const RACE_DURATION_HOURS: i64 = 2;

/// Constructor id used when a timing's driver cannot be resolved.
pub const UNKNOWN_CONSTRUCTOR: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct Config {
    pub jolpica_api_url: String,
    pub openf1_api_url: String,
    /// Base URL of the pit-stop provider (DHL_API_BASE)
    pub dhl_api_base: String,
    /// Resource id of the per-event pit-stop chart (DHL_PITSTOP_EVENT_ID)
    pub dhl_pitstop_event_id: String,
    /// Resource id of the seed response carrying `{sort, eventId}` (DHL_AVG_PITSTOP_ID)
    pub dhl_avg_pitstop_id: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Deadline applied to every upstream request (REQUEST_TIMEOUT_SECS)
    pub request_timeout: Duration,
    /// Batch fetcher concurrency width (FETCH_CONCURRENCY)
    pub fetch_concurrency: usize,
    /// Width used to bound the pit-stop event fan-out (PITSTOP_CONCURRENCY)
    pub pitstop_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            jolpica_api_url: std::env::var("JOLPICA_API_URL")
                .unwrap_or_else(|_| JOLPICA_API_URL.to_string()),
            openf1_api_url: std::env::var("OPENF1_API_URL")
                .unwrap_or_else(|_| OPENF1_API_URL.to_string()),
            dhl_api_base: std::env::var("DHL_API_BASE").unwrap_or_default(),
            dhl_pitstop_event_id: std::env::var("DHL_PITSTOP_EVENT_ID").unwrap_or_default(),
            dhl_avg_pitstop_id: std::env::var("DHL_AVG_PITSTOP_ID").unwrap_or_default(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "paddock.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse::<u64>()
                    .unwrap_or(20),
            ),
            fetch_concurrency: std::env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_FETCH_CONCURRENCY.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_FETCH_CONCURRENCY)
                .max(1),
            pitstop_concurrency: std::env::var("PITSTOP_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .unwrap_or(4)
                .max(1),
        })
    }
}
