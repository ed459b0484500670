//! Export client for the iGPSPORT cycling service.
//!
//! The crate is split along the path an activity file takes: the
//! [`http_client`] logs in, pages through activities and resolves signed
//! download URLs, the [`sink`] stores the file under a per-format folder, and
//! [`sync`] drives the whole loop for one format.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use thiserror::Error;

pub mod config;
pub mod format;
pub mod http_client;
pub mod sink;
pub mod sync;

pub use config::{Config, Endpoints, OutputLayout};
pub use format::ExportFormat;
pub use http_client::ReqwestIgpsportClient;
pub use sink::HttpFileSink;
pub use sync::{SyncError, SyncReport, SyncRunner};

#[derive(Debug, Error)]
pub enum IgpsportError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{status_line}")]
    Status { status: u16, status_line: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("access token missing from login response")]
    EmptyToken,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl IgpsportError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            status_line: status.to_string(),
        }
    }
}

/// One row of the activity list.
///
/// Only `ride_id` drives the sync; everything else is carried as-is.
/// Missing or `null` fields read as their zero value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityRow {
    #[serde(deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ride_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub exercise_type: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ride_distance: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_moving_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_speed: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub data_status: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub error_type: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_status: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub label: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub is_open: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub un_read: bool,
    pub icon: Option<String>,
}

/// One page of the activity list. `page_no` is echoed by the server and is
/// not used for pagination decisions.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityPage {
    #[serde(deserialize_with = "null_as_default")]
    pub page_no: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub page_size: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_page: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_rows: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub rows: Vec<ActivityRow>,
}

/// Reads a JSON `null` as the field's zero value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string().into()),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Session-bound calls against the activity service.
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// Whether a bearer token is currently held.
    fn has_token(&self) -> bool;

    /// Exchange the configured credentials for a bearer token.
    async fn login(&mut self) -> Result<(), IgpsportError>;

    /// Fetch one page (1-based) of activities exported as `format`.
    async fn list_activities(
        &self,
        page_no: i64,
        format: &str,
    ) -> Result<ActivityPage, IgpsportError>;

    /// Resolve the signed download URL for a ride.
    async fn download_url(&self, ride_id: i64) -> Result<String, IgpsportError>;
}

/// Destination for downloaded activity files.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Fetch `url` and store it as `{stem}.{format}` in the folder for
    /// `format`, returning the written path.
    async fn save(&self, url: &str, stem: &str, format: &str) -> Result<PathBuf, IgpsportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_id_accepts_number() {
        let row: ActivityRow =
            serde_json::from_value(json!({"id": 77, "rideId": 1001})).expect("row");
        assert_eq!(row.id.as_deref(), Some("77"));
        assert_eq!(row.ride_id, 1001);
    }

    #[test]
    fn row_id_rejects_object() {
        let res: Result<ActivityRow, _> = serde_json::from_value(json!({"id": {"x": 1}}));
        assert!(res.is_err());
    }

    #[test]
    fn page_missing_fields_default() {
        let page: ActivityPage = serde_json::from_value(json!({"rows": [{"rideId": 5}]})).unwrap();
        assert_eq!(page.total_page, 0);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].title, "");
    }

    #[test]
    fn null_passthrough_fields_read_as_zero() {
        let page: ActivityPage = serde_json::from_value(json!({
            "pageNo": null,
            "totalPage": 1,
            "rows": [{
                "id": "a",
                "rideId": 7,
                "title": null,
                "startTime": "x",
                "rideDistance": null,
                "unRead": null,
                "label": null,
                "icon": null
            }]
        }))
        .expect("page");
        assert_eq!(page.page_no, 0);
        let row = &page.rows[0];
        assert_eq!(row.ride_id, 7);
        assert_eq!(row.title, "");
        assert_eq!(row.ride_distance, 0.0);
        assert!(!row.un_read);
        assert_eq!(row.icon, None);
    }

    #[test]
    fn null_rows_read_as_empty_page() {
        let page: ActivityPage =
            serde_json::from_value(json!({"totalPage": 0, "rows": null})).expect("page");
        assert!(page.rows.is_empty());
    }

    #[test]
    fn row_parses_full_payload() {
        let row: ActivityRow = serde_json::from_value(json!({
            "id": "abc",
            "rideId": 42,
            "exerciseType": 1,
            "title": "Morning ride",
            "startTime": "2024-05-01 07:30:00",
            "rideDistance": 31250.5,
            "totalMovingTime": 3600.0,
            "avgSpeed": 28.4,
            "dataStatus": 1,
            "errorType": 0,
            "analysisStatus": 2,
            "label": 0,
            "isOpen": 1,
            "unRead": true,
            "icon": "road"
        }))
        .unwrap();
        assert_eq!(row.title, "Morning ride");
        assert_eq!(row.ride_distance, 31250.5);
        assert!(row.un_read);
    }

    #[test]
    fn status_error_displays_status_line() {
        let err = IgpsportError::from_status(reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "401 Unauthorized");
    }
}
