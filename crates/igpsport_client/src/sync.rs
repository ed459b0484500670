//! Sync loop for a single export format.
//!
//! The runner logs in when no token is held, then walks the activity list
//! page by page, resolving and saving each ride in the order the service
//! returns them. The first failure ends the run for that format; nothing is
//! retried and later rows or pages are not attempted.

use crate::{ActivityApi, ActivityRow, FileSink, IgpsportError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure of one sync run, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("login failed: {0}")]
    Login(#[source] IgpsportError),
    #[error("listing page {page} failed: {source}")]
    List { page: i64, source: IgpsportError },
    #[error("resolving download url for ride {ride_id} failed: {source}")]
    Resolve { ride_id: i64, source: IgpsportError },
    #[error("saving ride {ride_id} failed: {source}")]
    Save { ride_id: i64, source: IgpsportError },
}

impl SyncError {
    /// The underlying client error, as returned by the failing call.
    pub fn inner(&self) -> &IgpsportError {
        match self {
            Self::Login(e) => e,
            Self::List { source, .. }
            | Self::Resolve { source, .. }
            | Self::Save { source, .. } => source,
        }
    }

    pub fn into_inner(self) -> IgpsportError {
        match self {
            Self::Login(e) => e,
            Self::List { source, .. }
            | Self::Resolve { source, .. }
            | Self::Save { source, .. } => source,
        }
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub format: String,
    pub pages: u64,
    pub files: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SyncState {
    NeedLogin,
    Ready,
    Paginating { page: i64 },
    Done,
}

/// Drives one format's sync over an [`ActivityApi`] and a [`FileSink`].
///
/// The API is borrowed mutably so a login performed here is kept for later
/// runs against the same client.
pub struct SyncRunner<'a, A: ?Sized, S: ?Sized> {
    api: &'a mut A,
    sink: &'a S,
}

impl<'a, A, S> SyncRunner<'a, A, S>
where
    A: ActivityApi + ?Sized,
    S: FileSink + ?Sized,
{
    pub fn new(api: &'a mut A, sink: &'a S) -> Self {
        Self { api, sink }
    }

    pub async fn run(&mut self, format: &str) -> Result<SyncReport, SyncError> {
        let result = self.drive(format).await;
        match &result {
            Ok(report) => info!(
                format,
                pages = report.pages,
                files = report.files.len(),
                "sync finished"
            ),
            Err(e) => {
                metrics::counter!("igpsport_sync_failures_total", "format" => format.to_owned())
                    .increment(1);
                warn!(format, error = %e, "sync aborted");
            }
        }
        result
    }

    async fn drive(&mut self, format: &str) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport {
            format: format.to_owned(),
            ..SyncReport::default()
        };
        let mut state = SyncState::NeedLogin;
        loop {
            debug!(format, ?state, "sync step");
            state = match state {
                SyncState::NeedLogin => {
                    if !self.api.has_token() {
                        info!(format, "no session token, logging in");
                        self.api.login().await.map_err(SyncError::Login)?;
                    }
                    SyncState::Ready
                }
                SyncState::Ready => SyncState::Paginating { page: 1 },
                SyncState::Paginating { page } => {
                    let listing = self
                        .api
                        .list_activities(page, format)
                        .await
                        .map_err(|source| SyncError::List { page, source })?;
                    report.pages += 1;
                    metrics::counter!("igpsport_pages_fetched_total", "format" => format.to_owned())
                        .increment(1);
                    info!(
                        format,
                        page,
                        total_page = listing.total_page,
                        total_rows = listing.total_rows,
                        rows = listing.rows.len(),
                        "fetched activity page"
                    );

                    for row in &listing.rows {
                        let path = self.sync_row(row, format).await?;
                        report.files.push(path);
                    }

                    // The server's page_no is not trusted; our own counter decides.
                    let next = page + 1;
                    if next > listing.total_page {
                        SyncState::Done
                    } else {
                        SyncState::Paginating { page: next }
                    }
                }
                SyncState::Done => return Ok(report),
            };
        }
    }

    async fn sync_row(&self, row: &ActivityRow, format: &str) -> Result<PathBuf, SyncError> {
        let ride_id = row.ride_id;
        let url = self
            .api
            .download_url(ride_id)
            .await
            .map_err(|source| SyncError::Resolve { ride_id, source })?;
        let path = self
            .sink
            .save(&url, &ride_id.to_string(), format)
            .await
            .map_err(|source| SyncError::Save { ride_id, source })?;
        metrics::counter!("igpsport_files_saved_total", "format" => format.to_owned()).increment(1);
        debug!(ride_id, title = %row.title, path = %path.display(), "ride saved");
        Ok(path)
    }
}
