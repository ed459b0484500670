//! Export format selection shared by the list request and the file sink.

use crate::config::OutputLayout;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Fit,
    Gpx,
    Tcx,
}

impl ExportFormat {
    /// Map a format name to its kind. Unknown names fall back to tcx, both
    /// for the request code and for the output folder.
    pub fn from_name(name: &str) -> Self {
        match name {
            "fit" => Self::Fit,
            "gpx" => Self::Gpx,
            _ => Self::Tcx,
        }
    }

    /// The `reqType` value the list endpoint expects.
    pub fn request_code(self) -> u8 {
        match self {
            Self::Fit => 0,
            Self::Gpx => 1,
            Self::Tcx => 2,
        }
    }

    pub fn folder(self, layout: &OutputLayout) -> PathBuf {
        let dir = match self {
            Self::Fit => &layout.fit_dir,
            Self::Gpx => &layout.gpx_dir,
            Self::Tcx => &layout.tcx_dir,
        };
        layout.root.join(dir)
    }
}
