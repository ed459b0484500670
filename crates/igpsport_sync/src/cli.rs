//! Command-line flags and the end-of-run summary.

use clap::{CommandFactory, Parser};
use igpsport_client::config::DEFAULT_BASE_URL;
use igpsport_client::{Config, SyncError};
use secrecy::SecretString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "igpsport-sync")]
#[command(version)]
#[command(about = "Download every iGPSPORT activity as fit or gpx files", long_about = None)]
pub struct Cli {
    /// igpsport phone number
    #[arg(long, env = "IGPSPORT_USERNAME", default_value = "")]
    pub username: String,

    /// igpsport password
    #[arg(long, env = "IGPSPORT_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Authorization token for downloading data; skips login
    #[arg(long, env = "IGPSPORT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Get all igpsport data as gpx and download
    #[arg(long)]
    pub with_gpx: bool,

    /// Get all igpsport data as tcx and download
    #[arg(long)]
    pub with_tcx: bool,

    /// Get all igpsport data as fit and download
    #[arg(long)]
    pub with_fit: bool,

    /// Service base URL
    #[arg(long, env = "IGPSPORT_BASE_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    pub base_url: String,

    /// Folder that receives FIT_OUT, GPX_OUT and TCX_OUT (default: current directory)
    #[arg(long, env = "IGPSPORT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Formats requested for this run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub fit: bool,
    pub gpx: bool,
    pub tcx: bool,
}

impl Selection {
    /// Formats that are actually synced, in run order. tcx is never synced.
    pub fn sync_formats(self) -> Vec<&'static str> {
        let mut formats = Vec::new();
        if self.fit {
            formats.push("fit");
        }
        if self.gpx {
            formats.push("gpx");
        }
        formats
    }
}

impl Cli {
    /// With no format flag at all, tcx is selected.
    pub fn selection(&self) -> Selection {
        let none = !self.with_fit && !self.with_gpx && !self.with_tcx;
        Selection {
            fit: self.with_fit,
            gpx: self.with_gpx,
            tcx: self.with_tcx || none,
        }
    }

    pub fn config(&self) -> Config {
        let config = Config::new(
            self.username.clone(),
            SecretString::new(self.password.clone().into()),
        )
        .with_token(self.token.clone())
        .with_base_url(&self.base_url);
        match &self.output_dir {
            Some(dir) => config.with_output_root(dir.clone()),
            None => config,
        }
    }
}

pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

/// How the process ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    Done,
    MissingCredentials,
    TcxUnsupported,
    SetupFailed,
    SyncFailed,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Done => 0,
            Exit::MissingCredentials | Exit::TcxUnsupported | Exit::SetupFailed => 1,
            Exit::SyncFailed => 2,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Terminal error of one format's sync.
#[derive(Debug)]
pub struct Failure {
    pub format: &'static str,
    pub error: SyncError,
}

/// Print the run summary and pick the exit status.
///
/// A selected tcx wins over sync failures: the usage is printed and the
/// failures of the other formats are not reported.
pub fn summarize(
    selection: Selection,
    failures: &[Failure],
    out: &mut impl Write,
    err: &mut impl Write,
) -> std::io::Result<Exit> {
    if selection.tcx {
        writeln!(err, "{}", usage())?;
        writeln!(out, "type empty or tcx unsupported yet")?;
        return Ok(Exit::TcxUnsupported);
    }
    if !failures.is_empty() {
        for failure in failures {
            writeln!(err, "error: {}: {}", failure.format, failure.error)?;
        }
        return Ok(Exit::SyncFailed);
    }
    writeln!(out, "done")?;
    Ok(Exit::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use igpsport_client::IgpsportError;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["igpsport-sync"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse")
    }

    fn failure(format: &'static str) -> Failure {
        Failure {
            format,
            error: SyncError::Login(IgpsportError::EmptyToken),
        }
    }

    #[test]
    fn no_format_flag_selects_tcx_only() {
        let cli = parse(&["--username", "u", "--password", "p"]);
        let sel = cli.selection();
        assert_eq!(
            sel,
            Selection {
                fit: false,
                gpx: false,
                tcx: true
            }
        );
        assert!(sel.sync_formats().is_empty());
    }

    #[test]
    fn fit_runs_before_gpx() {
        let cli = parse(&["--with-gpx", "--with-fit"]);
        assert_eq!(cli.selection().sync_formats(), vec!["fit", "gpx"]);
        assert!(!cli.selection().tcx);
    }

    #[test]
    fn credentials_must_both_be_present() {
        assert!(!parse(&["--username", "u"]).config().has_credentials());
        assert!(!parse(&["--password", "p"]).config().has_credentials());
        assert!(
            parse(&["--username", "u", "--password", "p"])
                .config()
                .has_credentials()
        );
    }

    #[test]
    fn config_carries_token_and_output_dir() {
        let cli = parse(&[
            "--username",
            "u",
            "--password",
            "p",
            "--token",
            "abc",
            "--output-dir",
            "/tmp/rides",
            "--base-url",
            "http://localhost:1234/service/",
        ]);
        let cfg = cli.config();
        assert!(cfg.token.is_some());
        assert_eq!(cfg.output.root, PathBuf::from("/tmp/rides"));
        assert_eq!(cfg.endpoints.base_url(), "http://localhost:1234/service");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Exit::Done.code(), 0);
        assert_eq!(Exit::MissingCredentials.code(), 1);
        assert_eq!(Exit::TcxUnsupported.code(), 1);
        assert_eq!(Exit::SetupFailed.code(), 1);
        assert_eq!(Exit::SyncFailed.code(), 2);
    }

    #[test]
    fn summarize_reports_every_failure() {
        let sel = Selection {
            fit: true,
            gpx: true,
            tcx: false,
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let exit = summarize(sel, &[failure("fit"), failure("gpx")], &mut out, &mut err).unwrap();
        assert_eq!(exit, Exit::SyncFailed);
        let err = String::from_utf8(err).unwrap();
        assert_eq!(err.lines().count(), 2);
        assert!(err.starts_with("error: fit: login failed"));
        assert!(err.contains("error: gpx: "));
        assert!(out.is_empty());
    }

    #[test]
    fn summarize_tcx_wins_over_failures() {
        let sel = Selection {
            fit: true,
            gpx: false,
            tcx: true,
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let exit = summarize(sel, &[failure("fit")], &mut out, &mut err).unwrap();
        assert_eq!(exit, Exit::TcxUnsupported);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "type empty or tcx unsupported yet\n"
        );
        assert!(!String::from_utf8(err).unwrap().contains("error: fit"));
    }

    #[test]
    fn summarize_success_prints_done() {
        let sel = Selection {
            fit: true,
            gpx: false,
            tcx: false,
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let exit = summarize(sel, &[], &mut out, &mut err).unwrap();
        assert_eq!(exit, Exit::Done);
        assert_eq!(String::from_utf8(out).unwrap(), "done\n");
        assert!(err.is_empty());
    }
}
