//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// What to do when a photo's destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExistsPolicy {
    /// Ask on the terminal.
    Ask,
    /// Replace the existing file.
    Overwrite,
    /// Save under the first free `name(n).ext`.
    Rename,
    /// Leave the existing file and move on.
    Skip,
}

/// What to do when a photo download fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ErrorPolicy {
    /// Ask on the terminal.
    Ask,
    /// Try the photo again.
    Retry,
    /// Skip the photo.
    Ignore,
    /// Stop the whole album.
    Abort,
}

/// Download every photo of a web photo album.
///
/// Fetches the album page, reads the photo list embedded in it and saves the
/// photos one by one into the output directory.
#[derive(Parser, Debug)]
#[command(name = "album-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Album page URL
    pub url: String,

    /// Directory the photos are saved to (default: config value, else current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Read timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// What to do when a photo file already exists
    #[arg(long, value_enum)]
    pub on_exists: Option<ExistsPolicy>,

    /// What to do when a photo download fails
    #[arg(long, value_enum)]
    pub on_error: Option<ErrorPolicy>,

    /// Fail (exit code 2) when the album page cannot be parsed
    #[arg(long)]
    pub strict: bool,

    /// Fetch the page and list the photo URLs without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://photos.example.com/album/1";

    #[test]
    fn test_cli_minimal_args_parse_successfully() {
        let args = Args::try_parse_from(["album-downloader", URL]).unwrap();
        assert_eq!(args.url, URL);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.output_dir.is_none());
        assert!(args.on_exists.is_none());
        assert!(args.on_error.is_none());
        assert!(!args.strict && !args.dry_run && !args.json);
    }

    #[test]
    fn test_cli_url_is_required() {
        let err = Args::try_parse_from(["album-downloader"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["album-downloader", "-vv", URL]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["album-downloader", "--verbose", URL]).unwrap();
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["album-downloader", "-q", URL]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["album-downloader", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["album-downloader", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_output_dir_short_and_long() {
        let args = Args::try_parse_from(["album-downloader", "-o", "pics", URL]).unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("pics")));

        let args = Args::try_parse_from(["album-downloader", "--output-dir", "/tmp/p", URL]).unwrap();
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/p")));
    }

    #[test]
    fn test_cli_policies_parse() {
        let args = Args::try_parse_from([
            "album-downloader",
            "--on-exists",
            "rename",
            "--on-error",
            "ignore",
            URL,
        ])
        .unwrap();
        assert_eq!(args.on_exists, Some(ExistsPolicy::Rename));
        assert_eq!(args.on_error, Some(ErrorPolicy::Ignore));
    }

    #[test]
    fn test_cli_unknown_policy_rejected() {
        let err = Args::try_parse_from(["album-downloader", "--on-exists", "merge", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_cli_timeout_zero_rejected() {
        let err =
            Args::try_parse_from(["album-downloader", "--connect-timeout", "0", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_timeout_over_max_rejected() {
        let err =
            Args::try_parse_from(["album-downloader", "--read-timeout", "3601", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_mode_flags() {
        let args =
            Args::try_parse_from(["album-downloader", "--strict", "--dry-run", "--json", URL])
                .unwrap();
        assert!(args.strict);
        assert!(args.dry_run);
        assert!(args.json);
    }
}
