//! CLI argument definitions for `wws`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use wws_cli::output::DEFAULT_LIST_SEPARATOR;
use wws_ingest::DEFAULT_CONCURRENCY;

#[derive(Parser)]
#[command(
    name = "wws",
    version,
    about = "Workday Web Services extraction - turn SOAP responses into flat tables",
    long_about = "Turn Workday Web Services SOAP responses into flat tables.\n\n\
                  Columns are described by tag expressions; paginated responses\n\
                  are fetched to disk and extracted to CSV or JSON."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract a table from saved response pages.
    Extract(ExtractArgs),

    /// Parse tag expressions and show the columns they produce.
    Tags(TagsArgs),

    /// Fetch every page of a paginated request.
    Fetch(FetchArgs),

    /// Write dictionary-style JSON dumps of responses.
    Dump(DumpArgs),
}

/// Namespace used for qualified names.
#[derive(Args, Clone, Default)]
pub struct NamespaceArgs {
    /// Namespace prefix used in tag expressions [default: wd].
    #[arg(long = "namespace-prefix", value_name = "PREFIX")]
    pub namespace_prefix: Option<String>,

    /// Namespace URI [default: urn:com.workday/bsvc].
    #[arg(long = "namespace-uri", value_name = "URI")]
    pub namespace_uri: Option<String>,
}

/// Where the tag expressions come from. Flags override job-file values.
#[derive(Args, Clone, Default)]
pub struct JobArgs {
    /// TOML job file with `start_tag`, `tags` and `[options]`.
    #[arg(long = "job", value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Local name of the record element.
    #[arg(long = "start-tag", value_name = "NAME")]
    pub start_tag: Option<String>,

    /// Tag expression (repeatable, order matters).
    #[arg(long = "tag", value_name = "EXPR", allow_hyphen_values = true)]
    pub tags: Vec<String>,

    /// Keep multi-valued leaves in one cell instead of fanning out rows.
    #[arg(long = "allow-collections")]
    pub allow_collections: bool,

    /// Maximum length of keys produced by `@@` flattening.
    #[arg(long = "max-key-length", value_name = "N")]
    pub max_key_length: Option<usize>,

    /// Attribute read by `||` chains for the discriminator [default: type].
    #[arg(long = "discriminator", value_name = "ATTR")]
    pub discriminator: Option<String>,

    #[command(flatten)]
    pub namespace: NamespaceArgs,
}

#[derive(Parser)]
pub struct ExtractArgs {
    /// Response files or directories of `*.xml` pages.
    #[arg(value_name = "RESPONSES", required = true)]
    pub responses: Vec<PathBuf>,

    #[command(flatten)]
    pub job: JobArgs,

    /// Output file (prints a preview only when omitted).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format.
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: OutputFormatArg,

    /// Separator for multi-valued cells in CSV output.
    #[arg(long = "list-separator", value_name = "SEP", default_value = DEFAULT_LIST_SEPARATOR)]
    pub list_separator: String,

    /// Number of rows to show in the preview.
    #[arg(long = "preview", value_name = "ROWS", default_value_t = 10)]
    pub preview: usize,
}

#[derive(Parser)]
pub struct TagsArgs {
    #[command(flatten)]
    pub job: JobArgs,
}

#[derive(Parser)]
pub struct FetchArgs {
    /// Service endpoint URL.
    #[arg(long = "url", value_name = "URL")]
    pub url: String,

    /// Request body with a `{{ page }}` placeholder.
    #[arg(long = "body", value_name = "FILE")]
    pub body: PathBuf,

    /// Directory receiving `page_0001.xml`, `page_0002.xml`, ...
    #[arg(long = "out-dir", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Integration user name.
    #[arg(long = "username", env = "WWS_USERNAME", value_name = "USER")]
    pub username: String,

    /// Integration user password.
    #[arg(
        long = "password",
        env = "WWS_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD"
    )]
    pub password: String,

    /// Number of pages requested at the same time.
    #[arg(long = "concurrency", value_name = "N", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Hide the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    #[command(flatten)]
    pub namespace: NamespaceArgs,
}

#[derive(Parser)]
pub struct DumpArgs {
    /// Response files or directories of `*.xml` pages.
    #[arg(value_name = "RESPONSES", required = true)]
    pub responses: Vec<PathBuf>,

    /// Output path stem; files are written as `<STEM>_<i>.json`.
    #[arg(long = "stem", value_name = "STEM")]
    pub stem: PathBuf,

    /// Dump at most this many documents.
    #[arg(long = "max", value_name = "N")]
    pub max: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    Csv,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tags_keep_their_order_and_markers() {
        let cli = Cli::try_parse_from([
            "wws",
            "extract",
            "page.xml",
            "--start-tag",
            "Journal_Entry_Data",
            "--tag",
            "Journal_Number",
            "--tag",
            "*Journal_Entry_Line_Data",
            "--tag",
            "%Cost_Center?=type%",
            "-o",
            "out.csv",
        ])
        .expect("parse");
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(
            args.job.tags,
            vec!["Journal_Number", "*Journal_Entry_Line_Data", "%Cost_Center?=type%"]
        );
        assert_eq!(args.list_separator, "; ");
        assert!(matches!(args.format, OutputFormatArg::Csv));
    }

    #[test]
    fn fetch_reads_credentials_from_flags() {
        let result = Cli::try_parse_from([
            "wws",
            "fetch",
            "--url",
            "https://example.invalid/ccx/service/tenant/Financial_Management/v42.0",
            "--body",
            "request.xml",
            "--out-dir",
            "pages",
            "--username",
            "isu",
            "--password",
            "secret",
        ])
        .expect("parse");
        let Command::Fetch(args) = result.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(args.username, "isu");
    }
}
