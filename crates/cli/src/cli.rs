use crate::commands::key::KeyArg;
use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use restash_cache::OutputSpec;
use restash_cache_key::CacheKey;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Cache I/O or archive error exit code
pub const EXIT_CACHE: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(restash::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Cache failure while preparing, packing or restoring outputs (exit code 3)
    #[error("Cache error: {message}")]
    #[diagnostic(code(restash::cli::cache))]
    Cache {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new cache error with help text
    #[must_use]
    pub fn cache_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `restash_cache::Error` to the matching `CliError` variant.
impl From<restash_cache::Error> for CliError {
    fn from(err: restash_cache::Error) -> Self {
        match err {
            // Extract just the message to avoid "Configuration error: Cache configuration error:"
            restash_cache::Error::Configuration { message } => Self::config(message),
            restash_cache::Error::Key(key_err) => Self::config(key_err.to_string()),
            restash_cache::Error::Io {
                source,
                path,
                operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::cache_with_help(
                    format!("I/O {operation} failed{path_str}: {source}"),
                    "Check file permissions and ensure the path exists",
                )
            }
            restash_cache::Error::Archive { .. } | restash_cache::Error::Serialization { .. } => {
                Self::cache_with_help(
                    err.to_string(),
                    "The cache entry may be corrupt; delete it and re-run the task",
                )
            }
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Cache { .. } => EXIT_CACHE,
    }
}

/// Render an error to stderr with miette
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    // Ensure output is flushed before potential process exit
    let _ = io::stderr().flush();
}

#[derive(Parser, Debug)]
#[command(name = "restash")]
#[command(about = "Compute build cache keys and store or restore task outputs")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(
        long,
        global = true,
        env = "RESTASH_CACHE_DIR",
        help = "Directory holding cache entries"
    )]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Compute a cache key from typed values, in order")]
    Key {
        #[arg(
            required = true,
            value_name = "TYPE:VALUE",
            help = "Values as byte:N, int:N, long:N, double:F, bool:true|false, bytes:HEX or str:TEXT"
        )]
        values: Vec<KeyArg>,
    },
    #[command(about = "Reconcile output locations as if a cache hit were about to be restored")]
    Prepare {
        #[arg(
            short = 'o',
            long = "output",
            required = true,
            value_name = "SPEC",
            help = "Declared output as file:NAME=PATH or dir:NAME=PATH"
        )]
        outputs: Vec<OutputSpec>,
    },
    #[command(about = "Pack task outputs into the local cache")]
    Pack {
        #[arg(long, help = "Cache key (lowercase hex)")]
        key: CacheKey,
        #[arg(long, help = "Path of the task that produced the outputs")]
        task: String,
        #[arg(
            long,
            default_value_t = 0,
            help = "How long the task took, in milliseconds"
        )]
        execution_time_ms: u64,
        #[arg(
            short = 'o',
            long = "output",
            required = true,
            value_name = "SPEC",
            help = "Declared output as file:NAME=PATH or dir:NAME=PATH"
        )]
        outputs: Vec<OutputSpec>,
    },
    #[command(about = "Restore task outputs from the local cache")]
    Unpack {
        #[arg(long, help = "Cache key (lowercase hex)")]
        key: CacheKey,
        #[arg(
            short = 'o',
            long = "output",
            required = true,
            value_name = "SPEC",
            help = "Declared output as file:NAME=PATH or dir:NAME=PATH"
        )]
        outputs: Vec<OutputSpec>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use restash_cache::OutputType;

    const KEY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["restash", "key", "int:1"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Compact);
        assert!(matches!(cli.command, Commands::Key { .. }));
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["restash", "--level", "trace", "key", "int:1"]).unwrap();
        assert_eq!(cli.level, LogLevel::Trace);

        let cli = Cli::try_parse_from(["restash", "key", "int:1", "-l", "debug"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["restash", "--log-format", "json", "key", "int:1"]).unwrap();
        assert_eq!(cli.log_format, TracingFormat::Json);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = Cli::try_parse_from(["restash", "--level", "loud", "key", "int:1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["restash"]).is_err());
    }

    #[test]
    fn test_key_values_keep_order() {
        let cli = Cli::try_parse_from(["restash", "key", "str:a", "int:7", "bool:true"]).unwrap();
        let Commands::Key { values } = cli.command else {
            panic!("expected key command");
        };
        assert_eq!(
            values,
            vec![
                KeyArg::Str("a".to_string()),
                KeyArg::Int(7),
                KeyArg::Boolean(true)
            ]
        );
    }

    #[test]
    fn test_key_requires_values() {
        assert!(Cli::try_parse_from(["restash", "key"]).is_err());
        assert!(Cli::try_parse_from(["restash", "key", "float:1"]).is_err());
    }

    #[test]
    fn test_prepare_outputs() {
        let cli = Cli::try_parse_from([
            "restash",
            "prepare",
            "-o",
            "dir:classes=build/classes",
            "--output",
            "file:log=build/log.txt",
        ])
        .unwrap();
        let Commands::Prepare { outputs } = cli.command else {
            panic!("expected prepare command");
        };
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].output_type, OutputType::Directory);
        assert_eq!(outputs[1].name, "log");
    }

    #[test]
    fn test_pack_command() {
        let cli = Cli::try_parse_from([
            "restash",
            "--cache-dir",
            "/tmp/cache",
            "pack",
            "--key",
            KEY,
            "--task",
            ":app:build",
            "-o",
            "file:out=out.txt",
        ])
        .unwrap();
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/cache")));
        let Commands::Pack {
            key,
            task,
            execution_time_ms,
            outputs,
        } = cli.command
        else {
            panic!("expected pack command");
        };
        assert_eq!(key.to_hex(), KEY);
        assert_eq!(task, ":app:build");
        assert_eq!(execution_time_ms, 0);
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn test_unpack_rejects_bad_key() {
        let result = Cli::try_parse_from(["restash", "unpack", "--key", "XYZ", "-o", "file:a=b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_mapping() {
        let err: CliError = restash_cache::Error::configuration("bad").into();
        assert!(matches!(err, CliError::Config { ref message, .. } if message == "bad"));
        assert_eq!(exit_code_for(&err), EXIT_CLI);

        let err: CliError = restash_cache::Error::archive("truncated").into();
        assert!(matches!(err, CliError::Cache { .. }));
        assert_eq!(exit_code_for(&err), EXIT_CACHE);

        let err: CliError = restash_cache::Error::io(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "/cache/entry",
            "open",
        )
        .into();
        assert!(err.to_string().contains("I/O open failed on /cache/entry"));
    }
}
