//! Purpose: `jsonus` CLI entry point for inspecting and editing JSON files.
//! Role: Binary crate root; parses args, drives the native surface, emits results on stdout.
//! Invariants: Every command goes through `Extension` handles, as a script would.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Editing commands hold an exclusive file lock across read-modify-write.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

use jsonus::api::{Config, Error, ErrorKind, colorize, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage).with_message(clap_error_summary(&err)),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let mut config = Config::new();
    if let Some(base_dir) = cli.base_dir {
        config = config.with_base_dir(base_dir);
    }
    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, config, color_mode)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "jsonus",
    version,
    about = "Inspect and edit JSON documents through the jsonus native surface",
    long_about = None,
    after_help = r#"EXAMPLES
  $ jsonus print cfg/players.json --indent 4
  $ jsonus get cfg/players.json score --as int
  $ jsonus set cfg/players.json name '"bot"'
  $ jsonus set cfg/players.json level 3 --as int --upsert
  $ jsonus remove cfg/players.json stale

NOTES
  - Relative paths resolve against --base-dir (default: $JSONUS_BASE_DIR, else .)
  - `set` overwrites existing keys only; pass --upsert to create them"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Directory relative paths resolve against",
        value_hint = ValueHint::DirPath
    )]
    base_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ValueKind {
    Json,
    String,
    Int,
    Int64,
    Float,
    Bool,
    Null,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print a document (indent <= 0 prints compact)")]
    Print {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
        indent: i32,
    },
    #[command(about = "Show the top-level type of a document")]
    Type {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
    },
    #[command(about = "Count top-level entries")]
    Size {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
    },
    #[command(about = "List top-level keys in document order")]
    Keys {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
    },
    #[command(about = "Check whether a top-level key exists")]
    Has {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        key: String,
    },
    #[command(about = "Read the value at a top-level key")]
    Get {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        key: String,
        #[arg(long = "as", value_enum, default_value = "json")]
        kind: ValueKind,
        #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
        indent: i32,
    },
    #[command(
        about = "Overwrite the value at a top-level key",
        long_about = r#"Overwrite the value at a top-level key.

The write is verified by reading the key back. Without --upsert the key must
already exist. With --as json (default) VALUE must be JSON text."#
    )]
    Set {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long = "as", value_enum, default_value = "json")]
        kind: ValueKind,
        #[arg(long, help = "Create the key when it is missing")]
        upsert: bool,
        #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
        indent: i32,
    },
    #[command(about = "Remove a top-level key (no-op when absent)")]
    Remove {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        key: String,
        #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
        indent: i32,
    },
    #[command(about = "Reset a document to the zero value of its type")]
    Clear {
        #[arg(value_hint = ValueHint::FilePath)]
        file: String,
        #[arg(long, default_value_t = 2, allow_negative_numbers = true)]
        indent: i32,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_json(value: &Value, indent: i32, color_mode: ColorMode) {
    let use_color = color_mode.use_color(io::stdout().is_terminal());
    println!("{}", colorize(value, indent, use_color));
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Parse => "invalid json".to_string(),
        ErrorKind::Key => "key not found".to_string(),
        ErrorKind::Type => "type mismatch".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::InvalidHandle => "invalid handle".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(key) = err.key() {
        inner.insert("key".to_string(), json!(key));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(key) = err.key() {
        lines.push(format!(
            "{} {key}",
            colorize_label("key:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
