use std::path::PathBuf;
use std::process::ExitCode;

use dbdesigner::core::codegen::{SqlGenerator, SyntaxError};
use dbdesigner::core::config::Config;
use dbdesigner::core::{CanvasState, Designer, DesignerError, GeneratorKind, MemoryStore, ValidationError};
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: dbdesigner <canvas.json> [-g|--generator <ORM/SQLAlchemy|mysql|sqlite>] [-o|--output <file>] [--check]";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}\n{usage}", usage = USAGE)]
    Usage(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Generator(#[from] ValidationError),

    #[error(transparent)]
    Designer(#[from] DesignerError),

    #[error("generated code does not parse: {}", .0.format_for_display())]
    Syntax(#[from] SyntaxError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Usage(_) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    canvas: Option<PathBuf>,
    generator: Option<String>,
    output: Option<PathBuf>,
    check: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, CliError> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-g" | "--generator" => {
                let tag = args.next().ok_or_else(|| CliError::Usage(format!("{arg} needs a value")))?;
                parsed.generator = Some(tag);
            }
            "-o" | "--output" => {
                let path = args.next().ok_or_else(|| CliError::Usage(format!("{arg} needs a value")))?;
                parsed.output = Some(PathBuf::from(path));
            }
            "--check" => parsed.check = true,
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') => {
                return Err(CliError::Usage(format!("unknown option '{flag}'")));
            }
            path if parsed.canvas.is_none() => parsed.canvas = Some(PathBuf::from(path)),
            extra => return Err(CliError::Usage(format!("unexpected argument '{extra}'"))),
        }
    }

    Ok(parsed)
}

async fn run(config: Config, args: Args) -> Result<(), CliError> {
    let canvas = args
        .canvas
        .or(config.canvas_path.clone())
        .ok_or_else(|| CliError::Usage("no canvas file given".into()))?;
    let kind: GeneratorKind = match &args.generator {
        Some(tag) => tag.parse()?,
        None => config.generator_kind()?,
    };

    let json = tokio::fs::read_to_string(&canvas)
        .await
        .map_err(|source| CliError::Io {
            path: canvas.clone(),
            source,
        })?;
    let state = CanvasState::from_json(&json).map_err(DesignerError::from)?;

    let mut designer = Designer::new(MemoryStore::with_state(state));
    let tables = designer.load().await?;
    tracing::info!(canvas = %canvas.display(), tables, generator = %kind, "Canvas loaded");

    let code = designer.generate(kind)?;

    if args.check {
        match kind.dialect() {
            Some(dialect) => {
                let statements = SqlGenerator::new(dialect).check(&code)?;
                tracing::info!(statements, "Generated SQL parses");
            }
            None => tracing::warn!(generator = %kind, "Nothing to check for ORM output"),
        }
    }

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &code)
                .await
                .map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!(output = %path.display(), bytes = code.len(), "Code written");
        }
        None => print!("{code}"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return e.exit_code();
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(config, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            e.exit_code()
        }
    }
}
