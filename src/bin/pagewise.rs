use clap::{Parser, Subcommand, ValueEnum};
use pagewise::cli::{self as prog_cli, OutputMode};
use pagewise::{CursorCodec, PaginationConfig};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Human,
    Plain,
    Json,
}

impl From<Format> for OutputMode {
    fn from(f: Format) -> Self {
        match f {
            Format::Human => Self::Human,
            Format::Plain => Self::Plain,
            Format::Json => Self::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pagewise", version, about = "Inspect pagination tokens and cursors", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). If omitted, PAGEWISE_CONFIG or ./pagewise.toml is used.")]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "human")]
    format: Format,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Encode a JSON document as an opaque token")]
    Encode {
        #[arg(help = "JSON document, e.g. '{\"offset\":0}'")]
        json: String,
    },
    #[command(about = "Decode an opaque token to JSON")]
    Decode {
        #[arg(help = "Token produced by encode or by a paginator")]
        token: String,
    },
    #[command(about = "Parse a paginator cursor and print its state and neighbouring cursors")]
    Inspect {
        #[arg(help = "Paginator cursor")]
        cursor: String,
    },
}

fn load_config(cli_cfg: Option<PathBuf>) -> Result<PaginationConfig, pagewise::PageError> {
    // Precedence: CLI > env > config file > defaults
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = cli_cfg {
        paths.push(p);
    }
    if let Ok(p) = std::env::var("PAGEWISE_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("pagewise.toml"));
    }
    let file_cfg = match paths.into_iter().find(|p| p.exists()) {
        Some(p) => PaginationConfig::load(&p)?,
        None => PaginationConfig::default(),
    };
    Ok(file_cfg.apply_env())
}

fn main() {
    if let Err(e) = pagewise::utils::logger::configure_from_env() {
        eprintln!("warning: logging disabled: {e}");
    }
    let cli = Cli::parse();
    let cfg = match load_config(cli.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };
    // Overflowed cursors only resolve within one process; the in-memory store is enough here.
    let codec = CursorCodec::in_memory(cfg);
    let cmd = match cli.command {
        Commands::Encode { json } => prog_cli::Command::Encode { json },
        Commands::Decode { token } => prog_cli::Command::Decode { token },
        Commands::Inspect { cursor } => prog_cli::Command::Inspect { cursor },
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = prog_cli::run_with_format(&codec, cmd, cli.format.into(), &mut out) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
