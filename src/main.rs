use clap::{Parser, Subcommand};
use grimoire::config::{Config, Locale};
use grimoire::error::GrimoireError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "grimoire")]
#[command(about = "Compiles hand-drawn magic circles into Python source")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Diagnostic message locale.
    #[arg(long, global = true)]
    lang: Option<String>,

    /// Classifies contours across a rayon thread pool instead of sequentially.
    #[arg(long, global = true)]
    parallel: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an image to Python source.
    Compile {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile an image and execute the result with python3.
    Run { path: PathBuf },
    /// Print detected symbols and connections.
    Debug { path: PathBuf },
    /// Run detection and parsing only; report success or the first error.
    Validate { path: PathBuf },
    /// Re-emit generated source unchanged (no standalone formatter is bundled).
    Format { path: PathBuf },
    /// Compile with a peephole constant-folding pass over the tree.
    Optimize {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn resolve_locale(cli_lang: Option<&str>) -> Locale {
    let raw = cli_lang
        .map(str::to_string)
        .or_else(|| std::env::var("GRIMOIRE_LANG").ok())
        .unwrap_or_else(|| "en".to_string());
    Locale::from_str(&raw).unwrap_or_default().resolved()
}

fn print_error(err: &GrimoireError, _locale: Locale) {
    eprintln!("ERROR: {}", err.kind());
    eprintln!("{err}");
    eprintln!("suggestion: {}", err.suggestion());
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let locale = resolve_locale(cli.lang.as_deref());
    let config = Config { parallel: cli.parallel, ..Config::default() };

    let result = run(cli.command, &config);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err, locale);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config) -> grimoire::error::Result<()> {
    match command {
        Commands::Compile { path, output } => {
            let result = grimoire::compile_path(&path, config)?;
            write_source(&result.source, output.as_deref())
        }
        Commands::Optimize { path, output } => {
            let result = grimoire::compile_path_optimized(&path, config)?;
            write_source(&result.source, output.as_deref())
        }
        Commands::Format { path } => {
            let result = grimoire::compile_path(&path, config)?;
            print!("{}", result.source);
            Ok(())
        }
        Commands::Run { path } => {
            let result = grimoire::compile_path(&path, config)?;
            let script_path = std::env::temp_dir().join(format!("grimoire_{}.py", std::process::id()));
            std::fs::write(&script_path, &result.source).map_err(|e| GrimoireError::ExecutionError {
                reason: "failed to write temporary script".to_string(),
                cause: Some(Box::new(e)),
            })?;
            let output = std::process::Command::new("python3").arg(&script_path).output().map_err(|e| {
                GrimoireError::ExecutionError { reason: "failed to invoke python3".to_string(), cause: Some(Box::new(e)) }
            });
            let _ = std::fs::remove_file(&script_path);
            let output = output?;
            print!("{}", String::from_utf8_lossy(&output.stdout));
            eprint!("{}", String::from_utf8_lossy(&output.stderr));
            Ok(())
        }
        Commands::Debug { path } => {
            let result = grimoire::compile_path(&path, config)?;
            println!("{} symbols:", result.symbols.len());
            for symbol in &result.symbols {
                println!(
                    "  {:?} at ({:.1}, {:.1}) size {:.1} pattern {:?}",
                    symbol.symbol_type, symbol.position.x, symbol.position.y, symbol.size, symbol.pattern
                );
            }
            println!("{} connections:", result.connections.len());
            for conn in &result.connections {
                println!("  {} -> {} ({:?})", conn.from, conn.to, conn.connection_type);
            }
            Ok(())
        }
        Commands::Validate { path } => {
            grimoire::check_path(&path, config)?;
            println!("ok");
            Ok(())
        }
    }
}

fn write_source(source: &str, output: Option<&std::path::Path>) -> grimoire::error::Result<()> {
    match output {
        Some(path) => std::fs::write(path, source)
            .map_err(|e| GrimoireError::FileWriteError { location: grimoire::error::Location::path(path), cause: e }),
        None => {
            print!("{source}");
            Ok(())
        }
    }
}
