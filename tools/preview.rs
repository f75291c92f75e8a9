/// Preview: run scenario rows through an engine pipeline and print the
/// generated commands.
///
/// Usage: preview --engine <name> --rows <path> [--translations <path>]
///                [--variants <path>] [--config <path>]
///
/// Rows are a RON list of maps, one map per spreadsheet line:
///   [ {"Music": "主题曲", "Text": "Hello"}, {"Pause": 1.5} ]
///
/// Set RUST_LOG=debug to see translation and stage diagnostics.
use clap::Parser;
use scenario_engine::core::config::EngineConfig;
use scenario_engine::core::engine::EngineRegistry;
use scenario_engine::core::registry::GeneratorRegistry;
use scenario_engine::core::translate::Translator;
use scenario_engine::schema::command::Command;
use scenario_engine::schema::row::Row;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "preview", about = "Preview the commands generated for scenario rows")]
struct Cli {
    /// Target engine (renpy, naninovel, utage)
    #[arg(long)]
    engine: String,

    /// RON list of rows to process
    #[arg(long, value_name = "PATH")]
    rows: PathBuf,

    /// Translation table (type → raw value → engine id)
    #[arg(long, value_name = "PATH")]
    translations: Option<PathBuf>,

    /// Per-character variant table
    #[arg(long, value_name = "PATH", requires = "translations")]
    variants: Option<PathBuf>,

    /// Engine configuration; defaults to the engine's built-in one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let translator = match &cli.translations {
        Some(path) => Translator::load_from_ron(path, cli.variants.as_deref())?,
        None => Translator::empty(),
    };
    let config = match &cli.config {
        Some(path) => Some(EngineConfig::load_from_ron(path)?),
        None => None,
    };

    let processor = EngineRegistry::builtin().create_processor(
        &cli.engine,
        config.as_ref(),
        Arc::new(translator),
        &GeneratorRegistry::builtin(),
    )?;

    let contents = std::fs::read_to_string(&cli.rows)?;
    let rows: Vec<Row> = ron::from_str(&contents)?;

    println!("=== {} ({} rows) ===", processor.engine(), rows.len());
    for (i, commands) in processor.process_rows(&rows).into_iter().enumerate() {
        println!();
        println!("--- row {} ---", i + 1);
        if commands.is_empty() {
            println!("  (no output)");
        }
        for command in commands {
            match command {
                Command::Line(line) => println!("  {}", line),
                Command::Record(_) => println!("  [{}]", command),
            }
        }
    }
    Ok(())
}
