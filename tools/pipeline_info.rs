/// Pipeline info: list the ordered stages, declared fields and translation
/// types of each registered engine.
///
/// Usage: pipeline_info [--engine <name>] [--ron]
///
/// `--ron` prints the machine-readable stage listing instead of the table.
use clap::Parser;
use scenario_engine::core::engine::EngineRegistry;
use scenario_engine::core::registry::GeneratorRegistry;
use scenario_engine::core::translate::Translator;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pipeline_info", about = "Show the generator pipeline of each engine")]
struct Cli {
    /// Only show this engine
    #[arg(long)]
    engine: Option<String>,

    /// Print the stage listing as RON
    #[arg(long)]
    ron: bool,
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
    let engines = EngineRegistry::builtin();
    let generators = GeneratorRegistry::builtin();
    let translator = Arc::new(Translator::empty());

    let names: Vec<String> = match &cli.engine {
        Some(name) => vec![engines.get(name)?.name.clone()],
        None => engines.list_all().keys().cloned().collect(),
    };

    for name in names {
        let processor = engines.create_processor(&name, None, Arc::clone(&translator), &generators)?;
        let info = processor.pipeline_info();

        if cli.ron {
            let pretty = ron::ser::PrettyConfig::default();
            println!("{}", ron::ser::to_string_pretty(&info, pretty)?);
            continue;
        }

        let descriptor = engines.get(&name)?;
        println!(
            "=== {} ({}, {}) ===",
            descriptor.display_name, info.engine, descriptor.file_extension
        );
        println!("{:>5}  {:>8}  {:<24} {}", "stage", "priority", "generator", "category");
        for stage in &info.stages {
            println!(
                "{:>5}  {:>8}  {:<24} {}",
                stage.stage, stage.priority, stage.name, stage.category
            );
        }

        let set = processor.generator_set();
        println!("fields:          {}", set.param_names().join(", "));
        println!("translate types: {}", set.translate_types().join(", "));
        println!();
    }
    Ok(())
}
