/// Induce Schemas: runs the chain, pair and schema stages over a corpus.
///
/// Usage: induce_schemas [--config <run.ron>] [--corpus <file|dir>] [--buffer <file>]
///        [--errors <file>] [--pairs <file>] [--output <file>] [--stage <stage>]
///        [--write-cache] [--set <key>=<value>]...
use narrative_schemas::core::config::Config;
use narrative_schemas::core::pipeline::Pipeline;
use std::env;
use std::path::Path;
use std::process;

const USAGE: &str = "Usage: induce_schemas [--config <run.ron>] [--corpus <file|dir>] \
[--buffer <file>] [--errors <file>] [--pairs <file>] [--output <file>] \
[--stage <all|chain_only|pair_and_schema|schema_only>] [--write-cache] [--set <key>=<value>]...";

fn value_of(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("Error: {} needs a value", flag);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let mut config_path = None;
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" => {
                i += 1;
                config_path = Some(value_of(&args, i, flag));
            }
            "--corpus" | "--buffer" | "--errors" | "--pairs" | "--output" | "--stage" => {
                i += 1;
                overrides.push((flag.trim_start_matches("--").to_string(), value_of(&args, i, flag)));
            }
            "--write-cache" => {
                overrides.push(("write_frequency_cache".to_string(), "true".to_string()));
            }
            "--set" => {
                i += 1;
                let pair = value_of(&args, i, flag);
                match pair.split_once('=') {
                    Some((key, value)) => overrides.push((key.trim().to_string(), value.to_string())),
                    None => {
                        eprintln!("Error: --set expects <key>=<value>, got '{}'", pair);
                        process::exit(1);
                    }
                }
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(path) => Config::load_from_ron(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Error reading config '{}': {}", path, e);
            process::exit(1);
        }),
        None => Config::default(),
    };
    for (key, value) in &overrides {
        if let Err(e) = config.apply_override(key, value) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }

    let pipeline = Pipeline::new(config);
    let summary = pipeline.run().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    if let Some(chains) = summary.chains {
        println!(
            "Chains: {} of {} documents written ({} exhausted, {} skipped)",
            chains.written, chains.documents, chains.exhausted, chains.skipped
        );
    }
    if let Some(pairs) = summary.pairs {
        println!(
            "Pairs: {} pairs for {} of {} entries",
            pairs.pairs_written, pairs.entries_written, pairs.entries_read
        );
    }
    if let Some(schemas) = summary.schemas {
        println!(
            "Schemas: {} accepted from {} events ({} argument frequencies)",
            schemas.schemas, schemas.events, schemas.frequencies
        );
        println!(
            "Schemas written to '{}'",
            pipeline.config().output_path.display()
        );
    }
}
