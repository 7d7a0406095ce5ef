use absdev::deviation::{Value, Variant};
use absdev::manager::Manager;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long, default_value = ".")]
    bench_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run,

    Analyze,

    Clean,

    Eval {
        #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
        values: Vec<Value>,

        #[arg(long)]
        variant: Option<Variant>,

        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        min_value: Value,

        #[arg(long, default_value_t = 4, allow_hyphen_values = true)]
        max_value: Value,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    match args.command {
        Command::Run => Manager::new(args.bench_dir)
            .context("failed to construct mgr")?
            .run_bench()?,
        Command::Analyze => Manager::new(args.bench_dir)
            .context("failed to construct mgr")?
            .analyze_runs()?,
        Command::Clean => Manager::new(args.bench_dir)
            .context("failed to construct mgr")?
            .clean_runs()?,
        Command::Eval {
            values,
            variant,
            min_value,
            max_value,
        } => eval(&values, variant, min_value, max_value)?,
    }

    Ok(())
}

fn eval(
    values: &[Value],
    variant: Option<Variant>,
    min_value: Value,
    max_value: Value,
) -> Result<()> {
    let variants = match variant {
        Some(variant) => vec![variant],
        None => Variant::ALL.to_vec(),
    };

    let mut results = Vec::with_capacity(variants.len());
    for variant in variants {
        let result = variant
            .compute(values, min_value..=max_value)
            .with_context(|| format!("failed to evaluate {variant}"))?;
        println!("{variant} = {result}");
        results.push((variant, result));
    }

    if let Some(&(first, expected)) = results.first() {
        for &(variant, result) in &results[1..] {
            if result != expected {
                bail!("{variant} returned {result}, but {first} returned {expected}");
            }
        }
    }

    Ok(())
}
