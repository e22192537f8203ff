use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imagegen_contracts::events::EventWriter;
use imagegen_contracts::results::{
    read_requests, GenerationRequest, DEFAULT_BUSINESS_NAME, DEFAULT_RESULTS_FILENAME,
};
use imagegen_engine::{Generator, DEFAULT_API_BASE, DEFAULT_OUTPUT_DIR};
use log::info;

#[derive(Debug, Parser)]
#[command(name = "imagegen", version, about = "Marketing image generator for DALL-E 3")]
struct Cli {
    /// Falls back to mock results when unset.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE, global = true)]
    api_base: String,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR, global = true)]
    out: PathBuf,
    /// Append structured events to this JSONL file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, default_value_t = 2000, global = true)]
    batch_delay_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a single image.
    Generate(GenerateArgs),
    /// Generate every request in a JSON file, one after another.
    Batch(BatchArgs),
    /// Single image plus a three-image batch, saved to the results file.
    Demo,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    description: String,
    #[arg(long, default_value = DEFAULT_BUSINESS_NAME)]
    business: String,
    /// Also persist the result under this name in the output directory.
    #[arg(long)]
    save: Option<String>,
}

#[derive(Debug, Parser)]
struct BatchArgs {
    #[arg(long)]
    requests: PathBuf,
    #[arg(long, default_value = DEFAULT_RESULTS_FILENAME)]
    results: String,
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("imagegen error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let generator = build_generator(&cli)?;
    match cli.command {
        Command::Generate(args) => run_generate(&generator, args),
        Command::Batch(args) => run_batch(&generator, args),
        Command::Demo => run_demo(&generator),
    }
}

fn build_generator(cli: &Cli) -> Result<Generator> {
    let mut generator = Generator::with_api_base(cli.api_key.clone(), &cli.out, &cli.api_base)?
        .with_batch_delay(Duration::from_millis(cli.batch_delay_ms));
    if let Some(path) = &cli.events {
        let run_id = uuid::Uuid::new_v4().to_string();
        generator = generator.with_events(EventWriter::new(path, run_id));
    }
    Ok(generator)
}

fn run_generate(generator: &Generator, args: GenerateArgs) -> Result<()> {
    let result = generator.generate_image(&args.description, &args.business);
    println!("{}", serde_json::to_string_pretty(&result)?);
    if let Some(name) = args.save.as_deref() {
        generator.save_results_as(std::slice::from_ref(&result), name)?;
    }
    Ok(())
}

fn run_batch(generator: &Generator, args: BatchArgs) -> Result<()> {
    let requests = read_requests(&args.requests)?;
    let results = generator.generate_batch(&requests);
    generator.save_results_as(&results, &args.results)?;
    Ok(())
}

fn run_demo(generator: &Generator) -> Result<()> {
    info!("Test 1: single image generation");
    let result = generator.generate_image(
        "Elegant flower arrangement for a wedding, professional photography",
        "Floral Dreams Studio",
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    info!("Test 2: multiple image generation");
    let requests = vec![
        GenerationRequest::for_business(
            "Modern coffee shop interior with customers enjoying coffee",
            "Urban Coffee Co",
        ),
        GenerationRequest::for_business(
            "Professional business team meeting in modern office",
            "Tech Solutions Inc",
        ),
        GenerationRequest::for_business(
            "Fresh ingredients for healthy cooking, vibrant colors",
            "Healthy Eats Restaurant",
        ),
    ];
    let results = generator.generate_batch(&requests);
    generator.save_results(&results)?;

    info!(
        "Check the '{}' folder for generated images",
        generator.output_dir().display()
    );
    Ok(())
}
