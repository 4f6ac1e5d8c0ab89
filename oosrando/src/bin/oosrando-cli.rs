use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use oosrando::randomize::Randomizer;
use oosrando::route::Route;
use oosrando::settings::RandomizerSettings;
use oosrando::softlock::NoSoftlock;
use oosrando_game::{Catalog, PrenodeSet};
use rand::{RngCore, SeedableRng};
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "data/prenodes.json")]
    prenodes: PathBuf,

    #[arg(long, default_value = "data/catalog.json")]
    catalog: PathBuf,

    #[arg(long, default_value = "data/settings.json")]
    settings: PathBuf,

    #[arg(long)]
    random_seed: Option<usize>,

    #[arg(long)]
    max_tries: Option<usize>,

    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    output_spoiler_log: Option<PathBuf>,

    // Only load and check the data, without placing anything.
    #[arg(long)]
    check_only: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let prenodes = PrenodeSet::load(&args.prenodes)?;
    let catalog = Catalog::load(&args.catalog)?;
    let mut settings = RandomizerSettings::load(&args.settings)?;
    if let Some(max_tries) = args.max_tries {
        settings.max_tries = max_tries;
    }
    if let Some(max_iterations) = args.max_iterations {
        settings.max_iterations = max_iterations;
    }
    settings.check()?;

    let mut route = Route::new(&prenodes, &settings.start, &catalog.items)?;
    route.validate()?;
    route.check_catalog(&catalog)?;
    info!(
        "{} nodes, {} slots, {} items",
        route.graph.len(),
        route.slots.len(),
        route.items.len()
    );
    if args.check_only {
        println!("Data OK");
        return Ok(());
    }

    let seed = match args.random_seed {
        Some(s) => s,
        None => (rand::rngs::StdRng::from_entropy().next_u64() & 0xFFFFFFFF) as usize,
    };
    info!("Random seed={seed}");

    let randomizer = Randomizer::new(&route, &catalog, &NoSoftlock, &settings)?;
    let randomization = randomizer
        .randomize(&mut route, seed)
        .with_context(|| format!("Randomization failed (seed={seed})"))?;

    for p in &randomization.placements {
        println!("{} <- {}", p.item, p.slot);
    }

    if let Some(output_spoiler_log_path) = &args.output_spoiler_log {
        println!(
            "Writing spoiler log to {}",
            output_spoiler_log_path.display()
        );
        let spoiler_log = randomization.spoiler_log(&settings, &catalog)?;
        let spoiler_str = serde_json::to_string_pretty(&spoiler_log)?;
        std::fs::write(output_spoiler_log_path, spoiler_str)?;
    }

    Ok(())
}
