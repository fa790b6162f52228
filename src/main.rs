use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use nearby_core::Config;
use nearby_facts::{Fact, FetchState};
use nearby_location::StaticSource;
use nearby_service::{pipeline_from_config, FactSession};

#[derive(Parser)]
#[command(name = "nearby", version, about = "Interesting facts about where you are")]
struct Args {
    /// Latitude of the position to describe (overrides location.latitude)
    #[arg(long, allow_hyphen_values = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude of the position to describe (overrides location.longitude)
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Skip location and geocoding and ask about a named place
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    place: Option<String>,

    /// Print the facts as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    nearby_core::init()?;
    let args = Args::parse();

    let (config, _) = Config::load_validated()?;
    tracing::info!("Nearby started");

    let state = match args.place {
        Some(place) => {
            let pipeline = pipeline_from_config(&config)?;
            pipeline.fetch(&place).await?;
            pipeline.store().snapshot()
        }
        None => {
            let Some((latitude, longitude)) = args.lat.zip(args.lon).or(config.location.fixed_position()) else {
                bail!("No position given: pass --lat/--lon, --place, or set location.latitude and location.longitude");
            };

            let (source, events) = StaticSource::new(latitude, longitude);
            let mut session = FactSession::from_config(&config, Arc::new(source), events)?;
            match session.run_once().await {
                Ok(state) => state,
                Err(e) => bail!("{} ({})", e.user_message(), e),
            }
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(state.facts.as_slice())?);
    } else {
        print_facts(&state);
    }

    Ok(())
}

fn print_facts(state: &FetchState) {
    if let Some(location) = &state.location {
        println!("Nearby - {}", location);
    }
    println!();
    for (i, fact) in state.facts.iter().enumerate() {
        print_fact(i + 1, fact);
    }
}

fn print_fact(index: usize, fact: &Fact) {
    println!("{:>2}. {}", index, fact.title);
    println!("    {}", fact.description);
    if let Some((lat, lon)) = fact.coordinates() {
        println!("    at {:.4}, {:.4}", lat, lon);
    }
    if let Some(url) = &fact.url {
        println!("    {}", url);
    }
}
