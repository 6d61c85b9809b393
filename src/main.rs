#![warn(clippy::unwrap_used, clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
use std::sync::Arc;

use basicorbit::{config::EngineConfig, maneuver::burn, state::ProximityState};
use color_eyre::eyre::{self, bail, WrapErr};
use parking_lot::RwLock;
use scenario::Scenario;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod readout;
mod scenario;

fn load_config(path: Option<&str>) -> eyre::Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let text =
                std::fs::read_to_string(path).wrap_err_with(|| format!("reading {path}"))?;
            toml::from_str::<EngineConfig>(&text)
                .wrap_err_with(|| format!("parsing config {path}"))?
        }
        None => EngineConfig::default(),
    };
    config.validate()
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(scenario_path) = args.first() else {
        bail!("usage: basicorbit <scenario.ron> [config.toml]");
    };
    let config = load_config(args.get(1).map(String::as_str))?;
    info!(?config, "engine configured");

    let replay = Scenario::load(scenario_path)?.build()?;
    let ticks = replay.frames.len();
    let modules = Arc::new(RwLock::new(replay.modules));
    let mut state = ProximityState::begin(config, burn::detect(modules.clone()));
    for frame in replay.frames {
        *modules.write() = frame.modules;
        let current = state.request_update(&frame.flight);
        print!("{}", readout::render(frame.flight.now, current));
    }
    state.clear();
    info!(ticks, "replay finished");

    Ok(())
}
