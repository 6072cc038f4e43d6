//! Orbis - headless match runner
//!
//! Plays the strategist against itself until one side is wiped out or
//! `game.max_ticks` runs out.
//!
//! Environment:
//! - `ORBIS_CONFIG`: path to a JSON config (otherwise `ORBIS_*` overrides)
//! - `ORBIS_LOG`: log level (default: info)

use tracing::{error, info, Level};

use orbis_core::error::OrbisResult;
use orbis_core::{OrbisConfig, Side};
use orbis_game::{Campaign, MatchOutcome, Strategist};

/// Ticks between progress lines
const REPORT_EVERY: u64 = 600;

fn main() {
    let level = std::env::var("ORBIS_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = match std::env::var("ORBIS_CONFIG") {
        Ok(path) => match OrbisConfig::load(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                error!("Cannot load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        Err(_) => OrbisConfig::from_env(),
    };

    match run(config) {
        Ok(MatchOutcome::Victory(side)) => info!("🏆 {} wins", side),
        Ok(MatchOutcome::Draw) => info!("🤝 Draw"),
        Err(e) => {
            error!("Match failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(config: OrbisConfig) -> OrbisResult<MatchOutcome> {
    config.validate()?;
    info!(
        "🌐 Orbis: {} places, grid {}x{}, difficulty {:.2}",
        config.game.places, config.grid.width, config.grid.width, config.kernel.difficulty
    );

    let dt = config.game.tick_dt;
    let max_ticks = config.game.max_ticks;
    let mut players = [
        Strategist::new(Side::Player, &config.ai),
        Strategist::new(Side::Enemy, &config.ai),
    ];
    let mut campaign = Campaign::new(config)?;

    for tick in 1..=max_ticks {
        for player in players.iter_mut() {
            player.update(&mut campaign, dt)?;
        }
        campaign.step(dt)?;

        if let Some(outcome) = campaign.outcome() {
            return Ok(outcome);
        }
        if tick % REPORT_EVERY == 0 {
            let live = campaign.live_counts();
            info!(
                "t={:.0}s places {}/{} garrison {:.0}/{:.0} in flight {}/{}",
                campaign.elapsed(),
                campaign.owned_by(Side::Player).len(),
                campaign.owned_by(Side::Enemy).len(),
                campaign.garrison(Side::Player),
                campaign.garrison(Side::Enemy),
                live[Side::Player],
                live[Side::Enemy]
            );
        }
    }

    info!("⏱️ Tick limit {} reached", max_ticks);
    Ok(MatchOutcome::Draw)
}
