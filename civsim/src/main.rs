use anyhow::Result;
use civsim_core::systems;
use civsim_core::testing::GameStateBuilder;
use civsim_core::{GameState, HexCoord, VictoryKind};
use clap::Parser;

/// Self-play driver: assembles a small world and runs the turn loop,
/// logging one summary line per civilization per turn.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of turns to simulate
    #[arg(short, long, default_value_t = 50)]
    turns: u32,

    /// RNG seed for replay-stable runs
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn demo_world(seed: u64) -> Result<GameState> {
    let mut game = GameStateBuilder::new()
        .with_map_radius(6)
        .with_civ("Rome")
        .with_civ("Greece")
        .with_city_state("Geneva")
        .with_tech(0, "Agriculture")
        .with_tech(0, "Mining")
        .with_tech(0, "The Wheel")
        .with_tech(1, "Agriculture")
        .with_tech(1, "Animal Husbandry")
        .with_city(0, HexCoord::new(-3, 0), true)
        .with_city(0, HexCoord::new(0, -3), false)
        .with_city(1, HexCoord::new(3, 0), true)
        .with_city(2, HexCoord::new(0, 3), true)
        .with_unit(0, HexCoord::new(-3, 0), "Warrior")
        .with_unit(0, HexCoord::new(-3, 1), "Worker")
        .with_unit(0, HexCoord::new(0, -3), "Worker")
        .with_unit(1, HexCoord::new(3, 0), "Warrior")
        .with_unit(1, HexCoord::new(3, -1), "Worker")
        .build();
    game.rng_seed = seed;

    // Hand workers to the automation layer.
    let worker_ids: Vec<_> = game
        .units
        .values()
        .filter(|u| {
            game.ruleset
                .units
                .get(&u.base)
                .map(|d| d.worker)
                .unwrap_or(false)
        })
        .map(|u| u.id)
        .collect();
    for id in worker_ids {
        if let Some(unit) = game.unit_mut(id) {
            unit.automated = true;
        }
    }

    game.validate_for_start()?;
    Ok(game)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let mut game = demo_world(args.seed)?;

    log::info!(
        "Starting simulation: {} civilizations, {} tiles, {} turns",
        game.civilizations.len(),
        game.map.len(),
        args.turns
    );

    for _ in 0..args.turns {
        systems::run_turn(&mut game);
        for civ in &game.civilizations {
            log::info!(
                "Turn {:>3} | {:<8} | Gold: {:>5} | Techs: {:>2} | Cities: {} | Units: {}",
                game.turn,
                civ.name,
                civ.gold,
                civ.techs.len(),
                civ.cities.len(),
                civ.units.len()
            );
        }
        if let Some(victory) = game.victory {
            let kind = match victory.kind {
                VictoryKind::Domination => "domination",
                VictoryKind::Science => "science",
            };
            log::info!(
                "{} wins a {} victory on turn {}",
                game.civ(victory.civ).name,
                kind,
                victory.turn
            );
            break;
        }
    }

    log::info!("Simulation complete at turn {}", game.turn);
    for civ in &game.civilizations {
        let roads = game
            .map
            .tiles()
            .filter(|t| t.owner == Some(civ.id) && t.road.is_some())
            .count();
        log::info!(
            "Final | {:<8} | Gold: {} | Techs: {} | Roads on owned tiles: {}",
            civ.name,
            civ.gold,
            civ.techs.len(),
            roads
        );
    }

    Ok(())
}
