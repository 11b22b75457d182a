//! SteelRain control bridge host.
//!
//! Provides three modes of operation:
//! - `serve`: Run the headless simulation loop and serve the control bridge
//! - `check-config`: Validate a TOML configuration file
//! - `info`: Print crate versions and the default configuration

mod scene;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::{Parser, Subcommand};

use steelrain_core::prelude::*;
use steelrain_env::prelude::*;
use steelrain_gym::Bridge;

use crate::scene::{Arena, TargetSpawner, respawn_target_system, spawn_scene};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// SteelRain real-time control bridge.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation loop and serve a controller over TCP.
    Serve {
        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Loopback port to bind (overrides the config file).
        #[arg(short, long)]
        port: Option<u16>,

        /// Seed for target placement.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },

    /// Validate a configuration file and print a summary.
    CheckConfig {
        /// TOML configuration file.
        path: PathBuf,
    },

    /// Print crate information and the default configuration.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_serve(config_path: Option<&Path>, port: Option<u16>, seed: u64) -> Result<(), Box<dyn Error>> {
    let mut config = match config_path {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(port) = port {
        config.listener.port = port;
    }
    config.validate()?;

    let arena = Arena::new();
    let mut spawner = TargetSpawner::new(seed);
    let mut controller = EpisodeController::new(config.clone()).with_ray_caster(arena.clone());
    let (bridge, bridge_plugin) = Bridge::new(&config.listener);

    let clock = config
        .tick
        .fixed_delta_secs
        .map_or_else(TickClock::variable, TickClock::fixed);
    let tick = Duration::from_secs_f64(1.0 / config.tick.tick_hz);

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(tick)),
        LogPlugin::default(),
    ));

    spawn_scene(&arena, &mut spawner, &mut controller, &config);

    app.insert_resource(clock)
        .insert_resource(config.clone())
        .insert_resource(controller)
        .insert_resource(arena)
        .insert_resource(spawner)
        .add_plugins((SteelrainCorePlugin, SteelrainEnvPlugin, bridge_plugin))
        .add_systems(Update, respawn_target_system.after(BridgeSet::Communicate));

    let mut service = bridge.serve(&config.listener)?;
    info!(
        "steelrain bridge on {} (grid {}x{}, observation length {}, {} Hz)",
        service.local_addr(),
        config.sensor.grid_width,
        config.sensor.grid_height,
        config.observation_len(),
        config.tick.tick_hz
    );

    let exit = app.run();
    service.stop();
    if exit.is_error() {
        return Err(format!("simulation loop exited with {exit:?}").into());
    }
    Ok(())
}

fn run_check_config(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = BridgeConfig::from_file(path)?;
    println!("{}: ok", path.display());
    println!("  port               {}", config.listener.port);
    println!(
        "  grid               {}x{} (observation length {})",
        config.sensor.grid_width,
        config.sensor.grid_height,
        config.observation_len()
    );
    println!(
        "  pitch              [{}, {}]",
        config.pose.pitch.min, config.pose.pitch.max
    );
    println!("  yaw                [{}, {}]", config.pose.yaw.min, config.pose.yaw.max);
    println!(
        "  fire interval      {:.3}s",
        config.fire.min_interval_secs()
    );
    println!("  tick               {} Hz", config.tick.tick_hz);
    Ok(())
}

fn run_info() -> Result<(), Box<dyn Error>> {
    println!("steelrain v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  steelrain-core  {}", env!("CARGO_PKG_VERSION"));
    println!("  steelrain-env   {}", env!("CARGO_PKG_VERSION"));
    println!("  steelrain-gym   {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("edition: 2024");
    println!();
    println!("# default configuration");
    print!("{}", BridgeConfig::default().to_toml_string()?);
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Serve { config, port, seed }) => run_serve(config.as_deref(), port, seed),
        Some(Commands::CheckConfig { path }) => run_check_config(&path),
        Some(Commands::Info) => run_info(),
        None => {
            // Default: serve with the default configuration
            run_serve(None, None, 0)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_arguments_parse() {
        let cli = Cli::parse_from(["steelrain", "serve", "--port", "9000", "--seed", "3"]);
        match cli.command {
            Some(Commands::Serve { config, port, seed }) => {
                assert!(config.is_none());
                assert_eq!(port, Some(9000));
                assert_eq!(seed, 3);
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn check_config_reports_missing_file() {
        let err = run_check_config(Path::new("/nonexistent/steelrain.toml")).unwrap_err();
        assert!(err.to_string().contains("IO error"));
    }
}
