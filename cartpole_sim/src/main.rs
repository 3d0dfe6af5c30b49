use anyhow::Result;
use cartpole_core::{Centering, FixedGains};
use cartpole_sim::{tui, CartPoleSimBuilder, GainsConfig, SimConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cartpole")]
#[command(about = "Inverted pendulum on a cart, balanced by a PD controller")]
#[command(version = "0.1.0")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run headless for a number of ticks and log a summary
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of ticks to simulate
        #[arg(long, default_value = "600")]
        ticks: u64,

        /// Write every tick to this CSV file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Interactive terminal dashboard
    Tui {
        #[command(flatten)]
        sim: SimArgs,
    },

    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        sim: SimArgs,
    },
}

/// Flags shared by every subcommand; they override the config file
#[derive(Args, Debug, Default)]
struct SimArgs {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Proportional gain
    #[arg(long)]
    kp: Option<f64>,

    /// Derivative gain
    #[arg(long)]
    kd: Option<f64>,

    /// Use constant gains instead of sliders
    #[arg(long)]
    fixed: bool,

    /// Gain pulling the cart back toward --target-x
    #[arg(long)]
    null_gain: Option<f64>,

    /// Horizontal position the cart is pulled toward
    #[arg(long)]
    target_x: Option<f64>,
}

impl SimArgs {
    /// Load the config file (if any) and apply the flags on top
    fn resolve(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)?,
            None => SimConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut SimConfig) {
        let was_fixed = matches!(config.gains, GainsConfig::Fixed { .. });
        let (base_kp, base_kd) = if self.fixed && !was_fixed {
            (FixedGains::DEFAULT_KP, FixedGains::DEFAULT_KD)
        } else {
            config.gains.values()
        };
        let kp = self.kp.unwrap_or(base_kp);
        let kd = self.kd.unwrap_or(base_kd);
        config.gains = if self.fixed || was_fixed {
            GainsConfig::Fixed { kp, kd }
        } else {
            GainsConfig::Sliders { kp, kd }
        };

        if let Some(null_gain) = self.null_gain {
            let target_x = self
                .target_x
                .or(config.centering.map(|c| c.target_x))
                .unwrap_or(config.world.width / 2.0);
            config.centering = Some(Centering::new(null_gain, target_x));
        } else if let Some(target_x) = self.target_x {
            match config.centering.as_mut() {
                Some(centering) => centering.target_x = target_x,
                None => warn!("--target-x has no effect without --null-gain"),
            }
        }
    }
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { sim, ticks, record } => {
            init_logging("info");
            let config = sim.resolve()?;
            run_headless(config, ticks, record)
        }
        Commands::Tui { sim } => {
            // Keep log lines off the dashboard
            init_logging("warn");
            let config = sim.resolve()?;
            let sim = CartPoleSimBuilder::new().with_config(config).build()?;
            tui::run(sim)
        }
        Commands::Config { sim } => {
            init_logging("warn");
            let config = sim.resolve()?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn run_headless(config: SimConfig, ticks: u64, record: Option<PathBuf>) -> Result<()> {
    info!("Starting cartpole");
    info!(ticks, "Running headless");

    let mut sim = CartPoleSimBuilder::new()
        .with_config(config)
        .with_recorder(true)
        .build()?;
    let ran = sim.run_for(ticks)?;

    let Some(recorder) = sim.take_recorder() else {
        return Ok(());
    };
    let summary = recorder.summary();
    let final_cart_x = sim.positions().map(|(cart, _)| cart.x);
    info!(
        run = recorder.name(),
        started_at = recorder.started_at(),
        ticks = ran,
        max_abs_error = summary.max_abs_error,
        rms_error = summary.rms_error,
        max_abs_force = summary.max_abs_force,
        ?final_cart_x,
        "Run finished"
    );

    if let Some(path) = record {
        recorder.export_csv(&path)?;
        info!("Recorded {} ticks to {:?}", recorder.len(), path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "cartpole", "run", "--ticks", "10", "--kp", "0.004", "--fixed",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { sim, ticks, record } => {
                assert_eq!(ticks, 10);
                assert_eq!(sim.kp, Some(0.004));
                assert!(sim.fixed);
                assert!(record.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_flags_override_gains() {
        let mut config = SimConfig::default();
        let args = SimArgs {
            kd: Some(0.3),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.gains, GainsConfig::Sliders { kp: 0.005, kd: 0.3 });
    }

    #[test]
    fn test_fixed_flag_uses_fixed_defaults() {
        let mut config = SimConfig::default();
        let args = SimArgs {
            fixed: true,
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.gains, GainsConfig::Fixed { kp: 0.006, kd: 0.2 });
    }

    #[test]
    fn test_fixed_file_stays_fixed() {
        let mut config = SimConfig::default();
        config.gains = GainsConfig::Fixed { kp: 0.004, kd: 0.1 };
        let args = SimArgs {
            kp: Some(0.003),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.gains, GainsConfig::Fixed { kp: 0.003, kd: 0.1 });
    }

    #[test]
    fn test_centering_flags() {
        let mut config = SimConfig::default();
        let args = SimArgs {
            null_gain: Some(0.0005),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.centering, Some(Centering::new(0.0005, 700.0)));

        let args = SimArgs {
            target_x: Some(650.0),
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.centering, Some(Centering::new(0.0005, 650.0)));
    }

    #[test]
    fn test_target_without_centering_is_ignored() {
        let mut config = SimConfig::default();
        let args = SimArgs {
            target_x: Some(650.0),
            ..Default::default()
        };
        args.apply(&mut config);
        assert!(config.centering.is_none());
    }
}
