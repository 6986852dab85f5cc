//! `lifnet` entrypoint: dataset generation, training, evaluation, output
//! comparison, and a TUI spike raster (time on X, neurons on Y).
//! Raster controls: [s] Step, [r] Run/Pause, [n] Next sample, [q] Quit

mod app;
mod backend;
mod commands;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute, terminal,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use app::App;
use backend::{NetworkBackend, RasterBackend};
use commands::{Overrides, DATA_FILE, LABELS_FILE};
use lifnet_core::SpikingNetwork;
use lifnet_train::{load_network, ClusterSpec};
use ui::draw;

#[derive(Parser, Debug)]
#[command(name = "lifnet", version, about = "Two-layer LIF spiking network: train, evaluate, compare", long_about = None)]
struct Cli {
    /// Training configuration (JSON). Missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct DataArgs {
    /// Feature file, one value per line
    #[arg(long, default_value = DATA_FILE)]
    data: PathBuf,

    /// Label file, one class index per line
    #[arg(long, default_value = LABELS_FILE)]
    labels: PathBuf,

    /// z-score then min–max the features before use
    #[arg(long)]
    normalize: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a two-cluster synthetic dataset
    Generate {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 100)]
        samples_per_class: usize,
        /// Mean of the cluster labeled 1
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        mean_positive: f64,
        /// Mean of the cluster labeled 0
        #[arg(long, default_value_t = 10.0, allow_hyphen_values = true)]
        mean_negative: f64,
        #[arg(long, default_value_t = 1.0)]
        std_dev: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Keep raw feature values instead of normalizing into [0, 1]
        #[arg(long)]
        raw: bool,
    },

    /// Train and save weights
    Train {
        #[command(flatten)]
        data: DataArgs,
        /// Directory receiving weights_fc{1,2}.txt and bias_fc{1,2}.txt
        #[arg(long, default_value = ".")]
        weights_dir: PathBuf,
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        learning_rate: Option<f64>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Present features as Bernoulli spike trains instead of constant input
        #[arg(long)]
        rate: bool,
        /// Write the first epoch's input sequences here
        #[arg(long)]
        record_inputs: Option<PathBuf>,
    },

    /// Evaluate saved weights
    Eval {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, default_value = ".")]
        weights_dir: PathBuf,
        /// Snap weights to Q0.7 before simulating
        #[arg(long)]
        quantized: bool,
        /// Write the [samples × outputs] spike-count matrix here
        #[arg(long)]
        outputs: Option<PathBuf>,
        #[arg(long)]
        rate: bool,
    },

    /// Compare two output matrices cell by cell
    Compare {
        a: PathBuf,
        b: PathBuf,
        /// Exit with an error when any cell differs
        #[arg(long)]
        strict: bool,
    },

    /// Step a network through the dataset in a spike raster TUI
    Raster {
        #[command(flatten)]
        data: DataArgs,
        /// Saved weights; a freshly initialized network when omitted
        #[arg(long)]
        weights_dir: Option<PathBuf>,
        /// First sample to show
        #[arg(long, default_value_t = 0)]
        sample: usize,
        /// Raster width in columns
        #[arg(long, default_value_t = 80)]
        width: usize,
        #[arg(long)]
        rate: bool,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    // Leave alternate screen and show cursor
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn run_raster<B: RasterBackend>(backend: B, width: usize) -> Result<()> {
    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    // Ensure terminal is restored on panic
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    let mut app = App::new(backend, width);
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let outcome = (|| -> Result<()> {
        loop {
            draw(&mut terminal, &app)?;

            let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or(Duration::from_millis(0));

            if event::poll(timeout)? {
                if let CEvent::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('s') => app.step()?,
                        KeyCode::Char('r') => app.toggle_running(),
                        KeyCode::Char('n') => app.next_sample()?,
                        _ => {}
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if app.running {
                    app.step()?;
                }
                last_tick = Instant::now();
            }
        }
    })();

    // Cleanup
    restore_terminal()?;
    outcome
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Generate { out_dir, samples_per_class, mean_positive, mean_negative, std_dev, seed, raw } => {
            let spec = ClusterSpec { samples_per_class, mean_positive, mean_negative, std_dev, normalize: !raw };
            commands::generate(&out_dir, &spec, seed)
        }
        Command::Train { data, weights_dir, epochs, seed, learning_rate, batch_size, rate, record_inputs } => {
            let overrides = Overrides { epochs, seed, learning_rate, batch_size, rate_encoding: rate };
            let config = commands::load_config(config_path, &overrides)?;
            let dataset = commands::load_dataset(&data.data, &data.labels, data.normalize)?;
            commands::train(config, &dataset, &weights_dir, record_inputs.as_deref())
        }
        Command::Eval { data, weights_dir, quantized, outputs, rate } => {
            let overrides = Overrides { rate_encoding: rate, ..Overrides::default() };
            let config = commands::load_config(config_path, &overrides)?;
            let dataset = commands::load_dataset(&data.data, &data.labels, data.normalize)?;
            commands::eval(&config, &dataset, &weights_dir, quantized, outputs.as_deref())
        }
        Command::Compare { a, b, strict } => commands::compare_files(&a, &b, strict),
        Command::Raster { data, weights_dir, sample, width, rate } => {
            let overrides = Overrides { rate_encoding: rate, ..Overrides::default() };
            let config = commands::load_config(config_path, &overrides)?;
            let dataset = commands::load_dataset(&data.data, &data.labels, data.normalize)?;
            let network = match weights_dir {
                Some(dir) => load_network(&dir, &config.network)
                    .with_context(|| format!("loading weights from {}", dir.display()))?,
                None => SpikingNetwork::random(&config.network, &mut ChaCha8Rng::seed_from_u64(config.seed))?,
            };
            let backend = NetworkBackend::new(network, dataset, sample, config.seed)?;
            run_raster(backend, width)
        }
    }
}
