use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{debug, info, warn};

use clicker::config::{self as cfg, SequenceConfig};
use clicker::executor::{ActionExecutor, EngineOptions};
use clicker::session::Session;

/// How often the foreground drains playback events.
const PUMP_INTERVAL: Duration = Duration::from_millis(100);

/// Clicker CLI
#[derive(Debug, Parser)]
#[command(
    name = clicker::PKG_NAME,
    version = clicker::PKG_VERSION,
    about = "Replay a recorded mouse/keyboard sequence in a loop"
)]
struct Args {
    /// Path to the JSON action template
    #[arg(short = 't', long = "template")]
    template: Option<PathBuf>,

    /// Seconds to wait after each step that has no delay of its own
    #[arg(short = 'd', long = "delay", default_value_t = 1.0)]
    delay: f64,

    /// Number of passes over the sequence (0 = until Ctrl+C)
    #[arg(short = 'l', long = "loops", default_value_t = 0, allow_negative_numbers = true)]
    loops: i64,

    /// Pause between two passes, in milliseconds
    #[arg(long = "inter-loop-ms", default_value_t = 100)]
    inter_loop_ms: u64,

    /// Enable dry-run mode (log actions instead of simulating input)
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Write the full session log to this file on exit
    #[arg(long = "save-log")]
    save_log: Option<PathBuf>,

    /// Print the JSON Schema for templates and exit
    #[arg(long = "print-schema")]
    print_schema: bool,

    /// Print the pointer position and the color under it, then exit
    #[arg(long = "locate")]
    locate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    clicker::init_tracing(args.log_level.as_deref());
    info!(
        version = clicker::PKG_VERSION,
        dry_run = args.dry_run,
        "Starting Clicker"
    );

    if args.print_schema {
        cfg::write_schema_to_writer(std::io::stdout().lock())?;
        println!();
        return Ok(());
    }

    let options = EngineOptions {
        inter_loop_pause: Duration::from_millis(args.inter_loop_ms),
        ..EngineOptions::default()
    };
    let mut session = Session::new(ActionExecutor::new(args.dry_run), options);

    if args.locate {
        let picked = session
            .pick_at_cursor()
            .context("Failed to read the pointer position")?;
        match picked.rgb {
            Some(rgb) => println!("X={}, Y={}, Color={rgb}", picked.x, picked.y),
            None => println!("X={}, Y={}, Color=N/A", picked.x, picked.y),
        }
        return Ok(());
    }

    let Some(template) = args.template.as_ref() else {
        bail!("No template given; pass --template <PATH> (or --print-schema / --locate)");
    };

    let config = SequenceConfig::new(args.delay, args.loops).context("Invalid playback settings")?;
    session.set_config(config);

    let actions = cfg::load_from_path_async(template)
        .await
        .with_context(|| format!("Failed to load template {}", template.display()))?;
    session.replace_actions(actions)?;
    debug!(target: "clicker", "Template loaded successfully");

    session.start().context("Failed to start playback")?;

    let mut ticker = tokio::time::interval(PUMP_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    // Main loop: drain playback events until the run ends, or stop on Ctrl+C
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.pump();
                if !session.is_running() {
                    break;
                }
            }
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match res {
                    Ok(()) => {
                        info!("Received Ctrl+C, stopping playback");
                        session.stop();
                    }
                    Err(err) => warn!(error = %err, "Failed to listen for Ctrl+C"),
                }
            }
        }
    }
    session.shutdown();

    if let Some(path) = &args.save_log {
        session
            .export_log(path)
            .with_context(|| format!("Failed to save log to {}", path.display()))?;
    }

    info!("Clicker exited");
    Ok(())
}
