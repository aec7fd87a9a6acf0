use std::path::PathBuf;
use std::thread;

use acquisition::{open_replay, open_serial, RenderMode, Session, SessionReport, StreamSource};
use anyhow::{anyhow, Context};
use clap::Parser;
use common::{load_config, SessionConfig, SystemClock};
use log::{info, warn};

/// Log readings from a serial instrument to CSV, optionally plotting them live.
#[derive(Parser, Debug)]
#[command(name = "serial-data-logger", version)]
struct Cli {
    /// Session configuration (TOML).
    #[arg(short, long, default_value = "configs/arduino_two_sensors.toml")]
    config: PathBuf,

    /// Serial endpoint, overriding `link.endpoint`.
    #[arg(short, long)]
    port: Option<String>,

    /// Link speed, overriding `link.baud_rate`.
    #[arg(short, long)]
    baud: Option<u32>,

    /// Plot while logging, whatever the config says.
    #[arg(long, conflicts_with = "no_plot")]
    plot: bool,

    /// Log without plotting, whatever the config says.
    #[arg(long)]
    no_plot: bool,

    /// Read lines from a captured text file instead of the serial port.
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,
}

type Source = Box<dyn StreamSource + Send>;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    apply_overrides(&mut config, &cli);

    let session = Session::new(config, SystemClock).context("could not start session")?;
    info!("logging to {}", session.output_path().display());

    let report = match session.mode() {
        RenderMode::Headless => {
            let source = open_source(&cli, session.config())?;
            session.run_headless(source)?
        }
        RenderMode::Live => run_live(session, &cli)?,
    };

    info!(
        "wrote {} samples in {} cycles to {}",
        report.samples,
        report.cycles,
        report.output.display()
    );
    if report.late_cycles > 0 {
        warn!(
            "{} cycles ran behind the instrument's pace; check time_step against the device",
            report.late_cycles
        );
    }
    Ok(())
}

fn apply_overrides(config: &mut SessionConfig, cli: &Cli) {
    if let Some(port) = &cli.port {
        config.link.endpoint = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.link.baud_rate = baud;
    }
    if cli.plot {
        config.plot_data_while_running = true;
    }
    if cli.no_plot {
        config.plot_data_while_running = false;
    }
}

fn open_source(cli: &Cli, config: &SessionConfig) -> anyhow::Result<Source> {
    if let Some(path) = &cli.replay {
        return Ok(Box::new(open_replay(path)?));
    }
    // Give the instrument a moment after the port is enumerated.
    thread::sleep(config.link.settle_delay());
    Ok(Box::new(open_serial(&config.link, config.read_timeout())?))
}

/// The window must own the main thread, so cycles are driven from a worker.
fn run_live(session: Session<SystemClock>, cli: &Cli) -> anyhow::Result<SessionReport> {
    let title = session.output_path().display().to_string();
    let sensors = session.plan().sensors;
    let source = open_source(cli, session.config())?;
    let (display, app) = live_view::live_view(title.clone());

    let worker = thread::Builder::new()
        .name("acquisition".to_string())
        .spawn(move || session.run(source, Some(display)))
        .context("could not start acquisition thread")?;

    let shown = live_view::run_window(app, &title, sensors);
    let outcome = worker
        .join()
        .map_err(|_| anyhow!("acquisition thread panicked"))?;
    shown.map_err(|e| anyhow!("live view failed: {}", e))?;
    Ok(outcome?)
}
