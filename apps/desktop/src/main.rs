use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    DispatchOutcome, ErrorFlag, FileCache, HeadlessSurface, HttpTransport, MemoryCache, Session,
    StateCache,
};
use shared::domain::{ConfigKey, DeviceState, RgbaFraction};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod config;
mod input;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "lightctl", about = "Control a networked status light")]
struct Cli {
    /// Config file; defaults to ./lightctl.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    device_url: Option<String>,
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,
    /// Keep hostname and custom status in memory only.
    #[arg(long, global = true)]
    no_cache: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the device state.
    State,
    /// Print the device hostname.
    Hostname,
    /// Change one setting: speed, mode, status or brightness.
    Set {
        #[arg(value_parser = parse_key)]
        key: ConfigKey,
        value: String,
    },
    /// Set the light color; alpha is a fraction between 0 and 1.
    Color {
        r: u8,
        g: u8,
        b: u8,
        #[arg(long, default_value_t = 1.0)]
        alpha: f64,
    },
    /// Keep a session open, reading commands from stdin and printing state changes.
    Watch {
        #[arg(long)]
        poll_interval_secs: Option<u64>,
    },
}

fn parse_key(raw: &str) -> Result<ConfigKey, String> {
    ConfigKey::from_label(raw)
        .ok_or_else(|| format!("expected one of speed, mode, status, brightness; got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.device_url {
        settings.device_url = url;
    }
    if let Some(path) = cli.cache_path {
        settings.cache_path = Some(path);
    }
    if cli.no_cache {
        settings.cache_path = None;
    }
    if let Command::Watch {
        poll_interval_secs: Some(secs),
    } = &cli.command
    {
        settings.poll_interval_secs = Some(*secs);
    }

    let transport = HttpTransport::new(&settings.device_url)
        .with_context(|| format!("cannot use device url '{}'", settings.device_url))?;
    let cache: Arc<dyn StateCache> = match &settings.cache_path {
        Some(path) => Arc::new(FileCache::open(path.clone())),
        None => Arc::new(MemoryCache::default()),
    };
    let (surface, events) = HeadlessSurface::new();
    let surface = Arc::new(surface);
    let session = Session::new(
        Arc::new(transport),
        surface.clone(),
        Arc::new(ErrorFlag::default()),
        Arc::clone(&cache),
        settings.session_config(),
    );

    match cli.command {
        Command::State => {
            session.start().await.context("failed to read device state")?;
            print_state(&session.state())?;
        }
        Command::Hostname => {
            session
                .update_hostname()
                .await
                .context("failed to read device hostname")?;
            if let Some(hostname) = cache.hostname() {
                println!("{hostname}");
            }
        }
        Command::Set { key, value } => {
            session.start().await.context("failed to read device state")?;
            let outcome = session
                .dispatcher()
                .dispatch(key, &value)
                .await
                .with_context(|| format!("failed to set {key}"))?;
            report(outcome, key.as_str(), &value)?;
            print_state(&session.state())?;
        }
        Command::Color { r, g, b, alpha } => {
            session.start().await.context("failed to read device state")?;
            let outcome = session
                .dispatcher()
                .dispatch_color(RgbaFraction { r, g, b, alpha }, true)
                .await
                .context("failed to set color")?;
            report(outcome, "color", &format!("{r} {g} {b}"))?;
            print_state(&session.state())?;
        }
        Command::Watch { .. } => watch(session, surface, events).await?,
    }

    Ok(())
}

fn report(outcome: DispatchOutcome, setting: &str, value: &str) -> Result<()> {
    match outcome {
        DispatchOutcome::Sent => Ok(()),
        DispatchOutcome::Suppressed => {
            eprintln!("{setting} is already {value}");
            Ok(())
        }
        DispatchOutcome::Rejected => bail!("'{value}' is not a valid {setting}"),
        DispatchOutcome::Debounced | DispatchOutcome::Ignored => {
            bail!("change was not sent ({outcome:?})")
        }
    }
}

fn print_state(state: &DeviceState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}

async fn watch(
    session: Arc<Session>,
    surface: Arc<HeadlessSurface>,
    events: tokio::sync::mpsc::UnboundedReceiver<client_core::ControlEvent>,
) -> Result<()> {
    if let Err(error) = session.start().await {
        warn!(%error, "initial refresh failed; type 'refresh' to retry");
    }
    let mut shown = session.state();
    print_state(&shown)?;
    eprintln!("{}", input::HELP);

    let runner = tokio::spawn(Arc::clone(&session).run(events));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match input::parse_line(&line) {
                    Ok(Some(input::Input::Quit)) => break,
                    Ok(Some(command)) => input::feed(&surface, command),
                    Ok(None) => {}
                    Err(message) => eprintln!("{message}"),
                }
            }
            _ = ticker.tick() => {
                let state = session.state();
                if state != shown {
                    print_state(&state)?;
                    shown = state;
                }
            }
        }
    }

    runner.abort();
    Ok(())
}
