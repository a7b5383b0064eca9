// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod console;
mod panadapter;
mod rigctl;
#[cfg(test)]
mod testing;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use civsat_app::{init_logging, normalize_name, ConfigFile};
use civsat_backend_icom::{IcomCiv, IcomFamily};
use civsat_core::rig::Rig;
use civsat_core::sat::load_satellites_file;
use civsat_core::{DynResult, SatController};

use config::ServerConfig;
use panadapter::PanadapterFanout;
use rigctl::RigctlContext;

const PKG_DESCRIPTION: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " - doppler tracking gateway for Icom CI-V radios"
);
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Radio family (ic9700, ic9100)
    #[arg(short = 'r', long = "family")]
    family: Option<String>,
    /// Radio CI-V serial port: <path> <baud>
    #[arg(value_name = "RIG_ADDR")]
    rig_addr: Option<String>,
    /// Satellite list file
    #[arg(short = 's', long = "satellites", value_name = "FILE")]
    satellites: Option<PathBuf>,
    /// Satellite to select at startup (label or name)
    #[arg(long = "satellite")]
    satellite: Option<String>,
    /// IP address for the rigctl listener
    #[arg(short = 'l', long = "listen")]
    listen: Option<IpAddr>,
    /// Port for the rigctl listener
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    /// Do not read operator commands from stdin
    #[arg(long = "no-console")]
    no_console: bool,
}

/// Parse a serial rig address of the form "<path> <baud>".
fn parse_serial_addr(addr: &str) -> DynResult<(String, u32)> {
    let mut parts = addr.split_whitespace();
    let path = parts
        .next()
        .ok_or("Serial rig address must be '<path> <baud>'")?;
    let baud_str = parts
        .next()
        .ok_or("Serial rig address must be '<path> <baud>'")?;
    if parts.next().is_some() {
        return Err("Serial rig address must be '<path> <baud>' (got extra data)".into());
    }
    let baud: u32 = baud_str
        .parse()
        .map_err(|e| format!("Invalid baud '{}': {}", baud_str, e))?;
    Ok((path.to_string(), baud))
}

/// Configuration after merging the config file and CLI arguments.
#[derive(Debug)]
struct ResolvedConfig {
    family: IcomFamily,
    port: String,
    baud: u32,
    satellites_file: PathBuf,
    initial_satellite: Option<String>,
    listen_addr: SocketAddr,
    console: bool,
}

fn resolve_config(cli: &Cli, cfg: &ServerConfig) -> DynResult<ResolvedConfig> {
    let family_name = cli.family.as_deref().unwrap_or(&cfg.rig.family);
    let family: IcomFamily = normalize_name(family_name).parse()?;

    let (port, baud) = match cli.rig_addr.as_deref() {
        Some(addr) => parse_serial_addr(addr)?,
        None => {
            let port = cfg.rig.access.port.clone().ok_or(
                "Serial port not specified. Pass RIG_ADDR or set [rig.access].port in config.",
            )?;
            let baud = cfg.rig.access.baud.unwrap_or(family.default_baud());
            (port, baud)
        }
    };

    Ok(ResolvedConfig {
        family,
        port,
        baud,
        satellites_file: cli
            .satellites
            .clone()
            .unwrap_or_else(|| cfg.tracking.satellites_file.clone()),
        initial_satellite: cli
            .satellite
            .clone()
            .or_else(|| cfg.tracking.initial_satellite.clone()),
        listen_addr: SocketAddr::new(
            cli.listen.unwrap_or(cfg.listen.listen),
            cli.port.unwrap_or(cfg.listen.port),
        ),
        console: cfg.console.enabled && !cli.no_console,
    })
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_combined_toml());
        return Ok(());
    }

    let (cfg, config_path) = ServerConfig::load(cli.config.as_deref())?;
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let resolved = resolve_config(&cli, &cfg)?;
    info!(
        "Starting civsat (radio: {}, serial {} @ {} baud)",
        resolved.family, resolved.port, resolved.baud
    );

    let satellites = load_satellites_file(&resolved.satellites_file)?;
    info!(
        "Loaded {} satellites from {}",
        satellites.len(),
        resolved.satellites_file.display()
    );

    let rig = IcomCiv::open(
        &resolved.port,
        resolved.baud,
        resolved.family,
        cfg.rig.civ_address,
        Duration::from_millis(cfg.rig.settle_ms),
    )?;
    info!(
        "Opened {} {} at CI-V address 0x{:02X}",
        rig.info().manufacturer,
        rig.info().model,
        rig.info().address
    );

    let controller = Arc::new(SatController::new(
        Box::new(rig),
        satellites,
        cfg.tracking.thresholds(),
    ));
    controller
        .apply_levels(cfg.rig.af_level, cfg.rig.squelch_level)
        .await;

    if let Some(query) = resolved.initial_satellite.as_deref() {
        match controller.find_satellite(query).cloned() {
            Some(record) => controller.select_satellite(&record).await,
            None => warn!("Initial satellite '{}' not in the satellite list", query),
        }
    }

    let fanout = if cfg.panadapter.enabled {
        PanadapterFanout::connect(
            &cfg.panadapter.sinks(),
            Duration::from_millis(cfg.panadapter.connect_timeout_ms),
        )
        .await
    } else {
        PanadapterFanout::disabled()
    };
    if fanout.is_enabled() {
        info!("Panadapter fan-out active");
    }

    let mut task_handles: Vec<JoinHandle<()>> = Vec::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listener = TcpListener::bind(resolved.listen_addr).await?;
    let ctx = RigctlContext {
        controller: controller.clone(),
        fanout,
        follow_dial: cfg.tracking.follow_dial,
    };
    let rigctl_shutdown_rx = shutdown_rx.clone();
    task_handles.push(tokio::spawn(async move {
        if let Err(e) = rigctl::serve(listener, ctx, rigctl_shutdown_rx).await {
            error!("rigctl server error: {}", e);
        }
    }));

    if resolved.console {
        let lines = console::spawn_stdin_reader();
        let console_controller = controller.clone();
        let console_shutdown_rx = shutdown_rx.clone();
        let rit_step = cfg.tracking.rit_step_hz;
        task_handles.push(tokio::spawn(console::run_console(
            lines,
            console_controller,
            rit_step,
            console_shutdown_rx,
        )));
    }

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    for handle in &task_handles {
        if !handle.is_finished() {
            handle.abort();
        }
    }
    for handle in task_handles {
        let _ = handle.await;
    }

    Ok(())
}
