// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! rigctld-compatible listener for satellite tracking programs.
//!
//! Only the subset a doppler tracker speaks is interpreted: `F`/`f` for the
//! downlink, `I`/`i` for the uplink, `t` and `q`. Everything else is
//! acknowledged so trackers probing capabilities keep going. One client is
//! served at a time.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use civsat_core::{Freq, FreqUpdate, SatController};

use crate::panadapter::PanadapterFanout;

/// Commands understood by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigctlCommand {
    SetDownlink(Freq),
    SetUplink(Freq),
    GetDownlink,
    GetUplink,
    GetPtt,
    Quit,
    /// Acknowledged without action.
    Other(String),
}

impl RigctlCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let Some(op) = parts.next() else {
            return Err("empty command".to_string());
        };
        let cmd = match op {
            "F" => RigctlCommand::SetDownlink(parse_freq_arg(op, parts.next())?),
            "I" => RigctlCommand::SetUplink(parse_freq_arg(op, parts.next())?),
            "f" => RigctlCommand::GetDownlink,
            "i" => RigctlCommand::GetUplink,
            "t" => RigctlCommand::GetPtt,
            "q" | "Q" => RigctlCommand::Quit,
            _ => RigctlCommand::Other(line.to_string()),
        };
        Ok(cmd)
    }
}

/// Hz with an optional fractional part, which is truncated.
fn parse_freq_arg(op: &str, arg: Option<&str>) -> Result<Freq, String> {
    let arg = arg.ok_or_else(|| format!("'{}' expects a frequency in Hz", op))?;
    let whole = match arg.split_once('.') {
        Some((whole, frac)) if frac.chars().all(|c| c.is_ascii_digit()) => whole,
        Some(_) => return Err(format!("'{}' frequency '{}' is not a number", op, arg)),
        None => arg,
    };
    whole
        .parse::<u64>()
        .map(Freq::new)
        .map_err(|_| format!("'{}' frequency '{}' is not a number", op, arg))
}

/// What a connection needs to serve commands.
#[derive(Clone)]
pub struct RigctlContext {
    pub controller: Arc<SatController>,
    pub fanout: PanadapterFanout,
    /// Poll for dial changes before every command.
    pub follow_dial: bool,
}

enum CommandResult {
    Reply(String),
    Close,
}

fn ok_only() -> String {
    "RPRT 0\n".to_string()
}

/// Answer for a query that does not apply in the current mode.
fn not_applicable() -> String {
    "RPRT\n".to_string()
}

fn freq_response(freq: Freq) -> String {
    format!("{}\n", freq.hz)
}

/// Accept clients one after another until shutdown.
pub async fn serve(
    listener: TcpListener,
    ctx: RigctlContext,
    mut shutdown_rx: watch::Receiver<bool>,
) -> io::Result<()> {
    info!("rigctl listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("rigctl accept failed: {}", e);
                    continue;
                }
            },
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        };
        info!("rigctl client connected: {}", addr);

        let result = tokio::select! {
            result = handle_client(stream, &ctx) => result,
            _ = wait_for_shutdown(&mut shutdown_rx) => break,
        };
        match result {
            Ok(()) => info!("rigctl client {} disconnected", addr),
            Err(e) => {
                let session = ctx.controller.snapshot();
                warn!(
                    "rigctl client {} dropped: {} (last uplink {} Hz, last downlink {} Hz)",
                    addr, e, session.last_uplink_hz, session.last_downlink_hz
                );
            }
        }
    }
    info!("rigctl listener stopped");
    Ok(())
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Serve one connection until it closes, quits or sends malformed input.
pub async fn handle_client<S>(stream: S, ctx: &RigctlContext) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        ctx.controller.wait_until_resumed().await;
        if let Some(on_air) = ctx.controller.sync_rit().await {
            ctx.fanout.forward(on_air);
        }
        if ctx.follow_dial {
            if let Some(reading) = ctx.controller.poll_dial().await {
                ctx.fanout.forward(reading.on_air);
            }
        }

        let cmd = RigctlCommand::parse(trimmed)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        match process_command(cmd, ctx).await {
            CommandResult::Reply(resp) => writer.write_all(resp.as_bytes()).await?,
            CommandResult::Close => break,
        }
        writer.flush().await?;
    }

    Ok(())
}

async fn process_command(cmd: RigctlCommand, ctx: &RigctlContext) -> CommandResult {
    let resp = match cmd {
        RigctlCommand::SetDownlink(freq) => {
            if let FreqUpdate::Written { on_air } = ctx.controller.apply_downlink(freq).await {
                ctx.fanout.forward(on_air);
            }
            ok_only()
        }
        RigctlCommand::SetUplink(freq) => {
            if let FreqUpdate::Written { on_air } = ctx.controller.apply_uplink(freq).await {
                if ctx.controller.snapshot().is_duplex {
                    ctx.fanout.forward(on_air);
                }
            }
            ok_only()
        }
        RigctlCommand::GetDownlink => match ctx.controller.query_downlink().await {
            Some(reading) => {
                ctx.fanout.forward(reading.on_air);
                freq_response(reading.nominal)
            }
            None => not_applicable(),
        },
        RigctlCommand::GetUplink => match ctx.controller.uplink_report() {
            Some(freq) => freq_response(freq),
            None => not_applicable(),
        },
        RigctlCommand::GetPtt => "0\n".to_string(),
        RigctlCommand::Quit => return CommandResult::Close,
        RigctlCommand::Other(line) => {
            debug!("rigctl command acknowledged without action: {}", line);
            ok_only()
        }
    };
    CommandResult::Reply(resp)
}
