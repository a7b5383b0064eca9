// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Operator console on stdin: satellite selection, RIT and downlink hold.

use std::fmt::Write as _;
use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use civsat_core::{SatController, SessionPhase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    /// 1-based index, label or name.
    Select(String),
    RitUp,
    RitDown,
    Rit(i32),
    DownlinkConstant(bool),
    Status,
    Help,
}

impl ConsoleCommand {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let cmd = match (word.to_ascii_lowercase().as_str(), rest) {
            ("", _) => return Ok(None),
            ("list" | "ls", "") => ConsoleCommand::List,
            ("sat", "") => return Err("usage: sat <index|label|name>".to_string()),
            ("sat", query) => ConsoleCommand::Select(query.to_string()),
            ("rit+", "") => ConsoleCommand::RitUp,
            ("rit-", "") => ConsoleCommand::RitDown,
            ("rit", value) => value
                .parse::<i32>()
                .map(ConsoleCommand::Rit)
                .map_err(|_| format!("usage: rit <hz>, got '{}'", value))?,
            ("dl", "const") => ConsoleCommand::DownlinkConstant(true),
            ("dl", "track") => ConsoleCommand::DownlinkConstant(false),
            ("dl", _) => return Err("usage: dl const|track".to_string()),
            ("status", "") => ConsoleCommand::Status,
            ("help" | "?", "") => ConsoleCommand::Help,
            _ => return Err(format!("unknown command '{}', try 'help'", line)),
        };
        Ok(Some(cmd))
    }
}

const HELP: &str = "\
list               show satellites
sat <n|name>       select a satellite
rit+ / rit-        nudge RIT by one step
rit <hz>           set RIT
dl const|track     hold or track the downlink
status             show the session
";

/// Run one command and return the text for the operator.
pub async fn execute(cmd: ConsoleCommand, controller: &SatController, rit_step: i32) -> String {
    match cmd {
        ConsoleCommand::List => {
            let mut out = String::new();
            for (idx, sat) in controller.satellites().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{:>3}  {:<24} {:<6} rit {}",
                    idx + 1,
                    sat.label(),
                    sat.sat_mode.to_string(),
                    sat.rit
                );
            }
            out
        }
        ConsoleCommand::Select(query) => {
            let record = match query.parse::<usize>() {
                Ok(n) => n
                    .checked_sub(1)
                    .and_then(|idx| controller.satellites().get(idx)),
                Err(_) => controller.find_satellite(&query),
            };
            match record.cloned() {
                Some(record) => {
                    controller.select_satellite(&record).await;
                    format!("tracking {}\n", record.label())
                }
                None => format!("no satellite matches '{}'\n", query),
            }
        }
        ConsoleCommand::RitUp => format!("rit {}\n", controller.adjust_rit(rit_step)),
        ConsoleCommand::RitDown => format!("rit {}\n", controller.adjust_rit(-rit_step)),
        ConsoleCommand::Rit(hz) => format!("rit {}\n", controller.set_rit(hz)),
        ConsoleCommand::DownlinkConstant(constant) => {
            controller.set_downlink_constant(constant);
            format!(
                "downlink {}\n",
                if constant { "constant" } else { "tracking" }
            )
        }
        ConsoleCommand::Status => {
            let s = controller.snapshot();
            let selected = s
                .selected
                .as_ref()
                .map(|r| r.label())
                .unwrap_or_else(|| "none".to_string());
            let phase = match s.phase {
                SessionPhase::Idle => "idle",
                SessionPhase::Selecting => "selecting",
                SessionPhase::Tracking => "tracking",
            };
            format!(
                "{} {} ({})\nuplink {} Hz, downlink {} Hz{}\nrit {} Hz (applied {})\n",
                phase,
                selected,
                if s.is_duplex { "duplex" } else { "simplex" },
                s.last_uplink_hz,
                s.last_downlink_hz,
                if s.is_downlink_constant {
                    " (constant)"
                } else {
                    ""
                },
                s.rit,
                s.last_applied_rit
            )
        }
        ConsoleCommand::Help => HELP.to_string(),
    }
}

/// Read stdin on a plain thread so a pending read never holds up shutdown.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub async fn run_console(
    mut lines: mpsc::Receiver<String>,
    controller: Arc<SatController>,
    rit_step: i32,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!("Console ready, type 'help' for commands");
    loop {
        let line = tokio::select! {
            line = lines.recv() => match line {
                Some(line) => line,
                None => {
                    debug!("Console input closed");
                    break;
                }
            },
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        };
        match ConsoleCommand::parse(&line) {
            Ok(Some(cmd)) => print!("{}", execute(cmd, &controller, rit_step).await),
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
}
