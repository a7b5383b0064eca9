// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Fan-out of on-air frequencies to per-band panadapter receivers.
//!
//! Each sink gets `F <hz>\n` lines for the frequencies in its band. Writes
//! happen on a background task so the rigctl loop never waits on a slow
//! receiver; a sink that fails once is dropped until restart.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use civsat_core::{Band, Freq};

const FANOUT_QUEUE: usize = 64;
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One receiver connection.
pub struct PanadapterSink {
    band: Band,
    label: String,
    writer: BoxedWriter,
}

impl PanadapterSink {
    pub fn new(band: Band, label: impl Into<String>, writer: BoxedWriter) -> Self {
        Self {
            band,
            label: label.into(),
            writer,
        }
    }
}

/// Handle for queueing frequencies; clones share one background task.
#[derive(Clone, Default)]
pub struct PanadapterFanout {
    tx: Option<mpsc::Sender<Freq>>,
}

impl PanadapterFanout {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Connect to every configured sink; unreachable ones are skipped.
    pub async fn connect(sinks: &[(Band, SocketAddr)], connect_timeout: Duration) -> Self {
        let mut connected = Vec::new();
        for (band, addr) in sinks {
            match timeout(connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    info!("Panadapter {} connected at {}", band.range_label(), addr);
                    let (reader, writer) = stream.into_split();
                    tokio::spawn(discard_replies(reader, addr.to_string()));
                    connected.push(PanadapterSink::new(
                        *band,
                        format!("{} {}", band.range_label(), addr),
                        Box::new(writer),
                    ));
                }
                Ok(Err(e)) => warn!(
                    "Panadapter {} at {} unavailable: {}",
                    band.range_label(),
                    addr,
                    e
                ),
                Err(_) => warn!(
                    "Panadapter {} at {} timed out after {:?}",
                    band.range_label(),
                    addr,
                    connect_timeout
                ),
            }
        }
        if connected.is_empty() {
            warn!("No panadapter sinks connected; fan-out disabled");
            return Self::disabled();
        }
        Self::spawn(connected)
    }

    /// Start the fan-out task over already-open sinks.
    pub fn spawn(sinks: Vec<PanadapterSink>) -> Self {
        let (tx, rx) = mpsc::channel(FANOUT_QUEUE);
        tokio::spawn(run_fanout(rx, sinks));
        Self { tx: Some(tx) }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue `freq` for its band's sink without waiting.
    pub fn forward(&self, freq: Freq) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(e) = tx.try_send(freq) {
            debug!("Panadapter update {} dropped: {}", freq, e);
        }
    }
}

fn format_line(freq: Freq) -> String {
    format!("F {}\n", freq.hz)
}

async fn run_fanout(mut rx: mpsc::Receiver<Freq>, mut sinks: Vec<PanadapterSink>) {
    while let Some(freq) = rx.recv().await {
        let band = freq.band();
        let line = format_line(freq);
        let mut failed = Vec::new();
        for (idx, sink) in sinks.iter_mut().enumerate() {
            if sink.band != band {
                continue;
            }
            match timeout(WRITE_TIMEOUT, sink.writer.write_all(line.as_bytes())).await {
                Ok(Ok(())) => debug!("Panadapter {} <- {}", sink.label, freq),
                Ok(Err(e)) => {
                    warn!("Panadapter {} write failed, dropping: {}", sink.label, e);
                    failed.push(idx);
                }
                Err(_) => {
                    warn!("Panadapter {} write timed out, dropping", sink.label);
                    failed.push(idx);
                }
            }
        }
        for idx in failed.into_iter().rev() {
            sinks.remove(idx);
        }
        if sinks.is_empty() {
            warn!("All panadapter sinks lost");
            break;
        }
    }
}

/// Receivers answer each `F` line; those replies carry nothing we use.
async fn discard_replies<R: AsyncRead + Unpin>(mut reader: R, label: String) {
    let mut buf = [0u8; 256];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Panadapter {} closed", label);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Panadapter {} read error: {}", label, e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(Freq::new(435_000_000)), "F 435000000\n");
    }

    #[test]
    fn test_disabled_forward_is_noop() {
        let fanout = PanadapterFanout::disabled();
        assert!(!fanout.is_enabled());
        fanout.forward(Freq::new(145_900_000));
    }

    #[tokio::test]
    async fn test_routes_by_band() {
        let (vhf_tx, vhf_rx) = duplex(256);
        let (uhf_tx, uhf_rx) = duplex(256);
        let fanout = PanadapterFanout::spawn(vec![
            PanadapterSink::new(Band::TwoMeters, "vhf", Box::new(vhf_tx)),
            PanadapterSink::new(Band::SeventyCentimeters, "uhf", Box::new(uhf_tx)),
        ]);

        fanout.forward(Freq::new(435_012_345));
        fanout.forward(Freq::new(1_295_000_000));
        fanout.forward(Freq::new(145_900_000));

        let mut vhf = BufReader::new(vhf_rx).lines();
        let mut uhf = BufReader::new(uhf_rx).lines();
        assert_eq!(vhf.next_line().await.unwrap().unwrap(), "F 145900000");
        assert_eq!(uhf.next_line().await.unwrap().unwrap(), "F 435012345");
    }

    #[tokio::test]
    async fn test_failed_sink_is_dropped() {
        let (dead_tx, dead_rx) = duplex(64);
        drop(dead_rx);
        let (live_tx, live_rx) = duplex(256);
        let fanout = PanadapterFanout::spawn(vec![
            PanadapterSink::new(Band::TwoMeters, "dead", Box::new(dead_tx)),
            PanadapterSink::new(Band::TwoMeters, "live", Box::new(live_tx)),
        ]);

        fanout.forward(Freq::new(145_800_000));
        fanout.forward(Freq::new(145_810_000));

        let mut live = BufReader::new(live_rx).lines();
        assert_eq!(live.next_line().await.unwrap().unwrap(), "F 145800000");
        assert_eq!(live.next_line().await.unwrap().unwrap(), "F 145810000");
    }

    #[tokio::test]
    async fn test_replies_are_discarded_until_close() {
        let (mut remote, local) = duplex(64);
        let task = tokio::spawn(discard_replies(local, "test".to_string()));
        remote.write_all(b"RPRT 0\n").await.unwrap();
        drop(remote);
        task.await.unwrap();
    }
}
