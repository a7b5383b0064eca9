// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! CI-V framing and the request/response transport.
//!
//! Frames are `FE FE <dst> <src> <payload..> FD`. The bus is shared and
//! may echo our own frames, carry unsolicited transceive broadcasts, or
//! deliver partial frames, so every read drains what is buffered and keeps
//! only the last complete frame.

use std::fmt::Write as _;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::debug;

use civsat_core::DynResult;

pub const PREAMBLE: u8 = 0xFE;
pub const TERMINATOR: u8 = 0xFD;
pub const CONTROLLER_ADDR: u8 = 0x00;
pub const ACK: u8 = 0xFB;
pub const NAK: u8 = 0xFA;

/// Shortest meaningful frame: preamble, addresses, one byte, terminator.
const MIN_FRAME_LEN: usize = 6;
/// Bytes kept by a single drain; older bytes are discarded.
const MAX_DRAIN_LEN: usize = 2048;
/// Longest a drain keeps reading a bus that never goes quiet.
const MAX_DRAIN_TIME: Duration = Duration::from_millis(250);

/// A validated frame, preamble and terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CivFrame {
    pub dst: u8,
    pub src: u8,
    /// Command byte followed by sub-command/data.
    pub payload: Vec<u8>,
}

impl CivFrame {
    pub fn cmd(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Payload after the command byte.
    pub fn data(&self) -> &[u8] {
        self.payload.get(1..).unwrap_or(&[])
    }
}

/// What a read produced once resynchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CivReply {
    /// Nothing usable: silence, garbage, truncation or our own echo.
    Empty,
    Ack,
    Nak,
    Data(CivFrame),
}

pub fn encode_frame(dst: u8, src: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 5);
    frame.extend_from_slice(&[PREAMBLE, PREAMBLE, dst, src]);
    frame.extend_from_slice(payload);
    frame.push(TERMINATOR);
    frame
}

/// Keep only the bytes after the second-to-last terminator and accept them
/// when they form one well-delimited frame.
///
/// Trailing bytes after the last terminator make the result `None`.
pub fn extract_last_frame(buf: &[u8]) -> Option<&[u8]> {
    let terminators: Vec<usize> = buf
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == TERMINATOR)
        .map(|(i, _)| i)
        .collect();
    let start = match terminators.len() {
        0 => return None,
        1 => 0,
        n => terminators[n - 2] + 1,
    };
    let mut frame = &buf[start..];
    // Some radios pad the preamble.
    while frame.len() > 2 && frame[..3] == [PREAMBLE; 3] {
        frame = &frame[1..];
    }
    let well_formed = frame.len() >= MIN_FRAME_LEN
        && frame[0] == PREAMBLE
        && frame[1] == PREAMBLE
        && frame.last() == Some(&TERMINATOR);
    well_formed.then_some(frame)
}

/// Interpret a frame from [`extract_last_frame`] from the controller's side.
pub fn classify(frame: &[u8], radio_addr: u8) -> CivReply {
    if frame.len() < MIN_FRAME_LEN {
        return CivReply::Empty;
    }
    let dst = frame[2];
    let src = frame[3];
    let payload = &frame[4..frame.len() - 1];
    if dst == radio_addr && src == CONTROLLER_ADDR {
        return CivReply::Empty;
    }
    match payload {
        [ACK] => CivReply::Ack,
        [NAK] => CivReply::Nak,
        _ => CivReply::Data(CivFrame {
            dst,
            src,
            payload: payload.to_vec(),
        }),
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", b);
    }
    out
}

/// Serial CI-V link to one radio.
pub struct CivTransport<P> {
    port: P,
    radio_addr: u8,
    settle: Duration,
}

impl<P> CivTransport<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Time the radio gets to answer before the buffer is drained.
    pub const DEFAULT_SETTLE: Duration = Duration::from_millis(40);
    const POLL_TIMEOUT: Duration = Duration::from_millis(5);

    pub fn new(port: P, radio_addr: u8, settle: Duration) -> Self {
        Self {
            port,
            radio_addr,
            settle,
        }
    }

    pub fn radio_addr(&self) -> u8 {
        self.radio_addr
    }

    /// Write one command frame and read the answer.
    pub async fn send(&mut self, payload: &[u8]) -> DynResult<CivReply> {
        let frame = encode_frame(self.radio_addr, CONTROLLER_ADDR, payload);
        debug!("CI-V tx {}", hex(&frame));
        self.port.write_all(&frame).await?;
        self.port.flush().await?;
        sleep(self.settle).await;
        Ok(self.receive().await)
    }

    /// Drain whatever is buffered and resynchronize on the last frame.
    pub async fn receive(&mut self) -> CivReply {
        let buf = self.drain().await;
        if buf.is_empty() {
            return CivReply::Empty;
        }
        debug!("CI-V rx {}", hex(&buf));
        match extract_last_frame(&buf) {
            Some(frame) => classify(frame, self.radio_addr),
            None => {
                debug!("CI-V rx discarded, no complete frame");
                CivReply::Empty
            }
        }
    }

    /// Read until the bus is quiet, keeping the newest `MAX_DRAIN_LEN` bytes.
    async fn drain(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 64];
        let mut discarded = 0usize;
        let deadline = Instant::now() + MAX_DRAIN_TIME;
        while Instant::now() < deadline {
            match timeout(Self::POLL_TIMEOUT, self.port.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    out.extend_from_slice(&chunk[..n]);
                    if out.len() > MAX_DRAIN_LEN {
                        let excess = out.len() - MAX_DRAIN_LEN;
                        out.drain(..excess);
                        discarded += excess;
                    }
                }
                Ok(Err(e)) => {
                    debug!("CI-V read error: {}", e);
                    break;
                }
                Err(_) => break,
            }
        }
        if discarded > 0 {
            debug!("CI-V rx overflow, {} stale bytes discarded", discarded);
        }
        out
    }
}
