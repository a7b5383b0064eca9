// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

use crate::rig::mode::RigMode;

/// VFO / receiver selection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vfo {
    A,
    B,
    Main,
    Sub,
}

/// Repeater duplex offset direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplexOffset {
    Off,
    Minus,
    Plus,
    /// Duplex with a fixed downlink, used for cross-band work.
    Dd,
}

/// Fire-and-forget rig commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigOp {
    SelectVfo(Vfo),
    /// Swap MAIN and SUB bands.
    ExchangeBands,
    SatelliteMode(bool),
    DualWatch(bool),
    Mode(RigMode),
    /// CTCSS tone in tenths of Hz.
    ToneFreq(u16),
    Tone(bool),
    ToneSquelch(bool),
    Afc(bool),
    Split(bool),
    Rit(bool),
    /// RIT offset in Hz, at most four digits.
    RitFreq(i32),
    Duplex(DuplexOffset),
    SquelchLevel(u8),
    AfLevel(u8),
}
