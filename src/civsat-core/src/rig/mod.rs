// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::radio::freq::Freq;
use crate::DynResult;

pub mod mode;
pub mod ops;
pub mod sequence;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

use ops::RigOp;

/// Alias to reduce type complexity in SatRig.
pub type RigFuture<'a, T> = Pin<Box<dyn Future<Output = DynResult<T>> + Send + 'a>>;

/// How this backend communicates with the rig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RigAccessMethod {
    Serial { path: String, baud: u32 },
}

/// Static info describing a rig backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigInfo {
    pub manufacturer: String,
    pub model: String,
    /// CI-V bus address of the radio.
    pub address: u8,
    pub capabilities: RigCapabilities,
    pub access: RigAccessMethod,
}

/// Radio-family feature flags the satellite controller branches on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigCapabilities {
    /// Radio accepts the CI-V RIT on/off and RIT frequency commands.
    pub native_rit: bool,
    /// Radio can retune the unselected VFO without switching to it.
    pub unselected_vfo_write: bool,
}

/// Common interface for rig backends.
pub trait Rig {
    fn info(&self) -> &RigInfo;
}

/// Operations the satellite controller needs from a transceiver.
///
/// Set-type commands go through [`SatRig::apply`]; an `Err` means the
/// command could not be sent at all. Frequency writes report whether the
/// radio acknowledged them. Queries degrade to `None` when the radio gives
/// no usable answer.
pub trait SatRig: Rig + Send {
    fn apply<'a>(&'a mut self, op: &'a RigOp) -> RigFuture<'a, ()>;

    fn set_frequency<'a>(&'a mut self, freq: Freq) -> RigFuture<'a, bool>;

    fn set_frequency_on_unselected_vfo<'a>(&'a mut self, freq: Freq) -> RigFuture<'a, bool>;

    fn get_frequency<'a>(&'a mut self) -> RigFuture<'a, Option<Freq>>;

    /// Frequency announced by the radio on its own (dial turned), if any
    /// arrived since the last exchange.
    fn poll_dial_frequency<'a>(&'a mut self) -> RigFuture<'a, Option<Freq>>;

    /// `false` while transmitting and also when the PTT state is unknown.
    fn is_ptt_off<'a>(&'a mut self) -> RigFuture<'a, bool>;
}
