// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mode supported by the rig.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RigMode {
    LSB,
    USB,
    CW,
    AM,
    FM,
    /// FM with the data modulator input selected.
    FMD,
    /// USB with the data modulator input selected.
    USBD,
    Other(String),
}

impl RigMode {
    pub fn as_str(&self) -> &str {
        match self {
            RigMode::LSB => "LSB",
            RigMode::USB => "USB",
            RigMode::CW => "CW",
            RigMode::AM => "AM",
            RigMode::FM => "FM",
            RigMode::FMD => "FM-D",
            RigMode::USBD => "USB-D",
            RigMode::Other(s) => s,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, RigMode::FMD | RigMode::USBD)
    }
}

impl fmt::Display for RigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
