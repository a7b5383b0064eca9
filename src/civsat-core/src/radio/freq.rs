// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::fmt;

use serde::{Deserialize, Serialize};

/// Frequency wrapper (Hz).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Freq {
    pub hz: u64,
}

impl Freq {
    #[must_use]
    pub fn new(hz: u64) -> Self {
        Self { hz }
    }

    /// Shift by a signed offset, clamping at zero.
    #[must_use]
    pub fn offset_by(self, hz: i32) -> Self {
        Self {
            hz: self.hz.saturating_add_signed(i64::from(hz)),
        }
    }

    #[must_use]
    pub fn band(&self) -> Band {
        Band::from_hz(self.hz)
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hz)
    }
}

/// Satellite bands covered by the supported transceivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "2M")]
    TwoMeters,
    #[serde(rename = "70CM")]
    SeventyCentimeters,
    #[serde(rename = "23CM")]
    TwentyThreeCentimeters,
}

impl Band {
    /// Lowest frequency classified as 70 cm.
    pub const UHF_FLOOR_HZ: u64 = 150_000_000;
    /// Lowest frequency classified as 23 cm.
    pub const SHF_FLOOR_HZ: u64 = 470_000_000;

    pub const ALL: [Band; 3] = [
        Band::TwoMeters,
        Band::SeventyCentimeters,
        Band::TwentyThreeCentimeters,
    ];

    pub fn from_hz(hz: u64) -> Self {
        if hz >= Self::SHF_FLOOR_HZ {
            Band::TwentyThreeCentimeters
        } else if hz >= Self::UHF_FLOOR_HZ {
            Band::SeventyCentimeters
        } else {
            Band::TwoMeters
        }
    }

    /// Band letter as used in satellite mode notation (`U/V`, `L/U`).
    ///
    /// `S` is accepted as an alias for 23 cm since the transceivers top out
    /// there.
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'V' => Some(Band::TwoMeters),
            'U' => Some(Band::SeventyCentimeters),
            'L' | 'S' => Some(Band::TwentyThreeCentimeters),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Band::TwoMeters => 'V',
            Band::SeventyCentimeters => 'U',
            Band::TwentyThreeCentimeters => 'L',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::TwoMeters => "2M",
            Band::SeventyCentimeters => "70CM",
            Band::TwentyThreeCentimeters => "23CM",
        }
    }

    /// Generalized range label used for panadapter routing.
    pub fn range_label(self) -> &'static str {
        match self {
            Band::TwoMeters => "VHF",
            Band::SeventyCentimeters => "UHF",
            Band::TwentyThreeCentimeters => "SHF",
        }
    }

    /// Band-representative frequency tuned when a front end has to be moved
    /// onto this band.
    pub fn reference_freq(self) -> Freq {
        match self {
            Band::TwoMeters => Freq::new(145_900_000),
            Band::SeventyCentimeters => Freq::new(435_000_000),
            Band::TwentyThreeCentimeters => Freq::new(1_295_000_000),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
