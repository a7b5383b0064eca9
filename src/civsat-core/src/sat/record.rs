// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Satellite list: one `name,mode,rit,satmode` record per line.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::radio::freq::Band;
use crate::sat::controller::MAX_RIT_HZ;

#[derive(Debug, Error)]
pub enum SatelliteFileError {
    #[error("Failed to read satellite file {0}: {1}")]
    Read(PathBuf, String),

    #[error("line {line}: {reason}")]
    Line { line: usize, reason: String },
}

/// Uplink operating mode of a satellite transponder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UplinkMode {
    SSB,
    CW,
    FM,
    #[serde(rename = "FM-D")]
    FMD,
    #[serde(rename = "SSB-D")]
    SSBD,
}

impl UplinkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UplinkMode::SSB => "SSB",
            UplinkMode::CW => "CW",
            UplinkMode::FM => "FM",
            UplinkMode::FMD => "FM-D",
            UplinkMode::SSBD => "SSB-D",
        }
    }
}

impl fmt::Display for UplinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UplinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SSB" => Ok(UplinkMode::SSB),
            "CW" => Ok(UplinkMode::CW),
            "FM" => Ok(UplinkMode::FM),
            "FM-D" => Ok(UplinkMode::FMD),
            "SSB-D" => Ok(UplinkMode::SSBD),
            other => Err(format!(
                "unknown mode '{}' (expected SSB, CW, FM, FM-D or SSB-D)",
                other
            )),
        }
    }
}

/// Uplink and downlink band pair, written `U/V` (uplink first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatMode {
    pub uplink: Band,
    pub downlink: Band,
}

impl SatMode {
    /// Cross-band operation; uplink and downlink on different front ends.
    pub fn is_duplex(&self) -> bool {
        self.uplink != self.downlink
    }
}

impl fmt::Display for SatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.uplink.code(), self.downlink.code())
    }
}

impl FromStr for SatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        let (Some(up), Some(down), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("sat mode '{}' must look like U/V", s.trim()));
        };
        let band = |code: &str| {
            let mut chars = code.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Band::from_code(c),
                _ => None,
            }
        };
        match (band(up), band(down)) {
            (Some(uplink), Some(downlink)) => Ok(SatMode { uplink, downlink }),
            _ => Err(format!(
                "sat mode '{}' uses an unknown band (expected V, U, L or S)",
                s.trim()
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteRecord {
    pub name: String,
    pub uplink_mode: UplinkMode,
    /// Receive offset in Hz applied to the downlink.
    pub rit: i32,
    pub sat_mode: SatMode,
}

impl SatelliteRecord {
    /// Display/lookup string; a satellite may be listed once per mode.
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.uplink_mode)
    }
}

impl FromStr for SatelliteRecord {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [name, mode, rit, sat_mode] = fields.as_slice() else {
            return Err(format!(
                "expected 4 fields (name,mode,rit,satmode), got {}",
                fields.len()
            ));
        };
        if name.is_empty() {
            return Err("satellite name is empty".to_string());
        }
        let rit = rit
            .parse::<i32>()
            .map_err(|e| format!("invalid rit '{}': {}", rit, e))?;
        if rit.unsigned_abs() > MAX_RIT_HZ.unsigned_abs() {
            return Err(format!(
                "rit {} Hz out of range (limit +/-{} Hz)",
                rit, MAX_RIT_HZ
            ));
        }
        Ok(SatelliteRecord {
            name: name.to_string(),
            uplink_mode: mode.parse()?,
            rit,
            sat_mode: sat_mode.parse()?,
        })
    }
}

/// Parse satellite list text. Blank lines and `#` comments are skipped.
pub fn parse_satellites(text: &str) -> Result<Vec<SatelliteRecord>, SatelliteFileError> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| {
            let l = l.trim();
            !l.is_empty() && !l.starts_with('#')
        })
        .map(|(idx, l)| {
            l.parse().map_err(|reason| SatelliteFileError::Line {
                line: idx + 1,
                reason,
            })
        })
        .collect()
}

pub fn load_satellites_file(path: &Path) -> Result<Vec<SatelliteRecord>, SatelliteFileError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SatelliteFileError::Read(path.to_path_buf(), e.to_string()))?;
    parse_satellites(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let rec: SatelliteRecord = "AO-91,FM,0,U/V".parse().unwrap();
        assert_eq!(rec.name, "AO-91");
        assert_eq!(rec.uplink_mode, UplinkMode::FM);
        assert_eq!(rec.rit, 0);
        assert_eq!(
            rec.sat_mode,
            SatMode {
                uplink: Band::SeventyCentimeters,
                downlink: Band::TwoMeters,
            }
        );
        assert!(rec.sat_mode.is_duplex());
        assert_eq!(rec.label(), "AO-91 FM");
    }

    #[test]
    fn test_parse_trims_and_uppercases() {
        let rec: SatelliteRecord = " RS-44 , ssb , -150 , v/u ".parse().unwrap();
        assert_eq!(rec.name, "RS-44");
        assert_eq!(rec.uplink_mode, UplinkMode::SSB);
        assert_eq!(rec.rit, -150);
        assert_eq!(rec.sat_mode.to_string(), "V/U");
    }

    #[test]
    fn test_simplex_sat_mode() {
        let rec: SatelliteRecord = "ISS,FM-D,0,V/V".parse().unwrap();
        assert_eq!(rec.uplink_mode, UplinkMode::FMD);
        assert!(!rec.sat_mode.is_duplex());
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!("AO-91,FM,0".parse::<SatelliteRecord>().is_err());
        assert!("AO-91,FM,abc,U/V".parse::<SatelliteRecord>().is_err());
        assert!("AO-91,PSK,0,U/V".parse::<SatelliteRecord>().is_err());
        assert!("AO-91,FM,0,U/X".parse::<SatelliteRecord>().is_err());
        assert!("AO-91,FM,0,UV".parse::<SatelliteRecord>().is_err());
        assert!(",FM,0,U/V".parse::<SatelliteRecord>().is_err());
    }

    #[test]
    fn test_parse_rejects_rit_beyond_radio_range() {
        let err = "FO-99,SSB,20000,V/U".parse::<SatelliteRecord>().unwrap_err();
        assert!(err.contains("out of range"));
        assert!("FO-99,SSB,-10000,V/U".parse::<SatelliteRecord>().is_err());

        let edge: SatelliteRecord = "FO-99,SSB,-9999,V/U".parse().unwrap();
        assert_eq!(edge.rit, -9999);
    }

    #[test]
    fn test_parse_satellites_skips_comments_and_reports_line() {
        let text = "# name,mode,rit,satmode\nAO-91,FM,0,U/V\n\nRS-44,SSB,0,V/U\n";
        let sats = parse_satellites(text).unwrap();
        assert_eq!(sats.len(), 2);
        assert_eq!(sats[1].name, "RS-44");

        let err = parse_satellites("AO-91,FM,0,U/V\nbroken\n").unwrap_err();
        match err {
            SatelliteFileError::Line { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
