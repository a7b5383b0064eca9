// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for civsat-server.
//!
//! Config is loaded from the `[civsat-server]` section of `civsat.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./civsat.toml`
//! 3. `~/.config/civsat/civsat.toml`
//! 4. `/etc/civsat/civsat.toml`

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use civsat_app::{normalize_name, ConfigFile};
use civsat_backend_icom::IcomFamily;
use civsat_core::sat::controller::{MAX_RIT_HZ, RIT_STEP_HZ};
use civsat_core::{Band, TrackingThresholds};
use serde::{Deserialize, Serialize};

/// Top-level server configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Radio and serial link
    pub rig: RigConfig,
    /// Satellite list and doppler thresholds
    pub tracking: TrackingConfig,
    /// rigctl listener
    pub listen: ListenConfig,
    /// Panadapter sinks
    pub panadapter: PanadapterConfig,
    /// Operator console on stdin
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

/// Radio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Radio family: "ic9700" or "ic9100"
    pub family: String,
    /// CI-V address override; the family default when unset
    pub civ_address: Option<u8>,
    /// Time the radio gets to answer a command (ms)
    pub settle_ms: u64,
    /// AF gain applied at startup (0-255)
    pub af_level: Option<u8>,
    /// Squelch level applied at startup (0-255)
    pub squelch_level: Option<u8>,
    /// Serial port settings
    pub access: AccessConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            family: "ic9700".to_string(),
            civ_address: None,
            settle_ms: 40,
            af_level: None,
            squelch_level: None,
            access: AccessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Serial port path
    pub port: Option<String>,
    /// Baud rate
    pub baud: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Satellite list, one `name,mode,rit,satmode` record per line
    pub satellites_file: PathBuf,
    /// Minimum uplink change written to the radio (Hz)
    pub uplink_threshold_hz: u64,
    /// Minimum downlink change written to the radio (Hz)
    pub downlink_threshold_hz: u64,
    /// Console RIT step (Hz)
    pub rit_step_hz: i32,
    /// Pick up downlink dial changes announced by the radio
    pub follow_dial: bool,
    /// Satellite selected at startup, by label or name
    pub initial_satellite: Option<String>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let thresholds = TrackingThresholds::default();
        Self {
            satellites_file: PathBuf::from("satellites.txt"),
            uplink_threshold_hz: thresholds.uplink_hz,
            downlink_threshold_hz: thresholds.downlink_hz,
            rit_step_hz: RIT_STEP_HZ,
            follow_dial: false,
            initial_satellite: None,
        }
    }
}

impl TrackingConfig {
    pub fn thresholds(&self) -> TrackingThresholds {
        TrackingThresholds {
            uplink_hz: self.uplink_threshold_hz,
            downlink_hz: self.downlink_threshold_hz,
        }
    }
}

/// rigctl listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// IP address to listen on
    pub listen: IpAddr,
    /// TCP port to listen on
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4532,
        }
    }
}

/// Panadapter sinks, one per band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanadapterConfig {
    pub enabled: bool,
    /// Receives 2 m frequencies
    pub vhf: Option<SocketAddr>,
    /// Receives 70 cm frequencies
    pub uhf: Option<SocketAddr>,
    /// Receives 23 cm frequencies
    pub shf: Option<SocketAddr>,
    /// Connect timeout per sink (ms)
    pub connect_timeout_ms: u64,
}

impl Default for PanadapterConfig {
    fn default() -> Self {
        let local = |port| Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
        Self {
            enabled: false,
            vhf: local(7300),
            uhf: local(7301),
            shf: local(7302),
            connect_timeout_ms: 1000,
        }
    }
}

impl PanadapterConfig {
    /// Configured sinks paired with the band they receive.
    pub fn sinks(&self) -> Vec<(Band, SocketAddr)> {
        [
            (Band::TwoMeters, self.vhf),
            (Band::SeventyCentimeters, self.uhf),
            (Band::TwentyThreeCentimeters, self.shf),
        ]
        .into_iter()
        .filter_map(|(band, addr)| addr.map(|addr| (band, addr)))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Read operator commands from stdin
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        normalize_name(&self.rig.family)
            .parse::<IcomFamily>()
            .map_err(|e| format!("[rig].family: {e}"))?;
        if !(1..=1000).contains(&self.rig.settle_ms) {
            return Err("[rig].settle_ms must be in range 1..=1000".to_string());
        }
        if let Some(port) = &self.rig.access.port {
            if port.trim().is_empty() {
                return Err("[rig.access].port must not be empty".to_string());
            }
        }
        if self.rig.access.baud == Some(0) {
            return Err("[rig.access].baud must be > 0".to_string());
        }

        if self.tracking.satellites_file.as_os_str().is_empty() {
            return Err("[tracking].satellites_file must be set".to_string());
        }
        if !(1..=MAX_RIT_HZ).contains(&self.tracking.rit_step_hz) {
            return Err(format!(
                "[tracking].rit_step_hz must be in range 1..={}",
                MAX_RIT_HZ
            ));
        }

        if self.listen.port == 0 {
            return Err("[listen].port must be > 0".to_string());
        }

        if self.panadapter.enabled {
            if self.panadapter.sinks().is_empty() {
                return Err(
                    "[panadapter] is enabled but none of vhf, uhf, shf is set".to_string()
                );
            }
            if self.panadapter.connect_timeout_ms == 0 {
                return Err("[panadapter].connect_timeout_ms must be > 0".to_string());
            }
        }

        Ok(())
    }

    fn example() -> Self {
        ServerConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            rig: RigConfig {
                af_level: Some(64),
                squelch_level: Some(0),
                access: AccessConfig {
                    port: Some("/dev/ttyUSB0".to_string()),
                    baud: Some(115200),
                },
                ..RigConfig::default()
            },
            tracking: TrackingConfig {
                initial_satellite: Some("AO-91".to_string()),
                ..TrackingConfig::default()
            },
            ..ServerConfig::default()
        }
    }

    /// Generate an example `civsat.toml` with the `[civsat-server]` section.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "civsat-server")]
            inner: ServerConfig,
        }
        toml::to_string_pretty(&Wrapper {
            inner: Self::example(),
        })
        .unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "civsat-server"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.rig.family, "ic9700");
        assert_eq!(config.rig.settle_ms, 40);
        assert_eq!(config.listen.port, 4532);
        assert_eq!(config.listen.listen, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.tracking.uplink_threshold_hz, 40);
        assert_eq!(config.tracking.downlink_threshold_hz, 25);
        assert_eq!(config.tracking.rit_step_hz, 25);
        assert!(!config.panadapter.enabled);
        assert!(config.console.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[rig]
family = "ic9100"

[rig.access]
port = "/dev/ttyUSB1"
baud = 19200

[tracking]
satellites_file = "/etc/civsat/satellites.txt"
downlink_threshold_hz = 10
follow_dial = true

[panadapter]
enabled = true
uhf = "192.168.1.20:7301"
"#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rig.family, "ic9100");
        assert_eq!(config.rig.access.baud, Some(19200));
        assert_eq!(config.tracking.downlink_threshold_hz, 10);
        assert_eq!(config.tracking.uplink_threshold_hz, 40);
        assert!(config.tracking.follow_dial);
        assert_eq!(
            config.panadapter.uhf,
            Some("192.168.1.20:7301".parse().unwrap())
        );
        assert_eq!(config.panadapter.sinks().len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thresholds_from_config() {
        let mut config = TrackingConfig::default();
        config.uplink_threshold_hz = 100;
        assert_eq!(
            config.thresholds(),
            TrackingThresholds {
                uplink_hz: 100,
                downlink_hz: 25
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.general.log_level = Some("loud".to_string());
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.rig.family = "ic705".to_string();
        assert!(config.validate().unwrap_err().contains("[rig].family"));

        let mut config = ServerConfig::default();
        config.rig.access.baud = Some(0);
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.tracking.rit_step_hz = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.listen.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_model_style_family() {
        let mut config = ServerConfig::default();
        config.rig.family = "IC-9700".to_string();
        assert!(config.validate().is_ok());
        config.rig.family = "ic 9100".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_panadapter_needs_a_sink() {
        let mut config = ServerConfig::default();
        config.panadapter.enabled = true;
        config.panadapter.vhf = None;
        config.panadapter.uhf = None;
        config.panadapter.shf = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_combined_toml_round_trips() {
        let text = ServerConfig::example_combined_toml();
        assert!(text.contains("[civsat-server"));
        let table: toml::Table = toml::from_str(&text).unwrap();
        let inner = table["civsat-server"].clone();
        let config: ServerConfig = inner.try_into().unwrap();
        assert_eq!(config.rig.access.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.tracking.initial_satellite.as_deref(), Some("AO-91"));
        assert!(config.validate().is_ok());
    }
}
