// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod math;
pub mod radio;
pub mod rig;
pub mod sat;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use radio::freq::{Band, Freq};
pub use rig::mode::RigMode;
pub use rig::ops::{DuplexOffset, RigOp, Vfo};
pub use sat::controller::{DownlinkReading, FreqUpdate, SatController, TrackingThresholds};
pub use sat::record::{SatMode, SatelliteRecord, UplinkMode};
pub use sat::session::{GatewaySession, SessionPhase};
