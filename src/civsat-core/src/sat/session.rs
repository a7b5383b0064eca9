// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::Serialize;

use crate::sat::record::SatelliteRecord;

/// Lifecycle of the satellite controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Start sequence running; serial access belongs to the selection.
    Selecting,
    Tracking,
}

/// Mutable gateway state shared by the control loop and the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct GatewaySession {
    pub phase: SessionPhase,
    pub selected: Option<SatelliteRecord>,
    /// Recomputed from the selected satellite's band pair on selection.
    pub is_duplex: bool,
    /// Desired downlink receive offset in Hz.
    pub rit: i32,
    /// Offset currently in effect on the radio.
    pub last_applied_rit: i32,
    /// Ignore downlink targets from the tracking application.
    pub is_downlink_constant: bool,
    pub loop_paused: bool,
    /// Bumped when a selection starts.
    pub selections: u64,
    pub last_uplink_hz: u64,
    /// Last nominal downlink written, RIT excluded.
    pub last_downlink_hz: u64,
}

impl Default for GatewaySession {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            selected: None,
            is_duplex: true,
            rit: 0,
            last_applied_rit: 0,
            is_downlink_constant: false,
            loop_paused: false,
            selections: 0,
            last_uplink_hz: 0,
            last_downlink_hz: 0,
        }
    }
}

impl GatewaySession {
    pub fn rit_pending(&self) -> bool {
        self.rit != self.last_applied_rit
    }

    /// RIT that is part of the received frequency.
    pub fn effective_rit(&self) -> i32 {
        if self.is_duplex {
            self.last_applied_rit
        } else {
            0
        }
    }
}
