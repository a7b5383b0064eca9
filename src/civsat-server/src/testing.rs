// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Controller fixture for server tests.

use std::sync::{Arc, Mutex};

use civsat_core::rig::mock::{MockRig, MockState};
use civsat_core::rig::RigCapabilities;
use civsat_core::{SatController, TrackingThresholds};

/// Controller over a [`MockRig`] with native RIT and a small satellite list.
pub fn test_controller() -> (Arc<SatController>, Arc<Mutex<MockState>>) {
    let (rig, state) = MockRig::new(RigCapabilities {
        native_rit: true,
        unselected_vfo_write: true,
    });
    let satellites = ["AO-91,FM,0,U/V", "RS-44,SSB,-150,V/U", "ISS,FM,0,V/V"]
        .iter()
        .map(|l| l.parse().unwrap())
        .collect();
    let controller = SatController::new(Box::new(rig), satellites, TrackingThresholds::default());
    (Arc::new(controller), state)
}
