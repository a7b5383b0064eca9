// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Radio setup sequences run when a satellite is selected.
//!
//! Uplink lives on MAIN and downlink on SUB for duplex work. Simplex work
//! keeps both on MAIN, transmitting on VFO B and receiving on VFO A.
//! The order of commands matters to the radio and is kept exactly.

use crate::rig::mode::RigMode;
use crate::rig::ops::{RigOp, Vfo};
use crate::rig::RigCapabilities;
use crate::sat::record::UplinkMode;

/// Uplink CTCSS tone for FM repeaters, 67.0 Hz.
pub const UPLINK_TONE_DECIHZ: u16 = 670;

/// Commands that bring the radio into the right VFO/mode layout.
///
/// Returns `None` for combinations without a defined layout (data modes in
/// duplex, SSB or CW in simplex).
pub fn start_sequence(
    mode: UplinkMode,
    duplex: bool,
    caps: &RigCapabilities,
) -> Option<Vec<RigOp>> {
    let mut ops = Vec::new();
    match (mode, duplex) {
        (UplinkMode::SSB | UplinkMode::CW, true) => {
            let uplink_mode = if mode == UplinkMode::CW {
                RigMode::CW
            } else {
                RigMode::LSB
            };
            ops.push(RigOp::SelectVfo(Vfo::Main));
            ops.push(RigOp::SelectVfo(Vfo::A));
            push_rit_reset(&mut ops, caps);
            ops.push(RigOp::Mode(uplink_mode));
            ops.push(RigOp::Split(false));
            ops.push(RigOp::SelectVfo(Vfo::Sub));
            ops.push(RigOp::SelectVfo(Vfo::A));
            ops.push(RigOp::Mode(RigMode::USB));
            if caps.native_rit {
                ops.push(RigOp::Rit(true));
            }
        }
        (UplinkMode::FM, true) => {
            ops.push(RigOp::SelectVfo(Vfo::Main));
            ops.push(RigOp::SelectVfo(Vfo::A));
            ops.push(RigOp::Mode(RigMode::FM));
            ops.push(RigOp::Split(false));
            ops.push(RigOp::Afc(false));
            push_rit_reset(&mut ops, caps);
            ops.push(RigOp::ToneFreq(UPLINK_TONE_DECIHZ));
            ops.push(RigOp::Tone(true));
            ops.push(RigOp::SelectVfo(Vfo::Sub));
            ops.push(RigOp::SelectVfo(Vfo::A));
            ops.push(RigOp::Mode(RigMode::FM));
            ops.push(RigOp::Tone(false));
            ops.push(RigOp::Afc(true));
            push_rit_reset(&mut ops, caps);
        }
        (UplinkMode::FM | UplinkMode::FMD | UplinkMode::SSBD, false) => {
            let rig_mode = match mode {
                UplinkMode::FMD => RigMode::FMD,
                UplinkMode::SSBD => RigMode::USBD,
                _ => RigMode::FM,
            };
            ops.push(RigOp::SelectVfo(Vfo::Main));
            ops.push(RigOp::SelectVfo(Vfo::B));
            ops.push(RigOp::Mode(rig_mode.clone()));
            ops.push(RigOp::Tone(false));
            ops.push(RigOp::Afc(false));
            push_rit_reset(&mut ops, caps);
            ops.push(RigOp::SelectVfo(Vfo::A));
            ops.push(RigOp::Mode(rig_mode));
            ops.push(RigOp::Tone(false));
            ops.push(RigOp::Split(true));
            ops.push(RigOp::Afc(false));
            push_rit_reset(&mut ops, caps);
        }
        _ => return None,
    }
    Some(ops)
}

fn push_rit_reset(ops: &mut Vec<RigOp>, caps: &RigCapabilities) {
    if caps.native_rit {
        ops.push(RigOp::RitFreq(0));
        ops.push(RigOp::Rit(false));
    }
}
