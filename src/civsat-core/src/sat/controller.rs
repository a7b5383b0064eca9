// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Satellite state machine.
//!
//! `SatController` owns the rig and the [`GatewaySession`]. The control
//! surface drives selection and RIT; the rigctl loop feeds tracking targets
//! through it. Every serial exchange holds the rig lock, and selection holds
//! it for the whole start sequence while `loop_paused` keeps the loop from
//! queueing behind it. Tracking updates read the session only once the lock
//! is held and are dropped when a selection started in the meantime.

use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::radio::freq::{Band, Freq};
use crate::rig::ops::{RigOp, Vfo};
use crate::rig::sequence::start_sequence;
use crate::rig::{RigCapabilities, SatRig};
use crate::sat::record::SatelliteRecord;
use crate::sat::session::{GatewaySession, SessionPhase};

/// Operator RIT button step.
pub const RIT_STEP_HZ: i32 = 25;
/// RIT travel limit; the CI-V RIT field holds four digits.
pub const MAX_RIT_HZ: i32 = 9999;

/// Minimum change before a tracking target is written to the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingThresholds {
    pub uplink_hz: u64,
    pub downlink_hz: u64,
}

impl Default for TrackingThresholds {
    fn default() -> Self {
        Self {
            uplink_hz: 40,
            downlink_hz: 25,
        }
    }
}

/// Outcome of feeding a tracking target to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqUpdate {
    /// Too close to the last written value, or downlink held constant.
    Suppressed,
    /// Not written this time: transmitting, mid-selection, or the write failed.
    Deferred,
    /// Written; `on_air` is the frequency in use, RIT included.
    Written { on_air: Freq },
}

/// Downlink as read back from the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownlinkReading {
    /// Frequency the tracking application should see, RIT excluded.
    pub nominal: Freq,
    pub on_air: Freq,
}

pub struct SatController {
    rig: Mutex<Box<dyn SatRig>>,
    caps: RigCapabilities,
    thresholds: TrackingThresholds,
    satellites: Vec<SatelliteRecord>,
    session: watch::Sender<GatewaySession>,
}

impl SatController {
    pub fn new(
        rig: Box<dyn SatRig>,
        satellites: Vec<SatelliteRecord>,
        thresholds: TrackingThresholds,
    ) -> Self {
        let caps = rig.info().capabilities;
        let (session, _) = watch::channel(GatewaySession::default());
        Self {
            rig: Mutex::new(rig),
            caps,
            thresholds,
            satellites,
            session,
        }
    }

    pub fn capabilities(&self) -> RigCapabilities {
        self.caps
    }

    pub fn satellites(&self) -> &[SatelliteRecord] {
        &self.satellites
    }

    /// Look up by label (`"AO-91 FM"`), then by name, case-insensitively.
    pub fn find_satellite(&self, query: &str) -> Option<&SatelliteRecord> {
        let query = query.trim();
        self.satellites
            .iter()
            .find(|s| s.label().eq_ignore_ascii_case(query))
            .or_else(|| {
                self.satellites
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(query))
            })
    }

    pub fn snapshot(&self) -> GatewaySession {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GatewaySession> {
        self.session.subscribe()
    }

    /// Retune the radio for `record`: band placement, start sequence, RIT.
    ///
    /// Failing steps are logged and skipped; there is no rollback.
    pub async fn select_satellite(&self, record: &SatelliteRecord) {
        info!(
            "Selecting {} ({}, rit {} Hz)",
            record.label(),
            record.sat_mode,
            record.rit
        );
        self.session.send_modify(|s| {
            s.loop_paused = true;
            s.selections = s.selections.wrapping_add(1);
            s.phase = SessionPhase::Selecting;
        });

        let duplex = record.sat_mode.is_duplex();
        let rit = record.rit.clamp(-MAX_RIT_HZ, MAX_RIT_HZ);
        {
            let mut guard = self.rig.lock().await;
            let rig = guard.as_mut();
            run_op(rig, &RigOp::SatelliteMode(false)).await;
            run_op(rig, &RigOp::DualWatch(true)).await;
            place_uplink_band(rig, record.sat_mode.uplink).await;
            match start_sequence(record.uplink_mode, duplex, &self.caps) {
                Some(ops) => {
                    for op in &ops {
                        run_op(rig, op).await;
                    }
                }
                None => warn!(
                    "No start sequence for {} in {} operation; radio left as is",
                    record.uplink_mode,
                    if duplex { "duplex" } else { "simplex" }
                ),
            }

            self.session.send_modify(|s| {
                s.selected = Some(record.clone());
                s.is_duplex = duplex;
                s.rit = rit;
                s.last_applied_rit = 0;
                s.last_uplink_hz = 0;
                s.last_downlink_hz = 0;
                s.phase = SessionPhase::Tracking;
                s.loop_paused = false;
            });
        }
        info!("Tracking {}", record.label());
    }

    /// Nudge the desired RIT; returns the new value.
    pub fn adjust_rit(&self, delta_hz: i32) -> i32 {
        let mut rit = 0;
        self.session.send_modify(|s| {
            s.rit = s.rit.saturating_add(delta_hz).clamp(-MAX_RIT_HZ, MAX_RIT_HZ);
            rit = s.rit;
        });
        info!("RIT set to {} Hz", rit);
        rit
    }

    pub fn set_rit(&self, rit_hz: i32) -> i32 {
        let rit = rit_hz.clamp(-MAX_RIT_HZ, MAX_RIT_HZ);
        self.session.send_modify(|s| s.rit = rit);
        info!("RIT set to {} Hz", rit);
        rit
    }

    pub fn set_downlink_constant(&self, constant: bool) {
        self.session.send_modify(|s| s.is_downlink_constant = constant);
        info!(
            "Downlink {}",
            if constant { "held constant" } else { "tracking" }
        );
    }

    /// Block while a selection owns the radio.
    pub async fn wait_until_resumed(&self) {
        let mut rx = self.session.subscribe();
        let _ = rx.wait_for(|s| !s.loop_paused).await;
    }

    /// Take the rig for a tracking update.
    ///
    /// The returned session is read under the lock. `None` while a selection
    /// owns the radio, or when one started while this call waited for it.
    async fn lock_for_tracking(
        &self,
    ) -> Option<(MutexGuard<'_, Box<dyn SatRig>>, GatewaySession)> {
        let (paused, selections) = {
            let s = self.session.borrow();
            (s.loop_paused, s.selections)
        };
        if paused {
            debug!("Tracking update skipped, selection in progress");
            return None;
        }
        let guard = self.rig.lock().await;
        let view = self.snapshot();
        if view.loop_paused || view.selections != selections {
            debug!("Tracking update dropped, satellite selection intervened");
            return None;
        }
        Some((guard, view))
    }

    /// Apply optional AF and squelch levels once at startup.
    pub async fn apply_levels(&self, af_level: Option<u8>, squelch_level: Option<u8>) {
        let mut guard = self.rig.lock().await;
        if let Some(level) = af_level {
            run_op(guard.as_mut(), &RigOp::AfLevel(level)).await;
        }
        if let Some(level) = squelch_level {
            run_op(guard.as_mut(), &RigOp::SquelchLevel(level)).await;
        }
    }

    /// Bring the radio's RIT in line with the session.
    ///
    /// Returns the new on-air downlink when it is known.
    pub async fn sync_rit(&self) -> Option<Freq> {
        if !self.session.borrow().rit_pending() {
            return None;
        }
        let (mut guard, view) = self.lock_for_tracking().await?;
        if !view.rit_pending() {
            return None;
        }
        let rit = view.rit;
        if !view.is_duplex {
            self.session.send_modify(|s| s.last_applied_rit = rit);
            return None;
        }

        let rig = guard.as_mut();
        run_op(rig, &RigOp::SelectVfo(Vfo::Sub)).await;

        if self.caps.native_rit {
            if let Err(e) = rig.apply(&RigOp::RitFreq(rit)).await {
                warn!("RIT update to {} Hz failed: {}", rit, e);
                return None;
            }
            self.session.send_modify(|s| s.last_applied_rit = rit);
            debug!("RIT {} Hz pushed to radio", rit);
            return (view.last_downlink_hz != 0)
                .then(|| Freq::new(view.last_downlink_hz).offset_by(rit));
        }

        let Some(actual) = query_frequency(rig).await else {
            debug!("RIT correction postponed, no downlink reading");
            return None;
        };
        let nominal = actual.offset_by(-view.last_applied_rit);
        let target = nominal.offset_by(rit);
        match rig.set_frequency(target).await {
            Ok(true) => {}
            // Written but unconfirmed; the readback already includes it.
            Ok(false) => debug!("RIT retune to {} not acknowledged", target),
            Err(e) => {
                warn!("RIT retune to {} failed: {}", target, e);
                return None;
            }
        }
        self.session.send_modify(|s| {
            s.last_applied_rit = rit;
            s.last_downlink_hz = nominal.hz;
        });
        debug!("Downlink {} retuned to {} for RIT {} Hz", nominal, target, rit);
        Some(target)
    }

    pub async fn apply_uplink(&self, candidate: Freq) -> FreqUpdate {
        let Some((mut guard, view)) = self.lock_for_tracking().await else {
            return FreqUpdate::Deferred;
        };
        if candidate.hz.abs_diff(view.last_uplink_hz) <= self.thresholds.uplink_hz {
            return FreqUpdate::Suppressed;
        }

        let rig = guard.as_mut();
        let written = if view.is_duplex {
            run_op(rig, &RigOp::SelectVfo(Vfo::Main)).await;
            let written = rig.set_frequency(candidate).await;
            run_op(rig, &RigOp::SelectVfo(Vfo::Sub)).await;
            written
        } else {
            if !ptt_off(rig).await {
                debug!("Uplink {} deferred, transmitting", candidate);
                return FreqUpdate::Deferred;
            }
            if self.caps.unselected_vfo_write {
                rig.set_frequency_on_unselected_vfo(candidate).await
            } else {
                run_op(rig, &RigOp::SelectVfo(Vfo::B)).await;
                let written = rig.set_frequency(candidate).await;
                run_op(rig, &RigOp::SelectVfo(Vfo::A)).await;
                written
            }
        };

        match written {
            Ok(true) => {
                self.session.send_modify(|s| s.last_uplink_hz = candidate.hz);
                debug!("Uplink set to {}", candidate);
                FreqUpdate::Written { on_air: candidate }
            }
            Ok(false) => {
                debug!("Uplink {} not acknowledged", candidate);
                FreqUpdate::Deferred
            }
            Err(e) => {
                warn!("Uplink {} write failed: {}", candidate, e);
                FreqUpdate::Deferred
            }
        }
    }

    pub async fn apply_downlink(&self, candidate: Freq) -> FreqUpdate {
        let Some((mut guard, view)) = self.lock_for_tracking().await else {
            return FreqUpdate::Deferred;
        };
        if view.is_downlink_constant
            || candidate.hz.abs_diff(view.last_downlink_hz) <= self.thresholds.downlink_hz
        {
            return FreqUpdate::Suppressed;
        }

        let rit = view.effective_rit();
        let on_air = candidate.offset_by(rit);
        let rig = guard.as_mut();
        let written = if view.is_duplex {
            run_op(rig, &RigOp::SelectVfo(Vfo::Sub)).await;
            let dial = if self.caps.native_rit {
                candidate
            } else {
                on_air
            };
            rig.set_frequency(dial).await
        } else {
            if !ptt_off(rig).await {
                debug!("Downlink {} deferred, transmitting", candidate);
                return FreqUpdate::Deferred;
            }
            run_op(rig, &RigOp::SelectVfo(Vfo::A)).await;
            rig.set_frequency(candidate).await
        };

        match written {
            Ok(true) => {
                self.session
                    .send_modify(|s| s.last_downlink_hz = candidate.hz);
                debug!("Downlink set to {} (on air {})", candidate, on_air);
                FreqUpdate::Written { on_air }
            }
            Ok(false) => {
                debug!("Downlink {} not acknowledged", candidate);
                FreqUpdate::Deferred
            }
            Err(e) => {
                warn!("Downlink {} write failed: {}", candidate, e);
                FreqUpdate::Deferred
            }
        }
    }

    /// Read the downlink back from the radio (duplex only).
    ///
    /// The reading becomes the new last downlink so a dial change is not
    /// overwritten by the next tracking target within the threshold.
    pub async fn query_downlink(&self) -> Option<DownlinkReading> {
        let (mut guard, view) = self.lock_for_tracking().await?;
        if !view.is_duplex {
            return None;
        }
        let actual = query_frequency(guard.as_mut()).await?;
        let reading = self.downlink_reading(actual, view.effective_rit());
        self.session
            .send_modify(|s| s.last_downlink_hz = reading.nominal.hz);
        Some(reading)
    }

    /// Last uplink written (duplex only).
    pub fn uplink_report(&self) -> Option<Freq> {
        let session = self.session.borrow();
        session
            .is_duplex
            .then(|| Freq::new(session.last_uplink_hz))
    }

    /// Pick up a dial change announced by the radio on the downlink band.
    pub async fn poll_dial(&self) -> Option<DownlinkReading> {
        let (mut guard, view) = self.lock_for_tracking().await?;
        if !view.is_duplex {
            return None;
        }
        let downlink_band = view.selected.as_ref().map(|s| s.sat_mode.downlink)?;
        let pushed = match guard.poll_dial_frequency().await {
            Ok(pushed) => pushed?,
            Err(e) => {
                debug!("Dial poll failed: {}", e);
                return None;
            }
        };
        if pushed.band() != downlink_band {
            debug!("Ignoring dial change to {} outside {}", pushed, downlink_band);
            return None;
        }
        let reading = self.downlink_reading(pushed, view.effective_rit());
        self.session
            .send_modify(|s| s.last_downlink_hz = reading.nominal.hz);
        debug!("Dial moved downlink to {}", reading.nominal);
        Some(reading)
    }

    fn downlink_reading(&self, dial: Freq, rit: i32) -> DownlinkReading {
        if self.caps.native_rit {
            DownlinkReading {
                nominal: dial,
                on_air: dial.offset_by(rit),
            }
        } else {
            DownlinkReading {
                nominal: dial.offset_by(-rit),
                on_air: dial,
            }
        }
    }
}

async fn run_op(rig: &mut dyn SatRig, op: &RigOp) {
    if let Err(e) = rig.apply(op).await {
        warn!("Rig command {:?} failed: {}", op, e);
    }
}

async fn query_frequency(rig: &mut dyn SatRig) -> Option<Freq> {
    match rig.get_frequency().await {
        Ok(freq) => freq,
        Err(e) => {
            warn!("Frequency query failed: {}", e);
            None
        }
    }
}

async fn ptt_off(rig: &mut dyn SatRig) -> bool {
    match rig.is_ptt_off().await {
        Ok(off) => off,
        Err(e) => {
            warn!("PTT query failed: {}", e);
            false
        }
    }
}

/// Put the uplink band on MAIN, swapping bands or retuning when needed.
async fn place_uplink_band(rig: &mut dyn SatRig, uplink: Band) {
    run_op(rig, &RigOp::SelectVfo(Vfo::Main)).await;
    let main = query_frequency(rig).await;
    run_op(rig, &RigOp::SelectVfo(Vfo::Sub)).await;
    let sub = query_frequency(rig).await;

    if main.map(|f| f.band()) == Some(uplink) {
        debug!("{} already on MAIN", uplink);
    } else if sub.map(|f| f.band()) == Some(uplink) {
        debug!("{} found on SUB, exchanging bands", uplink);
        run_op(rig, &RigOp::ExchangeBands).await;
    } else {
        let freq = uplink.reference_freq();
        debug!("Tuning MAIN to {} for {}", freq, uplink);
        run_op(rig, &RigOp::SelectVfo(Vfo::Main)).await;
        if let Err(e) = rig.set_frequency(freq).await {
            warn!("Tuning MAIN to {} failed: {}", freq, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::mock::{MockRig, RigCall};

    const IC9700: RigCapabilities = RigCapabilities {
        native_rit: true,
        unselected_vfo_write: true,
    };
    const IC9100: RigCapabilities = RigCapabilities {
        native_rit: false,
        unselected_vfo_write: false,
    };

    fn sat(line: &str) -> SatelliteRecord {
        line.parse().unwrap()
    }

    fn controller(
        caps: RigCapabilities,
    ) -> (
        SatController,
        std::sync::Arc<std::sync::Mutex<crate::rig::mock::MockState>>,
    ) {
        let (rig, state) = MockRig::new(caps);
        let sats = vec![
            sat("AO-91,FM,0,U/V"),
            sat("RS-44,SSB,-150,V/U"),
            sat("ISS,FM,0,V/V"),
        ];
        (
            SatController::new(Box::new(rig), sats, TrackingThresholds::default()),
            state,
        )
    }

    #[tokio::test]
    async fn test_select_uv_fm_exchanges_bands_and_runs_duplex_fm() {
        let (ctl, state) = controller(IC9700);
        let record = ctl.find_satellite("ao-91 fm").unwrap().clone();
        ctl.select_satellite(&record).await;

        let calls = state.lock().unwrap().take_calls();
        assert_eq!(calls[0], RigCall::Op(RigOp::SatelliteMode(false)));
        assert_eq!(calls[1], RigCall::Op(RigOp::DualWatch(true)));
        assert!(calls.contains(&RigCall::Op(RigOp::ExchangeBands)));
        let expected = start_sequence(record.uplink_mode, true, &IC9700).unwrap();
        let tail: Vec<RigCall> = expected.into_iter().map(RigCall::Op).collect();
        assert!(calls.ends_with(&tail));

        let session = ctl.snapshot();
        assert!(session.is_duplex);
        assert!(!session.loop_paused);
        assert_eq!(session.phase, SessionPhase::Tracking);
        assert_eq!(session.last_applied_rit, 0);
        let s = state.lock().unwrap();
        assert_eq!(Freq::new(s.main_hz).band(), Band::SeventyCentimeters);
        assert_eq!(Freq::new(s.sub_hz).band(), Band::TwoMeters);
    }

    #[tokio::test]
    async fn test_select_tunes_reference_when_band_missing() {
        let (ctl, state) = controller(IC9700);
        ctl.select_satellite(&sat("SO-125,FM,0,L/U")).await;
        let calls = state.lock().unwrap().take_calls();
        assert!(!calls.contains(&RigCall::Op(RigOp::ExchangeBands)));
        assert!(calls.contains(&RigCall::SetFreq(1_295_000_000)));
    }

    #[tokio::test]
    async fn test_select_keeps_bands_when_uplink_on_main() {
        let (ctl, state) = controller(IC9100);
        ctl.select_satellite(&sat("RS-44,SSB,-150,V/U")).await;
        let calls = state.lock().unwrap().take_calls();
        assert!(!calls.contains(&RigCall::Op(RigOp::ExchangeBands)));
        assert!(!calls.iter().any(|c| matches!(c, RigCall::SetFreq(_))));
    }

    #[tokio::test]
    async fn test_native_rit_converges_after_selection() {
        let (ctl, state) = controller(IC9700);
        let record = ctl.find_satellite("RS-44").unwrap().clone();
        ctl.select_satellite(&record).await;
        state.lock().unwrap().take_calls();

        ctl.sync_rit().await;
        let calls = state.lock().unwrap().take_calls();
        assert_eq!(
            calls,
            vec![
                RigCall::Op(RigOp::SelectVfo(Vfo::Sub)),
                RigCall::Op(RigOp::RitFreq(-150)),
            ]
        );
        assert_eq!(ctl.snapshot().last_applied_rit, -150);

        assert_eq!(ctl.sync_rit().await, None);
        assert!(state.lock().unwrap().take_calls().is_empty());
    }

    #[tokio::test]
    async fn test_emulated_rit_retunes_without_doubling() {
        let (ctl, state) = controller(IC9100);
        let record = ctl.find_satellite("RS-44").unwrap().clone();
        ctl.select_satellite(&record).await;
        state.lock().unwrap().sub_hz = 435_800_000;

        assert_eq!(ctl.sync_rit().await, Some(Freq::new(435_799_850)));
        assert_eq!(ctl.snapshot().last_downlink_hz, 435_800_000);

        assert_eq!(ctl.adjust_rit(RIT_STEP_HZ), -125);
        assert_eq!(ctl.sync_rit().await, Some(Freq::new(435_799_875)));
        assert_eq!(state.lock().unwrap().sub_hz, 435_799_875);
        assert_eq!(ctl.snapshot().last_downlink_hz, 435_800_000);
    }

    #[tokio::test]
    async fn test_downlink_write_includes_emulated_rit() {
        let (ctl, state) = controller(IC9100);
        let record = ctl.find_satellite("RS-44").unwrap().clone();
        ctl.select_satellite(&record).await;
        ctl.sync_rit().await;
        state.lock().unwrap().take_calls();

        let update = ctl.apply_downlink(Freq::new(435_810_000)).await;
        assert_eq!(
            update,
            FreqUpdate::Written {
                on_air: Freq::new(435_809_850)
            }
        );
        assert_eq!(state.lock().unwrap().set_freqs(), vec![435_809_850]);
    }

    #[tokio::test]
    async fn test_uplink_threshold() {
        let (ctl, state) = controller(IC9700);

        let first = ctl.apply_uplink(Freq::new(145_900_000)).await;
        assert!(matches!(first, FreqUpdate::Written { .. }));
        assert_eq!(
            state.lock().unwrap().take_calls(),
            vec![
                RigCall::Op(RigOp::SelectVfo(Vfo::Main)),
                RigCall::SetFreq(145_900_000),
                RigCall::Op(RigOp::SelectVfo(Vfo::Sub)),
            ]
        );

        let near = ctl.apply_uplink(Freq::new(145_900_030)).await;
        assert_eq!(near, FreqUpdate::Suppressed);
        assert_eq!(ctl.apply_uplink(Freq::new(145_900_040)).await, FreqUpdate::Suppressed);
        assert!(state.lock().unwrap().take_calls().is_empty());

        let far = ctl.apply_uplink(Freq::new(145_900_100)).await;
        assert!(matches!(far, FreqUpdate::Written { .. }));
        assert_eq!(state.lock().unwrap().set_freqs(), vec![145_900_100]);
    }

    #[tokio::test]
    async fn test_downlink_threshold_and_constant() {
        let (ctl, state) = controller(IC9700);
        ctl.apply_downlink(Freq::new(435_000_000)).await;
        assert_eq!(
            ctl.apply_downlink(Freq::new(435_000_025)).await,
            FreqUpdate::Suppressed
        );
        state.lock().unwrap().take_calls();

        ctl.set_downlink_constant(true);
        assert_eq!(
            ctl.apply_downlink(Freq::new(435_500_000)).await,
            FreqUpdate::Suppressed
        );
        assert!(state.lock().unwrap().take_calls().is_empty());
        assert_eq!(ctl.snapshot().last_downlink_hz, 435_000_000);
    }

    #[tokio::test]
    async fn test_unacknowledged_write_is_retried() {
        let (ctl, state) = controller(IC9700);
        state.lock().unwrap().ack = false;
        assert_eq!(
            ctl.apply_uplink(Freq::new(145_900_000)).await,
            FreqUpdate::Deferred
        );
        assert_eq!(ctl.snapshot().last_uplink_hz, 0);

        state.lock().unwrap().ack = true;
        assert!(matches!(
            ctl.apply_uplink(Freq::new(145_900_010)).await,
            FreqUpdate::Written { .. }
        ));
    }

    #[tokio::test]
    async fn test_simplex_writes_wait_for_receive() {
        let (ctl, state) = controller(IC9700);
        let record = ctl.find_satellite("ISS").unwrap().clone();
        ctl.select_satellite(&record).await;
        assert!(!ctl.snapshot().is_duplex);
        state.lock().unwrap().take_calls();

        state.lock().unwrap().ptt_off = false;
        assert_eq!(
            ctl.apply_uplink(Freq::new(145_990_000)).await,
            FreqUpdate::Deferred
        );
        assert_eq!(
            state.lock().unwrap().take_calls(),
            vec![RigCall::PttQuery]
        );

        state.lock().unwrap().ptt_off = true;
        ctl.apply_uplink(Freq::new(145_990_000)).await;
        assert_eq!(
            state.lock().unwrap().take_calls(),
            vec![RigCall::PttQuery, RigCall::SetUnselected(145_990_000)]
        );

        ctl.apply_downlink(Freq::new(145_800_000)).await;
        assert_eq!(
            state.lock().unwrap().take_calls(),
            vec![
                RigCall::PttQuery,
                RigCall::Op(RigOp::SelectVfo(Vfo::A)),
                RigCall::SetFreq(145_800_000),
            ]
        );
    }

    #[tokio::test]
    async fn test_simplex_uplink_swaps_vfos_without_unselected_write() {
        let (ctl, state) = controller(IC9100);
        let record = ctl.find_satellite("ISS").unwrap().clone();
        ctl.select_satellite(&record).await;
        state.lock().unwrap().take_calls();

        ctl.apply_uplink(Freq::new(145_990_000)).await;
        assert_eq!(
            state.lock().unwrap().take_calls(),
            vec![
                RigCall::PttQuery,
                RigCall::Op(RigOp::SelectVfo(Vfo::B)),
                RigCall::SetFreq(145_990_000),
                RigCall::Op(RigOp::SelectVfo(Vfo::A)),
            ]
        );
    }

    #[tokio::test]
    async fn test_simplex_rit_is_not_applied() {
        let (ctl, state) = controller(IC9700);
        let record = ctl.find_satellite("ISS").unwrap().clone();
        ctl.select_satellite(&record).await;
        state.lock().unwrap().take_calls();

        ctl.set_rit(100);
        assert_eq!(ctl.sync_rit().await, None);
        assert!(state.lock().unwrap().take_calls().is_empty());
        assert_eq!(ctl.snapshot().last_applied_rit, 100);
        assert_eq!(ctl.query_downlink().await, None);
        assert_eq!(ctl.uplink_report(), None);
    }

    #[tokio::test]
    async fn test_query_downlink_adopts_dial_value() {
        let (ctl, state) = controller(IC9100);
        let record = ctl.find_satellite("RS-44").unwrap().clone();
        ctl.select_satellite(&record).await;
        ctl.sync_rit().await;
        state.lock().unwrap().sub_hz = 435_700_000;

        let reading = ctl.query_downlink().await.unwrap();
        assert_eq!(reading.nominal, Freq::new(435_700_150));
        assert_eq!(reading.on_air, Freq::new(435_700_000));
        assert_eq!(ctl.snapshot().last_downlink_hz, 435_700_150);
    }

    #[tokio::test]
    async fn test_poll_dial_accepts_downlink_band_only() {
        let (ctl, state) = controller(IC9700);
        let record = ctl.find_satellite("AO-91").unwrap().clone();
        ctl.select_satellite(&record).await;

        state.lock().unwrap().dial_push = Some(435_100_000);
        assert_eq!(ctl.poll_dial().await, None);

        state.lock().unwrap().dial_push = Some(145_880_000);
        let reading = ctl.poll_dial().await.unwrap();
        assert_eq!(reading.nominal, Freq::new(145_880_000));
        assert_eq!(ctl.snapshot().last_downlink_hz, 145_880_000);
    }

    #[tokio::test]
    async fn test_tracking_updates_during_selection_are_dropped() {
        let (ctl, state) = controller(IC9700);
        let ctl = std::sync::Arc::new(ctl);
        let gate = std::sync::Arc::new(tokio::sync::Notify::new());
        state.lock().unwrap().dual_watch_gate = Some(gate.clone());

        let record = ctl.find_satellite("ISS").unwrap().clone();
        let selecting = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.select_satellite(&record).await }
        });
        ctl.subscribe().wait_for(|s| s.loop_paused).await.unwrap();

        let uplink = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.apply_uplink(Freq::new(145_990_000)).await }
        });
        let downlink = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.apply_downlink(Freq::new(145_800_000)).await }
        });
        assert_eq!(uplink.await.unwrap(), FreqUpdate::Deferred);
        assert_eq!(downlink.await.unwrap(), FreqUpdate::Deferred);
        assert_eq!(ctl.sync_rit().await, None);

        gate.notify_one();
        selecting.await.unwrap();
        let calls = state.lock().unwrap().take_calls();
        assert!(!calls.contains(&RigCall::SetFreq(145_990_000)));
        assert!(!calls.contains(&RigCall::SetFreq(145_800_000)));
        let session = ctl.snapshot();
        assert!(!session.is_duplex);
        assert_eq!(session.last_uplink_hz, 0);
        assert_eq!(session.last_downlink_hz, 0);

        ctl.apply_uplink(Freq::new(145_990_000)).await;
        assert_eq!(
            state.lock().unwrap().take_calls(),
            vec![RigCall::PttQuery, RigCall::SetUnselected(145_990_000)]
        );
    }

    #[tokio::test]
    async fn test_selection_clamps_record_rit() {
        let (ctl, state) = controller(IC9700);
        let mut record = sat("FO-99,SSB,0,V/U");
        record.rit = 20_000;
        ctl.select_satellite(&record).await;
        assert_eq!(ctl.snapshot().rit, MAX_RIT_HZ);
        state.lock().unwrap().take_calls();

        ctl.sync_rit().await;
        assert!(state
            .lock()
            .unwrap()
            .take_calls()
            .contains(&RigCall::Op(RigOp::RitFreq(MAX_RIT_HZ))));
    }

    #[tokio::test]
    async fn test_rit_adjust_clamps() {
        let (ctl, _state) = controller(IC9700);
        assert_eq!(ctl.set_rit(20_000), MAX_RIT_HZ);
        assert_eq!(ctl.adjust_rit(RIT_STEP_HZ), MAX_RIT_HZ);
        assert_eq!(ctl.adjust_rit(-RIT_STEP_HZ), MAX_RIT_HZ - RIT_STEP_HZ);
    }

    #[tokio::test]
    async fn test_wait_until_resumed_returns_when_not_paused() {
        let (ctl, _state) = controller(IC9700);
        tokio::time::timeout(std::time::Duration::from_secs(1), ctl.wait_until_resumed())
            .await
            .unwrap();
    }
}
