// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-memory rig for tests. Records every call.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::radio::freq::Freq;
use crate::rig::ops::{RigOp, Vfo};
use crate::rig::{Rig, RigAccessMethod, RigCapabilities, RigFuture, RigInfo, SatRig};
use crate::DynResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigCall {
    Op(RigOp),
    SetFreq(u64),
    SetUnselected(u64),
    GetFreq,
    PollDial,
    PttQuery,
}

#[derive(Debug)]
pub struct MockState {
    pub calls: Vec<RigCall>,
    pub main_hz: u64,
    pub sub_hz: u64,
    pub on_sub: bool,
    pub ptt_off: bool,
    pub ack: bool,
    pub dial_push: Option<u64>,
    /// When set, `DualWatch(true)` waits for a permit before completing.
    pub dual_watch_gate: Option<Arc<Notify>>,
}

impl MockState {
    pub fn take_calls(&mut self) -> Vec<RigCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn set_freqs(&mut self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RigCall::SetFreq(hz) => Some(*hz),
                _ => None,
            })
            .collect()
    }

    fn current(&mut self) -> &mut u64 {
        if self.on_sub {
            &mut self.sub_hz
        } else {
            &mut self.main_hz
        }
    }
}

pub struct MockRig {
    info: RigInfo,
    state: Arc<Mutex<MockState>>,
}

impl MockRig {
    pub fn new(capabilities: RigCapabilities) -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState {
            calls: Vec::new(),
            main_hz: 145_900_000,
            sub_hz: 435_000_000,
            on_sub: false,
            ptt_off: true,
            ack: true,
            dial_push: None,
            dual_watch_gate: None,
        }));
        let rig = Self {
            info: RigInfo {
                manufacturer: "Mock".to_string(),
                model: "mock".to_string(),
                address: 0xA2,
                capabilities,
                access: RigAccessMethod::Serial {
                    path: "mock".to_string(),
                    baud: 0,
                },
            },
            state: state.clone(),
        };
        (rig, state)
    }

    fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

fn ready<T: Send + 'static>(value: T) -> RigFuture<'static, T> {
    let out: DynResult<T> = Ok(value);
    Box::pin(std::future::ready(out))
}

impl Rig for MockRig {
    fn info(&self) -> &RigInfo {
        &self.info
    }
}

impl SatRig for MockRig {
    fn apply<'a>(&'a mut self, op: &'a RigOp) -> RigFuture<'a, ()> {
        let gate = self.with(|s| {
            s.calls.push(RigCall::Op(op.clone()));
            match op {
                RigOp::SelectVfo(Vfo::Main) => s.on_sub = false,
                RigOp::SelectVfo(Vfo::Sub) => s.on_sub = true,
                RigOp::ExchangeBands => std::mem::swap(&mut s.main_hz, &mut s.sub_hz),
                RigOp::DualWatch(true) => return s.dual_watch_gate.clone(),
                _ => {}
            }
            None
        });
        match gate {
            Some(gate) => Box::pin(async move {
                gate.notified().await;
                Ok(())
            }),
            None => ready(()),
        }
    }

    fn set_frequency<'a>(&'a mut self, freq: Freq) -> RigFuture<'a, bool> {
        let ack = self.with(|s| {
            s.calls.push(RigCall::SetFreq(freq.hz));
            if s.ack {
                *s.current() = freq.hz;
            }
            s.ack
        });
        ready(ack)
    }

    fn set_frequency_on_unselected_vfo<'a>(&'a mut self, freq: Freq) -> RigFuture<'a, bool> {
        let ack = self.with(|s| {
            s.calls.push(RigCall::SetUnselected(freq.hz));
            s.ack
        });
        ready(ack)
    }

    fn get_frequency<'a>(&'a mut self) -> RigFuture<'a, Option<Freq>> {
        let hz = self.with(|s| {
            s.calls.push(RigCall::GetFreq);
            *s.current()
        });
        ready((hz != 0).then(|| Freq::new(hz)))
    }

    fn poll_dial_frequency<'a>(&'a mut self) -> RigFuture<'a, Option<Freq>> {
        let push = self.with(|s| {
            s.calls.push(RigCall::PollDial);
            s.dial_push.take()
        });
        ready(push.map(Freq::new))
    }

    fn is_ptt_off<'a>(&'a mut self) -> RigFuture<'a, bool> {
        let off = self.with(|s| {
            s.calls.push(RigCall::PttQuery);
            s.ptt_off
        });
        ready(off)
    }
}
