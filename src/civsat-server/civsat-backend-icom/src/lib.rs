// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Icom CI-V backend for the IC-9700 and IC-9100.

pub mod civ;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Duration;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, warn};

use civsat_core::math::{decode_freq_bcd, encode_bcd4, encode_freq_bcd};
use civsat_core::rig::{Rig, RigAccessMethod, RigCapabilities, RigFuture, RigInfo, SatRig};
use civsat_core::{DuplexOffset, DynResult, Freq, RigMode, RigOp, Vfo};

use civ::{CivReply, CivTransport};

const CMD_TRANSCEIVE_FREQ: u8 = 0x00;
const CMD_READ_FREQ: u8 = 0x03;
const CMD_SET_FREQ: u8 = 0x05;
const CMD_SET_MODE: u8 = 0x06;
const CMD_SET_VFO: u8 = 0x07;
const CMD_SPLIT: u8 = 0x0F;
const CMD_LEVEL: u8 = 0x14;
const CMD_FUNC: u8 = 0x16;
const CMD_EXTENDED: u8 = 0x1A;
const CMD_TONE: u8 = 0x1B;
const CMD_PTT: u8 = 0x1C;
const CMD_RIT: u8 = 0x21;
const CMD_UNSELECTED_FREQ: u8 = 0x25;

const SUB_LEVEL_AF: u8 = 0x01;
const SUB_LEVEL_SQL: u8 = 0x03;
const SUB_FUNC_TONE: u8 = 0x42;
const SUB_FUNC_TSQL: u8 = 0x43;
const SUB_FUNC_AFC: u8 = 0x4A;
const SUB_FUNC_DUAL_WATCH: u8 = 0x59;
const SUB_FUNC_SATELLITE: u8 = 0x5A;
const SUB_EXT_DATA_MODE: u8 = 0x06;

/// Supported transceiver families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IcomFamily {
    Ic9700,
    Ic9100,
}

impl IcomFamily {
    pub fn default_address(self) -> u8 {
        match self {
            IcomFamily::Ic9700 => 0xA2,
            IcomFamily::Ic9100 => 0x7C,
        }
    }

    /// Factory CI-V baud rate over USB.
    pub fn default_baud(self) -> u32 {
        match self {
            IcomFamily::Ic9700 => 115_200,
            IcomFamily::Ic9100 => 19_200,
        }
    }

    pub fn capabilities(self) -> RigCapabilities {
        match self {
            IcomFamily::Ic9700 => RigCapabilities {
                native_rit: true,
                unselected_vfo_write: true,
            },
            IcomFamily::Ic9100 => RigCapabilities {
                native_rit: false,
                unselected_vfo_write: false,
            },
        }
    }

    pub fn model(self) -> &'static str {
        match self {
            IcomFamily::Ic9700 => "IC-9700",
            IcomFamily::Ic9100 => "IC-9100",
        }
    }
}

impl fmt::Display for IcomFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model())
    }
}

impl FromStr for IcomFamily {
    type Err = String;

    /// Accepts normalized names (`ic9700`) as well as bare model numbers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ic9700" | "9700" => Ok(IcomFamily::Ic9700),
            "ic9100" | "9100" => Ok(IcomFamily::Ic9100),
            other => Err(format!(
                "unknown radio family '{}' (expected ic9700 or ic9100)",
                other
            )),
        }
    }
}

/// Backend for Icom satellite transceivers over CI-V.
pub struct IcomCiv<P = SerialStream> {
    civ: CivTransport<P>,
    info: RigInfo,
}

impl IcomCiv<SerialStream> {
    pub fn open(
        path: &str,
        baud: u32,
        family: IcomFamily,
        address: Option<u8>,
        settle: Duration,
    ) -> DynResult<Self> {
        let port = tokio_serial::new(path, baud).open_native_async()?;
        let access = RigAccessMethod::Serial {
            path: path.to_string(),
            baud,
        };
        Ok(Self::with_port(port, family, address, settle, access))
    }
}

impl<P> IcomCiv<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn with_port(
        port: P,
        family: IcomFamily,
        address: Option<u8>,
        settle: Duration,
        access: RigAccessMethod,
    ) -> Self {
        let address = address.unwrap_or_else(|| family.default_address());
        Self {
            civ: CivTransport::new(port, address, settle),
            info: RigInfo {
                manufacturer: "Icom".to_string(),
                model: family.model().to_string(),
                address,
                capabilities: family.capabilities(),
                access,
            },
        }
    }

    pub async fn set_mode(&mut self, mode: &RigMode) -> DynResult<()> {
        // Filter 1 for FM/CW/AM, filter 2 for sideband.
        let (code, filter) = match mode {
            RigMode::LSB => (0x00, 0x02),
            RigMode::USB | RigMode::USBD => (0x01, 0x02),
            RigMode::AM => (0x02, 0x01),
            RigMode::CW => (0x03, 0x01),
            RigMode::FM | RigMode::FMD => (0x05, 0x01),
            RigMode::Other(name) => {
                warn!("{}: mode {} not supported, ignored", self.info.model, name);
                return Ok(());
            }
        };
        self.command(&[CMD_SET_MODE, code, filter]).await?;
        let data = if mode.is_data() {
            [CMD_EXTENDED, SUB_EXT_DATA_MODE, 0x01, filter]
        } else {
            [CMD_EXTENDED, SUB_EXT_DATA_MODE, 0x00, 0x00]
        };
        self.command(&data).await
    }

    pub async fn set_vfo(&mut self, vfo: Vfo) -> DynResult<()> {
        let code = match vfo {
            Vfo::A => 0x00,
            Vfo::B => 0x01,
            Vfo::Main => 0xD0,
            Vfo::Sub => 0xD1,
        };
        self.command(&[CMD_SET_VFO, code]).await
    }

    /// Swap MAIN and SUB bands.
    pub async fn set_exchange(&mut self) -> DynResult<()> {
        self.command(&[CMD_SET_VFO, 0xB0]).await
    }

    pub async fn set_satellite_mode(&mut self, on: bool) -> DynResult<()> {
        self.func(SUB_FUNC_SATELLITE, on).await
    }

    pub async fn set_dual_watch(&mut self, on: bool) -> DynResult<()> {
        self.func(SUB_FUNC_DUAL_WATCH, on).await
    }

    /// CTCSS tone in tenths of Hz (`670` = 67.0 Hz).
    pub async fn set_tone_hz(&mut self, decihz: u16) -> DynResult<()> {
        let [hi, lo] = encode_bcd4(decihz)?;
        self.command(&[CMD_TONE, 0x00, hi, lo]).await
    }

    pub async fn set_tone_on(&mut self, on: bool) -> DynResult<()> {
        self.func(SUB_FUNC_TONE, on).await
    }

    pub async fn set_tone_squelch_on(&mut self, on: bool) -> DynResult<()> {
        self.func(SUB_FUNC_TSQL, on).await
    }

    pub async fn set_afc_on(&mut self, on: bool) -> DynResult<()> {
        self.func(SUB_FUNC_AFC, on).await
    }

    pub async fn set_split_on(&mut self, on: bool) -> DynResult<()> {
        self.command(&[CMD_SPLIT, u8::from(on)]).await
    }

    pub async fn set_duplex_offset(&mut self, offset: DuplexOffset) -> DynResult<()> {
        let code = match offset {
            DuplexOffset::Off => 0x10,
            DuplexOffset::Minus => 0x11,
            DuplexOffset::Plus => 0x12,
            DuplexOffset::Dd => 0x13,
        };
        self.command(&[CMD_SPLIT, code]).await
    }

    pub async fn set_rit_on(&mut self, on: bool) -> DynResult<()> {
        self.command(&[CMD_RIT, 0x01, u8::from(on)]).await
    }

    /// RIT offset: low digit pair first, then sign (0 = up, 1 = down).
    pub async fn set_rit_frequency(&mut self, rit_hz: i32) -> DynResult<()> {
        let magnitude = u16::try_from(rit_hz.unsigned_abs())
            .map_err(|_| format!("RIT offset {} Hz out of range", rit_hz))?;
        let [hi, lo] = encode_bcd4(magnitude)?;
        let sign = u8::from(rit_hz < 0);
        self.command(&[CMD_RIT, 0x00, lo, hi, sign]).await
    }

    pub async fn set_squelch_level(&mut self, level: u8) -> DynResult<()> {
        self.level(SUB_LEVEL_SQL, level).await
    }

    pub async fn set_af_level(&mut self, level: u8) -> DynResult<()> {
        self.level(SUB_LEVEL_AF, level).await
    }

    /// Tune the selected VFO; `true` when the radio acknowledged.
    pub async fn set_frequency(&mut self, freq: Freq) -> DynResult<bool> {
        let bcd = encode_freq_bcd(freq.hz)?;
        let mut payload = vec![CMD_SET_FREQ];
        payload.extend_from_slice(&bcd);
        Ok(self.civ.send(&payload).await? == CivReply::Ack)
    }

    /// Tune the unselected VFO in place (IC-9700 only).
    pub async fn set_frequency_on_unselected_vfo(&mut self, freq: Freq) -> DynResult<bool> {
        if !self.info.capabilities.unselected_vfo_write {
            return Err(format!("{} cannot tune the unselected VFO", self.info.model).into());
        }
        let bcd = encode_freq_bcd(freq.hz)?;
        let mut payload = vec![CMD_UNSELECTED_FREQ, 0x01];
        payload.extend_from_slice(&bcd);
        Ok(self.civ.send(&payload).await? == CivReply::Ack)
    }

    /// Frequency of the selected VFO, `None` when the answer is unusable.
    pub async fn get_frequency(&mut self) -> DynResult<Option<Freq>> {
        let reply = self.civ.send(&[CMD_READ_FREQ]).await?;
        Ok(decode_freq_reply(&reply, CMD_READ_FREQ))
    }

    /// Frequency broadcast by the radio after a dial change (CI-V
    /// transceive must be enabled on the radio).
    pub async fn get_unsolicited_frequency_push(&mut self) -> DynResult<Option<Freq>> {
        let reply = self.civ.receive().await;
        Ok(decode_freq_reply(&reply, CMD_TRANSCEIVE_FREQ))
    }

    /// `false` while transmitting or when the state cannot be read.
    pub async fn is_ptt_off(&mut self) -> DynResult<bool> {
        match self.civ.send(&[CMD_PTT, 0x00]).await? {
            CivReply::Data(frame) if frame.cmd() == Some(CMD_PTT) => match frame.data() {
                [0x00, state] => Ok(*state != 0x01),
                other => {
                    debug!("Unexpected PTT answer {}", civ::hex(other));
                    Ok(false)
                }
            },
            other => {
                debug!("No PTT answer ({:?}), assuming transmit", other);
                Ok(false)
            }
        }
    }

    pub async fn apply(&mut self, op: &RigOp) -> DynResult<()> {
        match op {
            RigOp::SelectVfo(vfo) => self.set_vfo(*vfo).await,
            RigOp::ExchangeBands => self.set_exchange().await,
            RigOp::SatelliteMode(on) => self.set_satellite_mode(*on).await,
            RigOp::DualWatch(on) => self.set_dual_watch(*on).await,
            RigOp::Mode(mode) => self.set_mode(mode).await,
            RigOp::ToneFreq(decihz) => self.set_tone_hz(*decihz).await,
            RigOp::Tone(on) => self.set_tone_on(*on).await,
            RigOp::ToneSquelch(on) => self.set_tone_squelch_on(*on).await,
            RigOp::Afc(on) => self.set_afc_on(*on).await,
            RigOp::Split(on) => self.set_split_on(*on).await,
            RigOp::Rit(on) => self.set_rit_on(*on).await,
            RigOp::RitFreq(hz) => self.set_rit_frequency(*hz).await,
            RigOp::Duplex(offset) => self.set_duplex_offset(*offset).await,
            RigOp::SquelchLevel(level) => self.set_squelch_level(*level).await,
            RigOp::AfLevel(level) => self.set_af_level(*level).await,
        }
    }

    async fn func(&mut self, sub: u8, on: bool) -> DynResult<()> {
        self.command(&[CMD_FUNC, sub, u8::from(on)]).await
    }

    async fn level(&mut self, sub: u8, level: u8) -> DynResult<()> {
        let [hi, lo] = encode_bcd4(u16::from(level))?;
        self.command(&[CMD_LEVEL, sub, hi, lo]).await
    }

    async fn command(&mut self, payload: &[u8]) -> DynResult<()> {
        if self.civ.send(payload).await? == CivReply::Nak {
            debug!("{} rejected {}", self.info.model, civ::hex(payload));
        }
        Ok(())
    }
}

fn decode_freq_reply(reply: &CivReply, cmd: u8) -> Option<Freq> {
    let CivReply::Data(frame) = reply else {
        return None;
    };
    if frame.cmd() != Some(cmd) {
        return None;
    }
    let bytes: [u8; 5] = frame.data().try_into().ok()?;
    match decode_freq_bcd(bytes) {
        Ok(hz) => Some(Freq::new(hz)),
        Err(e) => {
            debug!("Discarding frequency answer: {}", e);
            None
        }
    }
}

impl<P> Rig for IcomCiv<P> {
    fn info(&self) -> &RigInfo {
        &self.info
    }
}

impl<P> SatRig for IcomCiv<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn apply<'a>(&'a mut self, op: &'a RigOp) -> RigFuture<'a, ()> {
        Box::pin(async move { IcomCiv::apply(self, op).await })
    }

    fn set_frequency<'a>(&'a mut self, freq: Freq) -> RigFuture<'a, bool> {
        Box::pin(async move { IcomCiv::set_frequency(self, freq).await })
    }

    fn set_frequency_on_unselected_vfo<'a>(&'a mut self, freq: Freq) -> RigFuture<'a, bool> {
        Box::pin(async move { IcomCiv::set_frequency_on_unselected_vfo(self, freq).await })
    }

    fn get_frequency<'a>(&'a mut self) -> RigFuture<'a, Option<Freq>> {
        Box::pin(async move { IcomCiv::get_frequency(self).await })
    }

    fn poll_dial_frequency<'a>(&'a mut self) -> RigFuture<'a, Option<Freq>> {
        Box::pin(async move { IcomCiv::get_unsolicited_frequency_push(self).await })
    }

    fn is_ptt_off<'a>(&'a mut self) -> RigFuture<'a, bool> {
        Box::pin(async move { IcomCiv::is_ptt_off(self).await })
    }
}
