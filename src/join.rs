// src/join.rs

use crate::command::{Command, CommandId, HEADER_SIZE};
use crate::constants::{DISCONNECT_EVENT_COMPLETE_ID, ETH_ALEN, JOIN_EVENT_COMPLETE_ID, SSID_MAX_LEN};
use crate::device::{Band, BssType, Wl1271};
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use tracing::{debug, error, warn};

pub const DEFAULT_DTIM_PERIOD: u8 = 1;

/// `bss_type` byte of the join command.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinBssType {
    pub bss_type: B3,
    #[skip]
    reserved: bool,
    pub band_5ghz: bool,
    #[skip]
    reserved_hi: B3,
}

/// `ctrl` byte of the join command.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinCtrl {
    #[skip]
    reserved: bool,
    pub tx_session: B3,
    #[skip]
    reserved_hi: B3,
    /// Firmware flushes all pending TX before joining.
    pub tx_flush: bool,
}

/// Reverse a MAC address into the firmware's least-significant-byte-first
/// order. Applying it twice gives back the original address.
pub fn reverse_bssid(bssid: &[u8; ETH_ALEN]) -> [u8; ETH_ALEN] {
    let mut out = *bssid;
    out.reverse();
    out
}

/// `CMD_START_JOIN`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCommand {
    pub bssid: [u8; ETH_ALEN],
    pub beacon_interval: u16,
    pub rx_config: u32,
    pub rx_filter: u32,
    pub basic_rate_set: u32,
    pub dtim_interval: u8,
    pub bss_type: JoinBssType,
    pub channel: u8,
    pub ssid: Vec<u8>,
    pub ctrl: JoinCtrl,
}

impl Command for JoinCommand {
    const ID: CommandId = CommandId::StartJoin;
    const SIZE: usize = HEADER_SIZE + ETH_ALEN + 2 + 4 + 4 + 4 + 4 + SSID_MAX_LEN + 4;

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_slice(&reverse_bssid(&self.bssid));
        payload.put_u16_le(self.beacon_interval);
        payload.put_u32_le(self.rx_config);
        payload.put_u32_le(self.rx_filter);
        payload.put_u32_le(self.basic_rate_set);
        payload.put_u8(self.dtim_interval);
        payload.put_slice(&self.bss_type.into_bytes());
        payload.put_u8(self.channel);
        let ssid_len = self.ssid.len().min(SSID_MAX_LEN);
        payload.put_u8(ssid_len as u8);
        let mut ssid = [0u8; SSID_MAX_LEN];
        ssid[..ssid_len].copy_from_slice(&self.ssid[..ssid_len]);
        payload.put_slice(&ssid);
        payload.put_slice(&self.ctrl.into_bytes());
        payload.put_bytes(0, 3);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum DisconnectType {
    /// The reason code is ignored for immediate disconnects.
    Immediate = 0,
    Deauth = 1,
    Disassoc = 2,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for DisconnectType {
    fn default() -> Self {
        DisconnectType::Immediate
    }
}

/// `CMD_DISCONNECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectCommand {
    pub rx_config: u32,
    pub rx_filter: u32,
    pub reason: u16,
    pub kind: DisconnectType,
}

impl Command for DisconnectCommand {
    const ID: CommandId = CommandId::Disconnect;
    const SIZE: usize = HEADER_SIZE + 4 + 4 + 2 + 1 + 1;

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_u32_le(self.rx_config);
        payload.put_u32_le(self.rx_filter);
        payload.put_u16_le(self.reason);
        payload.put_u8(self.kind.into());
    }
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Join (or start) the BSS described by `self.bss`.
    ///
    /// The first join also runs TX calibration; a calibration failure is
    /// logged and the join goes ahead. The session counter and the TX
    /// security counters are updated before the command is sent and stay
    /// updated whatever happens afterwards.
    pub fn join(&mut self, bss_type: BssType) -> Result<()> {
        if self.bss.ssid.len() > SSID_MAX_LEN {
            return Err(Error::InvalidArgument(format!(
                "SSID is {} bytes, at most {SSID_MAX_LEN} allowed",
                self.bss.ssid.len()
            )));
        }

        if !self.session.is_calibrated() {
            match self.calibrate() {
                Ok(()) => self.session.mark_calibrated(),
                Err(e) => warn!("couldn't calibrate: {e}"),
            }
        }

        debug!("cmd join");
        self.bss.bss_type = bss_type;

        let session = self.session.next_session_counter();
        self.session.reset_tx_security_seq();

        let cmd = JoinCommand {
            bssid: self.bss.bssid,
            beacon_interval: self.bss.beacon_interval,
            rx_config: self.bss.rx_config,
            rx_filter: self.bss.rx_filter,
            basic_rate_set: self.bss.basic_rate_set,
            dtim_interval: DEFAULT_DTIM_PERIOD,
            bss_type: JoinBssType::new()
                .with_bss_type(u8::from(bss_type) & 0x07)
                .with_band_5ghz(self.bss.band == Band::Ghz5),
            channel: self.bss.channel,
            ssid: self.bss.ssid.clone(),
            ctrl: JoinCtrl::new().with_tx_flush(true).with_tx_session(session),
        };

        self.send(&cmd, 0)
            .inspect_err(|_| error!("failed to initiate cmd join"))?;

        self.channel
            .wait_for_event(JOIN_EVENT_COMPLETE_ID)
            .inspect_err(|_| error!("cmd join event completion error"))
    }

    /// Leave the current BSS immediately and wait for the firmware to
    /// confirm.
    pub fn disconnect(&mut self) -> Result<()> {
        debug!("cmd disconnect");

        let cmd = DisconnectCommand {
            rx_config: self.bss.rx_config,
            rx_filter: self.bss.rx_filter,
            reason: 0,
            kind: DisconnectType::Immediate,
        };

        self.send(&cmd, 0)
            .inspect_err(|_| error!("failed to send disconnect command"))?;

        self.channel
            .wait_for_event(DISCONNECT_EVENT_COMPLETE_ID)
            .inspect_err(|_| error!("cmd disconnect event completion error"))
    }
}
