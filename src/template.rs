// src/template.rs

use crate::command::{Command, CommandId, HEADER_SIZE};
use crate::constants::{CMD_TEMPL_MAX_SIZE, ETH_ALEN, RATE_AUTOMATIC};
use crate::device::{Band, BssType, Wl1271};
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tracing::{debug, warn};

/// Firmware frame template slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum TemplateType {
    NullData = 0,
    Beacon = 1,
    CfgProbeReq2_4 = 2,
    CfgProbeReq5 = 3,
    ProbeResponse = 4,
    QosNullData = 5,
    PsPoll = 6,
    Klv = 7,
    Disconnect = 8,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Keep-alive slot used for the null-data frame.
pub const CMD_TEMPL_KLV_IDX_NULL_DATA: u8 = 0;

/// 802.11 data header without addr4: frame control, duration, three
/// addresses and sequence control.
pub const NULL_DATA_TEMPLATE_SIZE: usize = 24;

/// Probe request with SSID, rates and extended rates elements.
pub const PROBE_REQ_TEMPLATE_SIZE: usize = 24 + (2 + 32) + (2 + 8) + (2 + 8);

const IEEE80211_FTYPE_DATA: u16 = 0x0008;
const IEEE80211_STYPE_QOS_NULLFUNC: u16 = 0x00c0;
const IEEE80211_FCTL_TODS: u16 = 0x0100;

/// Template contents: frame bytes, or a zero-filled body of a given size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePayload<'a> {
    Frame(&'a [u8]),
    Zeroed(usize),
}

impl TemplatePayload<'_> {
    pub fn len(&self) -> usize {
        match self {
            TemplatePayload::Frame(data) => data.len(),
            TemplatePayload::Zeroed(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `CMD_SET_TEMPLATE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSetCommand<'a> {
    pub template: TemplateType,
    pub payload: TemplatePayload<'a>,
    /// Slot index, only meaningful for `TemplateType::Klv`.
    pub index: u8,
    pub enabled_rates: u32,
    pub short_retry_limit: u8,
    pub long_retry_limit: u8,
}

impl Command for TemplateSetCommand<'_> {
    const ID: CommandId = CommandId::SetTemplate;
    const SIZE: usize = HEADER_SIZE + 2 + 1 + 1 + 4 + 4 + CMD_TEMPL_MAX_SIZE;

    fn encode(&self, mut payload: &mut [u8]) {
        let len = self.payload.len().min(CMD_TEMPL_MAX_SIZE);
        payload.put_u16_le(len as u16);
        payload.put_u8(self.template.into());
        payload.put_u8(self.index);
        payload.put_u32_le(self.enabled_rates);
        payload.put_u8(self.short_retry_limit);
        payload.put_u8(self.long_retry_limit);
        // aflags, reserved
        payload.put_bytes(0, 2);
        if let TemplatePayload::Frame(data) = self.payload {
            payload.put_slice(&data[..len]);
        }
    }
}

/// QoS null-data frame to the AP, with `To DS` set and priority 0.
pub fn qos_null_data_frame(bssid: &[u8; ETH_ALEN], own_addr: &[u8; ETH_ALEN]) -> [u8; 26] {
    let mut frame = [0u8; 26];
    let mut out = &mut frame[..];
    out.put_u16_le(IEEE80211_FTYPE_DATA | IEEE80211_STYPE_QOS_NULLFUNC | IEEE80211_FCTL_TODS);
    out.put_u16_le(0);
    out.put_slice(bssid);
    out.put_slice(own_addr);
    out.put_slice(bssid);
    out.put_u16_le(0);
    // QoS control
    out.put_u16_le(0);
    frame
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Upload a frame template. Payloads longer than the firmware slot are
    /// truncated with a warning rather than rejected.
    pub fn template_set(
        &mut self,
        template: TemplateType,
        payload: TemplatePayload<'_>,
        index: u8,
        rates: u32,
    ) -> Result<()> {
        debug!("cmd template_set {template}");

        if payload.len() > CMD_TEMPL_MAX_SIZE {
            warn!(
                len = payload.len(),
                max = CMD_TEMPL_MAX_SIZE,
                "{template} template too large, truncating"
            );
        }

        let cmd = TemplateSetCommand {
            template,
            payload,
            index,
            enabled_rates: rates,
            short_retry_limit: self.conf.tx.short_retry_limit,
            long_retry_limit: self.conf.tx.long_retry_limit,
        };

        self.send(&cmd, 0)
            .map(|_| ())
            .inspect_err(|e| warn!("cmd set_template failed: {e}"))
    }

    /// Null-data template used for power-save signalling. An IBSS gets a
    /// zero-filled frame since there is no AP to address.
    pub fn build_null_data(&mut self) -> Result<()> {
        let result = if self.bss.bss_type == BssType::Ibss {
            self.template_set(
                TemplateType::NullData,
                TemplatePayload::Zeroed(NULL_DATA_TEMPLATE_SIZE),
                0,
                RATE_AUTOMATIC,
            )
        } else {
            match self.frames.null_data() {
                Some(frame) => {
                    self.template_set(TemplateType::NullData, TemplatePayload::Frame(&frame), 0, RATE_AUTOMATIC)
                }
                None => Err(Error::FrameUnavailable(TemplateType::NullData)),
            }
        };
        result.inspect_err(|e| warn!("cmd build null data failed: {e}"))
    }

    /// Null-data frame in the keep-alive slot.
    pub fn build_klv_null_data(&mut self) -> Result<()> {
        let frame = self
            .frames
            .null_data()
            .ok_or(Error::FrameUnavailable(TemplateType::Klv))?;
        self.template_set(
            TemplateType::Klv,
            TemplatePayload::Frame(&frame),
            CMD_TEMPL_KLV_IDX_NULL_DATA,
            RATE_AUTOMATIC,
        )
        .inspect_err(|e| warn!("cmd build klv null data failed: {e}"))
    }

    pub fn build_ps_poll(&mut self) -> Result<()> {
        let frame = self
            .frames
            .ps_poll()
            .ok_or(Error::FrameUnavailable(TemplateType::PsPoll))?;
        let rate = self.bss.basic_rate;
        self.template_set(TemplateType::PsPoll, TemplatePayload::Frame(&frame), 0, rate)
    }

    /// Probe request used by the firmware during active scans on `band`.
    pub fn build_probe_req(&mut self, ssid: &[u8], ie: &[u8], band: Band) -> Result<()> {
        let (template, rate) = match band {
            Band::Ghz2_4 => (TemplateType::CfgProbeReq2_4, self.conf.tx.basic_rate),
            Band::Ghz5 => (TemplateType::CfgProbeReq5, self.conf.tx.basic_rate_5),
        };
        let frame = self
            .frames
            .probe_request(ssid, ie)
            .ok_or(Error::FrameUnavailable(template))?;
        debug!(data = %hex::encode(&frame), "PROBE REQ");

        self.template_set(template, TemplatePayload::Frame(&frame), 0, rate)
    }

    pub fn build_qos_null_data(&mut self) -> Result<()> {
        let frame = qos_null_data_frame(&self.bss.bssid, &self.bss.mac_addr);
        self.template_set(TemplateType::QosNullData, TemplatePayload::Frame(&frame), 0, RATE_AUTOMATIC)
    }
}
