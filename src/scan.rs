// src/scan.rs

use crate::command::{Command, CommandId, HEADER_SIZE};
use crate::constants::{CFG_RX_ALL_GOOD, CFG_RX_BCN_EN, CFG_RX_MGMT_EN, CFG_RX_PRSP_EN, SCAN_MAX_CHANNELS, SSID_MAX_LEN};
use crate::device::{Band, Channel, Wl1271};
use crate::error::{Error, Result};
use crate::template::{PROBE_REQ_TEMPLATE_SIZE, TemplatePayload, TemplateType};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;
use tracing::{debug, error, info, warn};

pub const SCAN_OPT_PASSIVE: u16 = 1 << 0;
pub const SCAN_OPT_PRIORITY_HIGH: u16 = 1 << 2;

pub const SCAN_DEFAULT_TAG: u8 = 1;

/// Keep the current TX power on every scanned channel.
const SCAN_CURRENT_TX_PWR: u8 = 0;

/// Bands a scan can cover. `Dual` scans 2.4 GHz first and continues on
/// 5 GHz from [`Wl1271::scan_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ScanBand {
    Band2_4 = 0,
    Band5 = 1,
    Dual = 2,
}

impl Default for ScanBand {
    fn default() -> Self {
        ScanBand::Band2_4
    }
}

/// Parameters of one scan request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanRequest<'a> {
    /// Directed scan when non-empty.
    pub ssid: &'a [u8],
    /// Extra information elements appended to the probe request.
    pub ie: &'a [u8],
    pub active: bool,
    pub high_prio: bool,
    pub band: ScanBand,
    pub probe_requests: u8,
}

/// Outcome of handling a scan-complete event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCompletion {
    /// No scan was in progress; nothing was done.
    Idle,
    /// The scan is over and the probe template has been cleared.
    Finished,
    /// The 2.4 GHz leg of a dual-band scan is over; the 5 GHz leg started.
    ContinuingOn5Ghz,
}

/// One channel descriptor of the scan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanChannel {
    pub min_duration: u32,
    pub max_duration: u32,
    pub channel: u8,
}

impl ScanChannel {
    pub const SIZE: usize = 20;

    fn encode(&self, payload: &mut &mut [u8]) {
        payload.put_u32_le(self.min_duration);
        payload.put_u32_le(self.max_duration);
        // wildcard BSSID: 4 low bytes, 2 high bytes
        payload.put_bytes(0xff, 4);
        payload.put_bytes(0xff, 2);
        // early termination
        payload.put_u8(0);
        payload.put_u8(SCAN_CURRENT_TX_PWR);
        payload.put_u8(self.channel);
        // dfs candidate, activity detected, padding
        payload.put_bytes(0, 3);
    }
}

/// `CMD_SCAN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommand {
    pub rx_config: u32,
    pub rx_filter: u32,
    pub scan_options: u16,
    pub num_probe_requests: u8,
    pub tx_rate: u32,
    pub ssid: Vec<u8>,
    /// Band byte the firmware scans; never `Dual`.
    pub band: ScanBand,
    pub channels: Vec<ScanChannel>,
}

const SCAN_PARAMS_SIZE: usize = 4 + 4 + 2 + 1 + 1 + 4 + 1 + 1 + 2 + SSID_MAX_LEN + 4;

impl Command for ScanCommand {
    const ID: CommandId = CommandId::Scan;
    const SIZE: usize = HEADER_SIZE + SCAN_PARAMS_SIZE + SCAN_MAX_CHANNELS * ScanChannel::SIZE;

    fn encode(&self, mut payload: &mut [u8]) {
        let channels = &self.channels[..self.channels.len().min(SCAN_MAX_CHANNELS)];
        let ssid_len = self.ssid.len().min(SSID_MAX_LEN);

        payload.put_u32_le(self.rx_config);
        payload.put_u32_le(self.rx_filter);
        payload.put_u16_le(self.scan_options);
        payload.put_u8(channels.len() as u8);
        payload.put_u8(self.num_probe_requests);
        payload.put_u32_le(self.tx_rate);
        // tid trigger
        payload.put_u8(0);
        payload.put_u8(ssid_len as u8);
        payload.put_bytes(0, 2);
        let mut ssid = [0u8; SSID_MAX_LEN];
        ssid[..ssid_len].copy_from_slice(&self.ssid[..ssid_len]);
        payload.put_slice(&ssid);
        payload.put_u8(self.band.into());
        // use ssid list
        payload.put_u8(0);
        payload.put_u8(SCAN_DEFAULT_TAG);
        payload.put_u8(0);

        for channel in channels {
            channel.encode(&mut payload);
        }
    }
}

/// `CMD_TRIGGER_SCAN_TO`: per-channel scan timeout, 0 disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerScanToCommand {
    pub timeout: u32,
}

impl Command for TriggerScanToCommand {
    const ID: CommandId = CommandId::TriggerScanTo;
    const SIZE: usize = HEADER_SIZE + 4;

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_u32_le(self.timeout);
    }
}

/// Descriptors for the enabled channels of a band, at most
/// `SCAN_MAX_CHANNELS` of them. Only the first `SCAN_MAX_CHANNELS`
/// entries of the table are considered.
pub fn scan_channels(table: &[Channel], min_dwell: u32, max_dwell: u32) -> Vec<ScanChannel> {
    table
        .iter()
        .take(SCAN_MAX_CHANNELS)
        .filter(|ch| !ch.disabled)
        .map(|ch| ScanChannel {
            min_duration: min_dwell,
            max_duration: max_dwell,
            channel: ch.hw_value,
        })
        .collect()
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Start a hardware scan.
    ///
    /// The probe request template is uploaded first and must succeed. Once
    /// the scan timeout trigger went through, failures come back as
    /// [`Error::PartialSequence`] since the template stays installed.
    pub fn scan(&mut self, req: &ScanRequest<'_>) -> Result<()> {
        let (band, rate) = match req.band {
            ScanBand::Band2_4 => (Band::Ghz2_4, self.conf.tx.basic_rate),
            ScanBand::Dual if self.bands.a_band_enabled => (Band::Ghz2_4, self.conf.tx.basic_rate),
            ScanBand::Band5 if self.bands.a_band_enabled => (Band::Ghz5, self.conf.tx.basic_rate_5),
            other => {
                return Err(Error::InvalidArgument(format!("scan band {other} not supported")));
            }
        };

        let table = self.bands.channels(band);
        if table.is_empty() {
            return Err(Error::InvalidArgument(format!("no channels on {band}")));
        }

        if self.session.is_scanning() {
            return Err(Error::InvalidArgument("scan already in progress".into()));
        }

        if req.ssid.len() > SSID_MAX_LEN {
            return Err(Error::InvalidArgument(format!(
                "SSID is {} bytes, at most {SSID_MAX_LEN} allowed",
                req.ssid.len()
            )));
        }

        let mut scan_options = 0;
        if !req.active {
            scan_options |= SCAN_OPT_PASSIVE;
        }
        if req.high_prio {
            scan_options |= SCAN_OPT_PRIORITY_HIGH;
        }

        let cmd = ScanCommand {
            rx_config: CFG_RX_ALL_GOOD,
            rx_filter: CFG_RX_PRSP_EN | CFG_RX_MGMT_EN | CFG_RX_BCN_EN,
            scan_options,
            num_probe_requests: req.probe_requests,
            tx_rate: rate,
            ssid: req.ssid.to_vec(),
            band: if req.band == ScanBand::Dual {
                ScanBand::Band2_4
            } else {
                req.band
            },
            channels: scan_channels(table, self.conf.scan.min_dwell, self.conf.scan.max_dwell),
        };

        self.build_probe_req(req.ssid, req.ie, band)
            .inspect_err(|_| error!("PROBE request template failed"))?;

        self.send(&TriggerScanToCommand { timeout: 0 }, 0)
            .map_err(|e| {
                error!("trigger scan to failed for hw scan");
                Error::partial("scan", "CMD_TRIGGER_SCAN_TO", e)
            })?;

        debug!(channels = cmd.channels.len(), band = %req.band, "SCAN");

        self.session.set_scanning(true);
        if self.bands.a_band_enabled {
            // Only a dual-band scan needs its parameters again, for the
            // 5 GHz leg; single-band scans record just the band.
            let scan = self.session.scan_mut();
            scan.band = Some(req.band);
            if req.band == ScanBand::Dual {
                scan.active = req.active;
                scan.high_prio = req.high_prio;
                scan.probe_requests = req.probe_requests;
                scan.ssid = req.ssid.to_vec();
            }
        }

        self.send(&cmd, 0).map(|_| ()).map_err(|e| {
            error!("SCAN failed");
            self.session.set_scanning(false);
            Error::partial("scan", "CMD_SCAN", e)
        })
    }

    /// Handle the firmware's scan-complete event.
    ///
    /// A failure to clear the probe template is logged and does not stop
    /// the 5 GHz leg of a dual-band scan.
    pub fn scan_complete(&mut self) -> Result<ScanCompletion> {
        if !self.session.is_scanning() {
            debug!("scan complete without a scan in progress");
            return Ok(ScanCompletion::Idle);
        }

        let state = self.session.scan().clone();
        let band = state.band.unwrap_or_default();
        info!("scan completed on {band}");

        let template = match band {
            ScanBand::Band2_4 | ScanBand::Dual => TemplateType::CfgProbeReq2_4,
            ScanBand::Band5 => TemplateType::CfgProbeReq5,
        };
        if let Err(e) = self.template_set(template, TemplatePayload::Zeroed(PROBE_REQ_TEMPLATE_SIZE), 0, 0) {
            warn!("couldn't clear {template} template after scan: {e}");
        }
        self.session.set_scanning(false);

        if band != ScanBand::Dual {
            return Ok(ScanCompletion::Finished);
        }

        self.scan(&ScanRequest {
            ssid: &state.ssid,
            ie: &[],
            active: state.active,
            high_prio: state.high_prio,
            band: ScanBand::Band5,
            probe_requests: state.probe_requests,
        })?;
        Ok(ScanCompletion::ContinuingOn5Ghz)
    }
}
