// src/device.rs

use crate::channel::CommandChannel;
use crate::command::{Command, CommandId, encode_command};
use crate::config::Conf;
use crate::constants::{
    CFG_BSSID_FILTER_EN, CFG_RX_ALL_GOOD, CFG_RX_BCN_EN, CFG_RX_MGMT_EN, CFG_RX_PRSP_EN, CFG_UNI_FILTER_EN, ETH_ALEN,
};
use crate::error::Result;
use crate::nvs::Nvs;
use crate::session::Session;
use crate::transport::{Clock, Transport};
use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tracing::{debug, warn};

/// Radio band of the current association.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum Band {
    #[default]
    #[strum(to_string = "2.4 GHz")]
    Ghz2_4,
    #[strum(to_string = "5 GHz")]
    Ghz5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum BssType {
    Ibss = 0,
    StaBss = 2,
    ApBss = 3,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for BssType {
    fn default() -> Self {
        BssType::StaBss
    }
}

/// Association parameters supplied by the 802.11 management layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BssContext {
    /// BSSID in standard (most significant byte first) order.
    pub bssid: [u8; ETH_ALEN],
    pub mac_addr: [u8; ETH_ALEN],
    pub bss_type: BssType,
    pub band: Band,
    pub channel: u8,
    pub beacon_interval: u16,
    pub ssid: Vec<u8>,
    pub basic_rate_set: u32,
    /// Lowest basic rate, used for PS-poll frames.
    pub basic_rate: u32,
    pub rx_config: u32,
    pub rx_filter: u32,
}

impl Default for BssContext {
    fn default() -> Self {
        Self {
            bssid: [0; ETH_ALEN],
            mac_addr: [0; ETH_ALEN],
            bss_type: BssType::StaBss,
            band: Band::Ghz2_4,
            channel: 1,
            beacon_interval: 100,
            ssid: Vec::new(),
            basic_rate_set: 0,
            basic_rate: 0,
            rx_config: CFG_UNI_FILTER_EN | CFG_BSSID_FILTER_EN | CFG_RX_ALL_GOOD,
            rx_filter: CFG_RX_PRSP_EN | CFG_RX_MGMT_EN | CFG_RX_BCN_EN,
        }
    }
}

/// One entry of a band's channel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub hw_value: u8,
    /// Administratively disabled (regulatory); never scanned.
    pub disabled: bool,
}

impl Channel {
    pub const fn enabled(hw_value: u8) -> Self {
        Self { hw_value, disabled: false }
    }
}

/// Channel tables and band capabilities of the radio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandInfo {
    pub channels_2ghz: Vec<Channel>,
    pub channels_5ghz: Vec<Channel>,
    pub a_band_enabled: bool,
}

impl BandInfo {
    pub fn channels(&self, band: Band) -> &[Channel] {
        match band {
            Band::Ghz2_4 => &self.channels_2ghz,
            Band::Ghz5 => &self.channels_5ghz,
        }
    }
}

/// Frame templates produced by the 802.11 management layer for the
/// current association. `None` means the frame cannot be built right now.
///
/// Builders must be `Send` so the device they are boxed into can move
/// between threads.
pub trait FrameBuilder: Send {
    fn null_data(&self) -> Option<Bytes>;
    fn ps_poll(&self) -> Option<Bytes>;
    fn probe_request(&self, ssid: &[u8], ie: &[u8]) -> Option<Bytes>;
}

/// Command engine for one wl1271 instance.
///
/// Every operation takes `&mut self`, so a whole transaction (state
/// update, command, event wait) is exclusive per device. Share a device
/// between threads by wrapping it in a `Mutex`.
pub struct Wl1271<T, C> {
    pub(crate) channel: CommandChannel<T, C>,
    pub(crate) conf: Conf,
    pub(crate) session: Session,
    pub bss: BssContext,
    pub bands: BandInfo,
    pub(crate) nvs: Option<Nvs>,
    pub(crate) frames: Box<dyn FrameBuilder>,
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    pub fn new(channel: CommandChannel<T, C>, conf: Conf, frames: Box<dyn FrameBuilder>) -> Self {
        Self {
            channel,
            conf,
            session: Session::new(),
            bss: BssContext::default(),
            bands: BandInfo::default(),
            nvs: None,
            frames,
        }
    }

    pub fn with_bands(mut self, bands: BandInfo) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_nvs(mut self, nvs: Nvs) -> Self {
        self.nvs = Some(nvs);
        self
    }

    pub fn conf(&self) -> &Conf {
        &self.conf
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn channel(&self) -> &CommandChannel<T, C> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut CommandChannel<T, C> {
        &mut self.channel
    }

    pub fn into_channel(self) -> CommandChannel<T, C> {
        self.channel
    }

    /// Encode `cmd`, execute it and return the buffer holding the
    /// response. `res_len` of 0 reads back only the header.
    pub(crate) fn send<M: Command>(&mut self, cmd: &M, res_len: usize) -> Result<Vec<u8>> {
        let mut buf = encode_command(cmd)?;
        self.channel.execute(M::ID, &mut buf, M::SIZE, res_len)?;
        Ok(buf)
    }

    /// Send a `CommandId::Test` wrapper and return the command buffer.
    /// With `answer` the whole command structure is read back from the
    /// firmware, otherwise only the header.
    pub fn test<M: Command>(&mut self, cmd: &M, answer: bool) -> Result<Vec<u8>> {
        debug_assert_eq!(M::ID, CommandId::Test);
        debug!("cmd test");
        let res_len = if answer { M::SIZE } else { 0 };
        self.send(cmd, res_len)
            .inspect_err(|e| warn!("TEST command failed: {e}"))
    }
}
