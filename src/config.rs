// src/config.rs

use crate::constants::{CONF_HW_BIT_RATE_1MBPS, CONF_HW_BIT_RATE_6MBPS};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Transmit policy copied into templates and scan commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TxConf {
    /// Rate mask for 2.4 GHz management frames.
    pub basic_rate: u32,
    /// Rate mask for 5 GHz management frames.
    pub basic_rate_5: u32,
    pub short_retry_limit: u8,
    pub long_retry_limit: u8,
}

impl Default for TxConf {
    fn default() -> Self {
        Self {
            basic_rate: CONF_HW_BIT_RATE_1MBPS,
            basic_rate_5: CONF_HW_BIT_RATE_6MBPS,
            short_retry_limit: 10,
            long_retry_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConf {
    /// Front-end module fitted on the board; selects the dynamic NVS block.
    pub fem: u8,
}

/// TX power-detector reference point sent during calibration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationConf {
    pub ref_power: i32,
    pub ref_detector: i32,
    pub sub_band: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsConf {
    pub wake_up_event: u8,
    pub listen_interval: u8,
    /// Retries for the null-data frame announcing a power-save change.
    pub null_data_retries: u8,
    /// TUs the chip stays awake after entering power save.
    pub hang_over_period: u8,
    pub null_data_rate: u32,
}

impl Default for PsConf {
    fn default() -> Self {
        Self {
            wake_up_event: CONF_WAKE_UP_EVENT_DTIM,
            listen_interval: 1,
            null_data_retries: 5,
            hang_over_period: 1,
            null_data_rate: CONF_HW_BIT_RATE_1MBPS,
        }
    }
}

pub const CONF_WAKE_UP_EVENT_BEACON: u8 = 1 << 0;
pub const CONF_WAKE_UP_EVENT_DTIM: u8 = 1 << 1;
pub const CONF_WAKE_UP_EVENT_N_DTIM: u8 = 1 << 2;
pub const CONF_WAKE_UP_EVENT_N_BEACONS: u8 = 1 << 3;

/// Per-channel dwell times, in TU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConf {
    pub min_dwell: u32,
    pub max_dwell: u32,
}

impl Default for ScanConf {
    fn default() -> Self {
        Self {
            min_dwell: 30_000,
            max_dwell: 60_000,
        }
    }
}

/// Driver configuration consumed by the command encoders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Conf {
    pub tx: TxConf,
    pub radio: RadioConf,
    pub calibration: CalibrationConf,
    pub ps: PsConf,
    pub scan: ScanConf,
}

impl Conf {
    /// Parse a JSON document; absent sections keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidArgument(format!("configuration: {e}")))
    }
}
