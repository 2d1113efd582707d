// src/calibration.rs

use crate::command::{Command, CommandId, HEADER_SIZE, TEST_HEADER_SIZE, TestCommandId, align4, put_test_header};
use crate::device::Wl1271;
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use tracing::{info, warn};

const CHANNEL_TUNE_BAND_2_4: u8 = 0;
/// Any channel works for tuning; 7 sits in the middle of the 2.4 GHz range.
const CHANNEL_TUNE_CHANNEL: u8 = 7;

pub const CAL_P2G_BAND_B_G: u8 = 1 << 0;

const MAX_TLV_LENGTH: usize = 400;
const MAX_NVS_VERSION_LENGTH: usize = 12;

/// `TEST_CMD_CHANNEL_TUNE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTuneCommand {
    pub band: u8,
    pub channel: u8,
}

impl Command for ChannelTuneCommand {
    const ID: CommandId = CommandId::Test;
    // band, channel, radio_status
    const SIZE: usize = align4(HEADER_SIZE + TEST_HEADER_SIZE + 4);

    fn encode(&self, mut payload: &mut [u8]) {
        put_test_header(&mut payload, TestCommandId::ChannelTune);
        payload.put_u8(self.band);
        payload.put_u8(self.channel);
        payload.put_u16_le(0);
    }
}

/// `TEST_CMD_UPDATE_PD_REFERENCE_POINT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRefPointCommand {
    pub ref_power: i32,
    pub ref_detector: i32,
    pub sub_band: u8,
}

impl Command for UpdateRefPointCommand {
    const ID: CommandId = CommandId::Test;
    const SIZE: usize = align4(HEADER_SIZE + TEST_HEADER_SIZE + 4 + 4 + 4);

    fn encode(&self, mut payload: &mut [u8]) {
        put_test_header(&mut payload, TestCommandId::UpdatePdReferencePoint);
        payload.put_i32_le(self.ref_power);
        payload.put_i32_le(self.ref_detector);
        payload.put_u8(self.sub_band);
    }
}

/// `TEST_CMD_P2G_CAL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P2gCalCommand {
    pub sub_band_mask: u8,
}

impl Command for P2gCalCommand {
    const ID: CommandId = CommandId::Test;
    // len, TLV buffer, type, padding, radio_status, NVS version, sub-band mask, padding
    const SIZE: usize = align4(HEADER_SIZE + TEST_HEADER_SIZE + 2 + MAX_TLV_LENGTH + 2 + 2 + MAX_NVS_VERSION_LENGTH + 2);

    fn encode(&self, mut payload: &mut [u8]) {
        put_test_header(&mut payload, TestCommandId::P2gCal);
        payload.put_bytes(0, 2 + MAX_TLV_LENGTH + 2 + 2 + MAX_NVS_VERSION_LENGTH);
        payload.put_u8(self.sub_band_mask);
    }
}

/// The three TX calibration steps, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    ChannelTune,
    UpdateRefPoint,
    P2g,
}

impl CalibrationStep {
    pub const ALL: [CalibrationStep; 3] = [Self::ChannelTune, Self::UpdateRefPoint, Self::P2g];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ChannelTune => "TEST_CMD_CHANNEL_TUNE",
            Self::UpdateRefPoint => "TEST_CMD_UPDATE_PD_REFERENCE_POINT",
            Self::P2g => "TEST_CMD_P2G_CAL",
        }
    }
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Run TX calibration. Stops at the first failing step; the steps
    /// that already ran are not undone.
    pub fn calibrate(&mut self) -> Result<()> {
        info!("performing tx calibration");

        for step in CalibrationStep::ALL {
            self.calibration_step(step).map_err(|e| {
                warn!("{} failed", step.name());
                Error::partial("calibration", step.name(), e)
            })?;
        }
        Ok(())
    }

    fn calibration_step(&mut self, step: CalibrationStep) -> Result<()> {
        match step {
            CalibrationStep::ChannelTune => {
                let cmd = ChannelTuneCommand {
                    band: CHANNEL_TUNE_BAND_2_4,
                    channel: CHANNEL_TUNE_CHANNEL,
                };
                self.test(&cmd, false)?;
            }
            CalibrationStep::UpdateRefPoint => {
                let cal = &self.conf.calibration;
                let cmd = UpdateRefPointCommand {
                    ref_power: cal.ref_power,
                    ref_detector: cal.ref_detector,
                    sub_band: cal.sub_band,
                };
                self.test(&cmd, false)?;
            }
            CalibrationStep::P2g => {
                let cmd = P2gCalCommand {
                    sub_band_mask: CAL_P2G_BAND_B_G,
                };
                self.test(&cmd, false)?;
            }
        }
        Ok(())
    }
}
