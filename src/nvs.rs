// src/nvs.rs

use crate::command::{
    Command, CommandId, HEADER_SIZE, TEST_HEADER_SIZE, TestCommandId, align4, put_test_header,
};
use crate::device::Wl1271;
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use tracing::{debug, warn};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const NVS_GENERAL_PARAMS_SIZE: usize = 57;
pub const NVS_STAT_RADIO_PARAMS_SIZE: usize = 17;
pub const NVS_DYN_RADIO_PARAMS_SIZE: usize = 65;
/// Number of front-end module variants described in the NVS image.
pub const NVS_FEM_COUNT: usize = 2;

/// 5 GHz blocks of the radio command; the NVS image carries none yet,
/// so they go out zeroed.
const STAT_RADIO_PARAMS_5_SIZE: usize = 29;
const DYN_RADIO_PARAMS_5_SIZE: usize = 104;

const GENERAL_PARAMS_RESERVED: usize = 23;

/// Factory calibration image, as loaded from the board's NVS file.
#[derive(Debug, Clone, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct Nvs {
    pub general_params: [u8; NVS_GENERAL_PARAMS_SIZE],
    pub stat_radio_params: [u8; NVS_STAT_RADIO_PARAMS_SIZE],
    pub dyn_radio_params: [[u8; NVS_DYN_RADIO_PARAMS_SIZE]; NVS_FEM_COUNT],
}

impl Nvs {
    pub const SIZE: usize = size_of::<Nvs>();

    /// Parse an NVS image; its length must match exactly.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from_bytes(bytes).map_err(|_| {
            Error::InvalidArgument(format!("NVS image is {} bytes, expected {}", bytes.len(), Self::SIZE))
        })
    }
}

/// `TEST_CMD_INI_FILE_GENERAL_PARAM`
#[derive(Debug, Clone)]
pub struct GeneralParamsCommand<'a> {
    pub params: &'a [u8; NVS_GENERAL_PARAMS_SIZE],
}

impl Command for GeneralParamsCommand<'_> {
    const ID: CommandId = CommandId::Test;
    const SIZE: usize = align4(HEADER_SIZE + TEST_HEADER_SIZE + NVS_GENERAL_PARAMS_SIZE + GENERAL_PARAMS_RESERVED);

    fn encode(&self, mut payload: &mut [u8]) {
        put_test_header(&mut payload, TestCommandId::IniFileGeneralParam);
        payload.put_slice(self.params);
    }
}

/// `TEST_CMD_INI_FILE_RADIO_PARAM`
#[derive(Debug, Clone)]
pub struct RadioParamsCommand<'a> {
    pub stat_radio_params: &'a [u8; NVS_STAT_RADIO_PARAMS_SIZE],
    pub dyn_radio_params: &'a [u8; NVS_DYN_RADIO_PARAMS_SIZE],
}

impl Command for RadioParamsCommand<'_> {
    const ID: CommandId = CommandId::Test;
    const SIZE: usize = align4(
        HEADER_SIZE
            + TEST_HEADER_SIZE
            + NVS_STAT_RADIO_PARAMS_SIZE
            + STAT_RADIO_PARAMS_5_SIZE
            + NVS_DYN_RADIO_PARAMS_SIZE
            + DYN_RADIO_PARAMS_5_SIZE,
    );

    fn encode(&self, mut payload: &mut [u8]) {
        put_test_header(&mut payload, TestCommandId::IniFileRadioParam);
        payload.put_slice(self.stat_radio_params);
        payload.put_bytes(0, STAT_RADIO_PARAMS_5_SIZE);
        payload.put_slice(self.dyn_radio_params);
    }
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Upload the general (board-level) NVS parameters.
    pub fn general_parms(&mut self) -> Result<()> {
        let nvs = self.nvs.as_ref().ok_or(Error::NoDevice)?;
        let params = nvs.general_params;

        self.test(&GeneralParamsCommand { params: &params }, false)
            .map(|_| ())
            .inspect_err(|e| warn!("CMD_INI_FILE_GENERAL_PARAM failed: {e}"))
    }

    /// Upload the radio NVS parameters for the configured front-end module.
    pub fn radio_parms(&mut self) -> Result<()> {
        let nvs = self.nvs.as_ref().ok_or(Error::NoDevice)?;
        let fem = self.conf.radio.fem as usize;
        let dyn_radio_params = *nvs.dyn_radio_params.get(fem).ok_or_else(|| {
            Error::InvalidArgument(format!("front-end module {fem} out of range (NVS has {NVS_FEM_COUNT})"))
        })?;
        let stat_radio_params = nvs.stat_radio_params;

        let cmd = RadioParamsCommand {
            stat_radio_params: &stat_radio_params,
            dyn_radio_params: &dyn_radio_params,
        };
        debug!(fem, "TEST_CMD_INI_FILE_RADIO_PARAM");

        self.test(&cmd, false)
            .map(|_| ())
            .inspect_err(|e| warn!("CMD_INI_FILE_RADIO_PARAM failed: {e}"))
    }
}
