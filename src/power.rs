// src/power.rs

use crate::command::{Command, CommandId, HEADER_SIZE, encode_command};
use crate::device::Wl1271;
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tracing::{debug, error};

/// Channel given to the data path commands; the firmware only uses it
/// for calibration.
const DATA_PATH_CHANNEL: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PsMode {
    Active = 0,
    Power = 1,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for PsMode {
    fn default() -> Self {
        PsMode::Active
    }
}

/// `CMD_SET_PS_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsParamsCommand {
    pub mode: PsMode,
    /// Announce the change to the AP with a null-data frame.
    pub send_null_data: bool,
    pub retries: u8,
    pub hang_over_period: u8,
    pub null_data_rate: u32,
}

impl Command for PsParamsCommand {
    const ID: CommandId = CommandId::SetPsMode;
    const SIZE: usize = HEADER_SIZE + 4 + 4;

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_u8(self.mode.into());
        payload.put_u8(self.send_null_data.into());
        payload.put_u8(self.retries);
        payload.put_u8(self.hang_over_period);
        payload.put_u32_le(self.null_data_rate);
    }
}

/// Payload shared by `CMD_ENABLE_RX`/`TX` and `CMD_DISABLE_RX`/`TX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPathCommand {
    pub channel: u8,
}

impl Command for DataPathCommand {
    // Sent under four different ids, see `data_path`.
    const ID: CommandId = CommandId::EnableRx;
    const SIZE: usize = HEADER_SIZE + 4;

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_u8(self.channel);
    }
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Switch the firmware's power-save mode. The wake-up conditions are
    /// programmed first; if that fails the mode is left alone.
    pub fn ps_mode(&mut self, mode: PsMode, send_null_data: bool) -> Result<()> {
        self.wake_up_conditions()
            .inspect_err(|_| error!("couldn't set wake up conditions"))?;

        debug!("cmd set ps mode {mode}");

        let ps = &self.conf.ps;
        let cmd = PsParamsCommand {
            mode,
            send_null_data,
            retries: ps.null_data_retries,
            hang_over_period: ps.hang_over_period,
            null_data_rate: ps.null_data_rate,
        };

        self.send(&cmd, 0)
            .map(|_| ())
            .map_err(|e| {
                error!("cmd set_ps_mode failed");
                Error::partial("ps mode", "CMD_SET_PS_MODE", e)
            })
    }

    /// Start or stop the RX and TX data paths. TX is not touched when the
    /// RX command fails.
    pub fn data_path(&mut self, enable: bool) -> Result<()> {
        debug!("cmd data path");

        let (cmd_rx, cmd_tx, action) = if enable {
            (CommandId::EnableRx, CommandId::EnableTx, "start")
        } else {
            (CommandId::DisableRx, CommandId::DisableTx, "stop")
        };
        let cmd = DataPathCommand {
            channel: DATA_PATH_CHANNEL,
        };

        self.send_as(cmd_rx, &cmd).inspect_err(|_| {
            error!("rx {action} cmd for channel {} failed", cmd.channel);
        })?;
        debug!("rx {action} cmd channel {}", cmd.channel);

        self.send_as(cmd_tx, &cmd).map_err(|e| {
            error!("tx {action} cmd for channel {} failed", cmd.channel);
            Error::partial("data path", cmd_tx_name(enable), e)
        })?;
        debug!("tx {action} cmd channel {}", cmd.channel);

        Ok(())
    }

    fn send_as(&mut self, id: CommandId, cmd: &DataPathCommand) -> Result<()> {
        let mut buf = encode_command(cmd)?;
        self.channel.execute(id, &mut buf, DataPathCommand::SIZE, 0)
    }
}

fn cmd_tx_name(enable: bool) -> &'static str {
    if enable { "CMD_ENABLE_TX" } else { "CMD_DISABLE_TX" }
}
