// src/acx.rs

use crate::command::{ACX_HEADER_SIZE, AcxHeader, CommandId};
use crate::device::Wl1271;
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use tracing::{debug, error, warn};
use zerocopy::FromBytes;

/// Information element id of the power-save wake-up conditions.
pub const ACX_WAKE_UP_CONDITIONS: u16 = 0x0002;

/// Stamp the information element header at the front of `buf`: `id`, and
/// the length of everything after the header.
fn stamp_acx_header(id: u16, buf: &mut [u8]) -> Result<()> {
    let len = buf.len();
    let (acx, _) = AcxHeader::mut_from_prefix(buf)
        .map_err(|_| Error::InvalidArgument(format!("{len} byte buffer holds no ACX header")))?;
    let payload_len = u16::try_from(len - ACX_HEADER_SIZE)
        .map_err(|_| Error::InvalidArgument(format!("{len} byte ACX element too long")))?;
    acx.id.set(id);
    acx.len.set(payload_len);
    Ok(())
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Read information element `id` into `buf`.
    ///
    /// `buf` starts with an [`AcxHeader`]; only the header goes out and
    /// the whole buffer is filled from the response.
    pub fn interrogate(&mut self, id: u16, buf: &mut [u8]) -> Result<()> {
        debug!("cmd interrogate");
        stamp_acx_header(id, buf)?;

        let len = buf.len();
        self.channel
            .execute(CommandId::Interrogate, buf, ACX_HEADER_SIZE, len)
            .inspect_err(|_| error!("INTERROGATE command failed"))
    }

    /// Write information element `id` from `buf`, which starts with an
    /// [`AcxHeader`].
    pub fn configure(&mut self, id: u16, buf: &mut [u8]) -> Result<()> {
        debug!("cmd configure");
        stamp_acx_header(id, buf)?;

        let len = buf.len();
        self.channel
            .execute(CommandId::Configure, buf, len, 0)
            .inspect_err(|_| warn!("CONFIGURE command NOK"))
    }

    /// Program the power-save wake-up event and listen interval from the
    /// configuration.
    pub fn wake_up_conditions(&mut self) -> Result<()> {
        debug!("acx wake up conditions");

        let mut buf = [0u8; ACX_HEADER_SIZE + 4];
        buf[ACX_HEADER_SIZE] = self.conf.ps.wake_up_event;
        buf[ACX_HEADER_SIZE + 1] = self.conf.ps.listen_interval;

        self.configure(ACX_WAKE_UP_CONDITIONS, &mut buf)
            .inspect_err(|e| warn!("could not set wake up conditions: {e}"))
    }
}
