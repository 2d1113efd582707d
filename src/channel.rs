// src/channel.rs

use crate::command::{CommandHeader, CommandId, CommandStatus, HEADER_SIZE};
use crate::constants::{
    ACX_REG_INTERRUPT_ACK, ACX_REG_INTERRUPT_NO_CLEAR, ACX_REG_INTERRUPT_TRIG, CMD_FAST_POLL_COUNT,
    CMD_FAST_POLL_DELAY, CMD_SLOW_POLL_DELAY, COMMAND_TIMEOUT, INTR_CMD_COMPLETE, INTR_TRIG_CMD,
};
use crate::error::{Error, Result, WaitTarget};
use crate::transport::{Clock, Transport};
use tracing::{debug, error, trace, warn};

/// Synchronous transaction primitive over the firmware command box.
///
/// Only one command is ever in flight: `execute` takes `&mut self` and
/// does not return until the firmware finished or the deadline passed.
pub struct CommandChannel<T, C> {
    transport: T,
    clock: C,
    cmd_box_addr: u32,
    event_mbox: [u32; 2],
}

impl<T: Transport, C: Clock> CommandChannel<T, C> {
    /// `cmd_box_addr` and the two event mailbox pointers are read from the
    /// firmware during boot, which is outside this crate.
    pub fn new(transport: T, clock: C, cmd_box_addr: u32, event_mbox: [u32; 2]) -> Self {
        Self {
            transport,
            clock,
            cmd_box_addr,
            event_mbox,
        }
    }

    pub fn cmd_box_addr(&self) -> u32 {
        self.cmd_box_addr
    }

    pub fn event_mbox(&self) -> [u32; 2] {
        self.event_mbox
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    pub(crate) fn transport_and_clock(&mut self) -> (&mut T, &C) {
        (&mut self.transport, &self.clock)
    }

    /// Run one command.
    ///
    /// The first `req_len` bytes of `buf` are written to the command box
    /// after stamping `id` and a zero status into the header. When the
    /// firmware signals completion, `res_len` bytes (the bare header when
    /// `res_len` is 0) are read back into `buf` in place.
    ///
    /// On a non-success status the completion is still acknowledged and
    /// [`Error::DeviceRejected`] is returned; the status field in `buf` is
    /// valid in that case. On timeout nothing is acknowledged and `buf`
    /// keeps the request with its zero status.
    pub fn execute(&mut self, id: CommandId, buf: &mut [u8], req_len: usize, res_len: usize) -> Result<()> {
        if req_len % 4 != 0 {
            warn!(%id, req_len, "command length is not a multiple of 4");
        }
        let req_len = clamp_len(id, "request", req_len, buf.len());

        {
            let header = CommandHeader::from_buffer_mut(buf)?;
            header.id.set(id.into());
            header.status.set(0);
        }

        trace!(%id, data = %hex::encode(&buf[..req_len]), "cmd send");
        self.transport.write_bytes(self.cmd_box_addr, &buf[..req_len])?;
        self.transport.write_register32(ACX_REG_INTERRUPT_TRIG, INTR_TRIG_CMD)?;

        let deadline = self.clock.now() + COMMAND_TIMEOUT;
        let mut poll_count: u32 = 0;
        let mut intr = self.transport.read_register32(ACX_REG_INTERRUPT_NO_CLEAR)?;
        while intr & INTR_CMD_COMPLETE == 0 {
            if self.clock.now() > deadline {
                error!(%id, "command complete timeout");
                return Err(Error::Timeout(WaitTarget::CommandComplete(id)));
            }

            poll_count += 1;
            if poll_count <= CMD_FAST_POLL_COUNT {
                self.clock.delay(CMD_FAST_POLL_DELAY);
            } else {
                self.clock.sleep(CMD_SLOW_POLL_DELAY);
            }

            intr = self.transport.read_register32(ACX_REG_INTERRUPT_NO_CLEAR)?;
        }
        debug!(%id, poll_count, "command complete");

        let res_len = if res_len == 0 { HEADER_SIZE } else { res_len };
        let res_len = clamp_len(id, "response", res_len, buf.len());
        self.transport.read_bytes(self.cmd_box_addr, &mut buf[..res_len])?;

        let status = CommandHeader::from_buffer(buf)?.status();
        let result = if status == CommandStatus::Success {
            Ok(())
        } else {
            error!(%id, ?status, "command execute failure");
            Err(Error::DeviceRejected { command: id, status })
        };

        self.transport.write_register32(ACX_REG_INTERRUPT_ACK, INTR_CMD_COMPLETE)?;

        result
    }
}

fn clamp_len(id: CommandId, what: &str, len: usize, available: usize) -> usize {
    if len > available {
        warn!(%id, len, available, "{what} length exceeds the command buffer, clamping");
        available
    } else {
        len
    }
}
