// src/memory.rs

use crate::command::{Command, CommandId, HEADER_SIZE};
use crate::constants::MAX_READ_SIZE;
use crate::device::Wl1271;
use crate::error::Result;
use crate::transport::{Clock, Transport};
use bytes::{BufMut, Bytes};
use tracing::{debug, error, warn};

/// `CMD_READ_MEMORY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMemoryCommand {
    pub addr: u32,
    pub size: u32,
}

impl ReadMemoryCommand {
    /// Offset of the value field in the command buffer.
    pub const VALUE_OFFSET: usize = HEADER_SIZE + 4 + 4;
}

impl Command for ReadMemoryCommand {
    const ID: CommandId = CommandId::ReadMemory;
    const SIZE: usize = Self::VALUE_OFFSET + MAX_READ_SIZE;

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_u32_le(self.addr);
        payload.put_u32_le(self.size);
    }
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Read `len` bytes of firmware memory at `addr`. Requests above
    /// `MAX_READ_SIZE` are cut down to it.
    pub fn read_memory(&mut self, addr: u32, len: usize) -> Result<Bytes> {
        debug!("cmd read memory");

        if len > MAX_READ_SIZE {
            warn!(len, max = MAX_READ_SIZE, "read memory request too large, clamping");
        }
        let len = len.min(MAX_READ_SIZE);

        let cmd = ReadMemoryCommand {
            addr,
            size: len as u32,
        };
        let buf = self
            .send(&cmd, ReadMemoryCommand::SIZE)
            .inspect_err(|e| error!("read memory command failed: {e}"))?;

        let value = &buf[ReadMemoryCommand::VALUE_OFFSET..ReadMemoryCommand::VALUE_OFFSET + len];
        Ok(Bytes::copy_from_slice(value))
    }
}
