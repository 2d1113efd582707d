//! # Command mailbox wire format
//!
//! Every command written to the command box, and every response read back
//! from it, starts with a 4-byte little-endian header: the command id
//! followed by a status word that the host zeroes and the firmware fills in.
//!
//! ```text
//! +--------+--------+----------------------------+
//! | id LE  | status | payload (command specific) |
//! +--------+--------+----------------------------+
//!   2 bytes  2 bytes
//! ```
//!
//! Payloads are packed by hand with [`bytes::BufMut`] so the byte layout
//! never depends on the host's struct layout or endianness. The whole
//! buffer handed to the transport is always a multiple of 4 bytes long.

use crate::error::{Error, Result};
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Firmware command identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum CommandId {
    Interrogate = 1,
    Configure = 2,
    EnableRx = 3,
    EnableTx = 4,
    DisableRx = 5,
    DisableTx = 6,
    Scan = 8,
    StopScan = 9,
    StartJoin = 11,
    SetKeys = 12,
    ReadMemory = 13,
    WriteMemory = 14,
    SetTemplate = 19,
    Test = 23,
    Disconnect = 36,
    SetPsMode = 37,
    TriggerScanTo = 47,

    #[num_enum(catch_all)]
    Unknown(u16),
}

/// Status codes the firmware writes back into the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum CommandStatus {
    MailboxIdle = 0,
    Success = 1,
    UnknownCmd = 2,
    UnknownIe = 3,
    RejectMeasSgActive = 11,
    RxBusy = 13,
    InvalidParam = 14,
    TemplateTooLarge = 15,
    OutOfMemory = 16,
    StaTableFull = 17,
    RadioError = 18,
    WrongNesting = 19,
    Timeout = 21,
    FwReset = 22,

    #[num_enum(catch_all)]
    Unknown(u16),
}

/// Inner tag of a `CommandId::Test` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum TestCommandId {
    P2gCal = 0x02,
    ChannelTune = 0x0d,
    IniFileRadioParam = 0x19,
    UpdatePdReferencePoint = 0x1d,
    IniFileGeneralParam = 0x1e,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Common header of every command and response.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct CommandHeader {
    pub id: U16,
    pub status: U16,
}

/// Header of an information element (ACX) used by interrogate/configure.
/// The length counts only the bytes after this header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct AcxHeader {
    pub cmd: CommandHeader,
    pub id: U16,
    pub len: U16,
}

pub const HEADER_SIZE: usize = size_of::<CommandHeader>();
pub const ACX_HEADER_SIZE: usize = size_of::<AcxHeader>();

/// Size of the 4-byte test sub-header carried by `CommandId::Test` commands.
pub const TEST_HEADER_SIZE: usize = 4;

/// Round a command length up to the 4-byte DMA granularity.
pub const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

impl CommandHeader {
    pub fn command(&self) -> CommandId {
        CommandId::from_primitive(self.id.get())
    }

    pub fn status(&self) -> CommandStatus {
        CommandStatus::from_primitive(self.status.get())
    }

    /// View the header at the start of a command buffer.
    pub fn from_buffer(buf: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(buf)
            .map(|(header, _)| header)
            .map_err(|_| Error::InvalidArgument(format!("{} byte buffer holds no command header", buf.len())))
    }

    pub(crate) fn from_buffer_mut(buf: &mut [u8]) -> Result<&mut Self> {
        let len = buf.len();
        Self::mut_from_prefix(buf)
            .map(|(header, _)| header)
            .map_err(|_| Error::InvalidArgument(format!("{len} byte buffer holds no command header")))
    }
}

/// A fixed-layout command: its id, its total wire size including the
/// header, and a routine packing its parameters after the header.
pub trait Command {
    const ID: CommandId;
    const SIZE: usize;

    /// Fill `payload`, which is exactly `SIZE - HEADER_SIZE` zeroed bytes.
    fn encode(&self, payload: &mut [u8]);
}

/// Allocate a zeroed command buffer, failing instead of aborting when
/// memory is short.
pub(crate) fn alloc_command_buffer(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::ResourceExhausted { requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Serialize a command into a freshly allocated buffer.
pub(crate) fn encode_command<C: Command>(cmd: &C) -> Result<Vec<u8>> {
    debug_assert_eq!(C::SIZE % 4, 0, "{} is not 4-byte aligned", C::ID);
    let mut buf = alloc_command_buffer(C::SIZE)?;
    cmd.encode(&mut buf[HEADER_SIZE..]);
    Ok(buf)
}

/// Write the test sub-header (tag plus 3 bytes of padding).
pub(crate) fn put_test_header(payload: &mut &mut [u8], test: TestCommandId) {
    use bytes::BufMut;
    payload.put_u8(test.into());
    payload.put_bytes(0, 3);
}
