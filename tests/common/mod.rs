//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#![allow(dead_code)]

#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use hex;
#[allow(unused_imports)]
pub use num_enum::FromPrimitive;
#[allow(unused_imports)]
pub use wl1271_cmd::command::{CommandHeader, CommandId, CommandStatus, HEADER_SIZE, TestCommandId};
#[allow(unused_imports)]
pub use wl1271_cmd::constants::*;
#[allow(unused_imports)]
pub use wl1271_cmd::error::{Error, WaitTarget};
#[allow(unused_imports)]
pub use wl1271_cmd::{Band, BandInfo, BssType, Channel, CommandChannel, Conf, FrameBuilder, Wl1271};

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
#[allow(unused_imports)]
pub use wl1271_cmd::{Clock, Transport};

pub const CMD_BOX: u32 = 0x0002_0000;
pub const MBOX_A: u32 = 0x0002_1000;
pub const MBOX_B: u32 = 0x0002_2000;
const CMD_BOX_SIZE: usize = 1024;

/// Scripted firmware. Completes every command with `Success` unless told
/// otherwise and records everything the host does.
#[derive(Debug, Default)]
pub struct MockDevice {
    cmd_box: Vec<u8>,
    intr: u32,
    polls_since_trigger: u32,

    /// Every buffer written to the command box, in order.
    pub sent: Vec<Vec<u8>>,
    /// Every `(address, length)` read from the device.
    pub reads: Vec<(u32, usize)>,
    pub register_writes: Vec<(u32, u32)>,

    /// Never raise the command-complete bit.
    pub never_complete: bool,
    /// Number of interrupt status reads that come back empty before the
    /// command completes.
    pub complete_after_polls: u32,
    /// Status applied to the first matching command; consumed on use.
    pub failures: VecDeque<(CommandId, CommandStatus)>,
    /// Failure applied to `CommandId::Test` commands with this test tag.
    pub test_failures: Vec<(TestCommandId, CommandStatus)>,
    /// Bytes placed after the header when the command completes.
    pub responses: Vec<(CommandId, Vec<u8>)>,
    /// Event bits posted to mailbox A when the command runs.
    pub events: Vec<(CommandId, u32)>,
    pub mailbox: [u32; 2],
    /// `(reads, mailbox index, bits)`: set the bits after that many
    /// reads of mailbox A.
    pub delayed_event: Option<(u32, usize, u32)>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            cmd_box: vec![0; CMD_BOX_SIZE],
            ..Default::default()
        }
    }

    /// A device that posts join and disconnect completion events.
    pub fn with_events() -> Self {
        let mut dev = Self::new();
        dev.events.push((CommandId::StartJoin, JOIN_EVENT_COMPLETE_ID));
        dev.events.push((CommandId::Disconnect, DISCONNECT_EVENT_COMPLETE_ID));
        dev
    }

    pub fn fail(&mut self, id: CommandId, status: CommandStatus) {
        self.failures.push_back((id, status));
    }

    pub fn sent_ids(&self) -> Vec<CommandId> {
        self.sent
            .iter()
            .map(|buf| CommandId::from_primitive(u16::from_le_bytes([buf[0], buf[1]])))
            .collect()
    }

    /// Test tags of the `CommandId::Test` commands sent.
    pub fn sent_test_ids(&self) -> Vec<TestCommandId> {
        self.sent
            .iter()
            .filter(|buf| u16::from_le_bytes([buf[0], buf[1]]) == u16::from(CommandId::Test))
            .map(|buf| TestCommandId::from_primitive(buf[HEADER_SIZE]))
            .collect()
    }

    pub fn sent_of(&self, id: CommandId) -> Vec<&Vec<u8>> {
        self.sent
            .iter()
            .filter(|buf| u16::from_le_bytes([buf[0], buf[1]]) == u16::from(id))
            .collect()
    }

    pub fn acks(&self) -> usize {
        self.register_writes
            .iter()
            .filter(|(addr, _)| *addr == ACX_REG_INTERRUPT_ACK)
            .count()
    }

    fn run_command(&mut self) {
        let id = CommandId::from_primitive(u16::from_le_bytes([self.cmd_box[0], self.cmd_box[1]]));
        self.polls_since_trigger = 0;

        let mut status = CommandStatus::Success;
        if let Some(pos) = self.failures.iter().position(|(fid, _)| *fid == id) {
            if let Some((_, s)) = self.failures.remove(pos) {
                status = s;
            }
        }
        if id == CommandId::Test {
            let tag = TestCommandId::from_primitive(self.cmd_box[HEADER_SIZE]);
            if let Some((_, s)) = self.test_failures.iter().find(|(t, _)| *t == tag) {
                status = *s;
            }
        }

        if let Some((_, payload)) = self.responses.iter().find(|(rid, _)| *rid == id) {
            self.cmd_box[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
        }
        for (eid, bits) in &self.events {
            if *eid == id {
                self.mailbox[0] |= bits;
            }
        }

        self.cmd_box[2..4].copy_from_slice(&u16::from(status).to_le_bytes());
    }
}

impl Transport for MockDevice {
    fn write_bytes(&mut self, addr: u32, buf: &[u8]) -> io::Result<()> {
        assert_eq!(addr, CMD_BOX, "write outside the command box");
        self.cmd_box[..buf.len()].copy_from_slice(buf);
        self.sent.push(buf.to_vec());
        Ok(())
    }

    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> io::Result<()> {
        self.reads.push((addr, buf.len()));
        match addr {
            CMD_BOX => buf.copy_from_slice(&self.cmd_box[..buf.len()]),
            MBOX_A | MBOX_B => {
                if addr == MBOX_A {
                    if let Some((left, idx, bits)) = self.delayed_event {
                        if left == 0 {
                            self.mailbox[idx] |= bits;
                            self.delayed_event = None;
                        } else {
                            self.delayed_event = Some((left - 1, idx, bits));
                        }
                    }
                }
                let idx = if addr == MBOX_A { 0 } else { 1 };
                buf.copy_from_slice(&self.mailbox[idx].to_le_bytes());
            }
            _ => return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "unmapped read")),
        }
        Ok(())
    }

    fn read_register32(&mut self, addr: u32) -> io::Result<u32> {
        assert_eq!(addr, ACX_REG_INTERRUPT_NO_CLEAR);
        if !self.never_complete && self.intr & INTR_TRIG_CMD != 0 {
            if self.polls_since_trigger >= self.complete_after_polls {
                return Ok(INTR_CMD_COMPLETE);
            }
            self.polls_since_trigger += 1;
        }
        Ok(0)
    }

    fn write_register32(&mut self, addr: u32, value: u32) -> io::Result<()> {
        self.register_writes.push((addr, value));
        match addr {
            ACX_REG_INTERRUPT_TRIG => {
                self.intr = value;
                self.run_command();
            }
            ACX_REG_INTERRUPT_ACK => self.intr = 0,
            _ => {}
        }
        Ok(())
    }
}

/// Clock that only moves when the code under test waits.
#[derive(Debug, Default)]
pub struct FakeClock {
    now: Cell<Duration>,
    pub delays: Cell<u32>,
    pub sleeps: Cell<u32>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn delay(&self, duration: Duration) {
        self.delays.set(self.delays.get() + 1);
        self.now.set(self.now.get() + duration);
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.now.set(self.now.get() + duration);
    }
}

/// Fixed frames; `None` fields make the matching builder fail.
#[derive(Debug, Clone)]
pub struct MockFrames {
    pub null_data: Option<Bytes>,
    pub ps_poll: Option<Bytes>,
    pub probe_request: Option<Bytes>,
}

impl Default for MockFrames {
    fn default() -> Self {
        Self {
            null_data: Some(Bytes::from(vec![0x48; 24])),
            ps_poll: Some(Bytes::from_static(&[0xa4, 0x10, 0x01, 0xc0])),
            probe_request: Some(Bytes::from(vec![0x40; 40])),
        }
    }
}

impl FrameBuilder for MockFrames {
    fn null_data(&self) -> Option<Bytes> {
        self.null_data.clone()
    }

    fn ps_poll(&self) -> Option<Bytes> {
        self.ps_poll.clone()
    }

    fn probe_request(&self, _ssid: &[u8], _ie: &[u8]) -> Option<Bytes> {
        self.probe_request.clone()
    }
}

pub fn channel(dev: MockDevice) -> CommandChannel<MockDevice, FakeClock> {
    CommandChannel::new(dev, FakeClock::new(), CMD_BOX, [MBOX_A, MBOX_B])
}

pub fn bands(a_band_enabled: bool) -> BandInfo {
    BandInfo {
        channels_2ghz: (1..=11).map(Channel::enabled).collect(),
        channels_5ghz: [36, 40, 44, 48].into_iter().map(Channel::enabled).collect(),
        a_band_enabled,
    }
}

pub fn device_with(dev: MockDevice, frames: MockFrames) -> Wl1271<MockDevice, FakeClock> {
    let mut wl = Wl1271::new(channel(dev), Conf::default(), Box::new(frames)).with_bands(bands(false));
    wl.bss.bssid = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
    wl.bss.mac_addr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
    wl.bss.ssid = b"testnet".to_vec();
    wl.bss.channel = 6;
    wl
}

pub fn device(dev: MockDevice) -> Wl1271<MockDevice, FakeClock> {
    device_with(dev, MockFrames::default())
}

/// Mock transport behind a device.
pub fn mock(wl: &Wl1271<MockDevice, FakeClock>) -> &MockDevice {
    wl.channel().transport()
}

pub fn mock_mut(wl: &mut Wl1271<MockDevice, FakeClock>) -> &mut MockDevice {
    wl.channel_mut().transport_mut()
}

/// In-memory sink for formatted log lines.
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        let buf = self.0.lock().expect("Failed to lock log buffer");
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that records every event at TRACE and above,
/// returning its result and the formatted log output.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.contents())
}
