// src/event.rs

use crate::channel::CommandChannel;
use crate::constants::{EVENT_POLL_DELAY, EVENT_TIMEOUT};
use crate::error::{Error, Result, WaitTarget};
use crate::transport::{Clock, Transport};
use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, error};

impl<T: Transport, C: Clock> CommandChannel<T, C> {
    /// Poll both event mailboxes until one of them has a bit of `mask` set.
    ///
    /// Event bits are left as they are; acknowledging them belongs to the
    /// event handler.
    pub fn wait_for_event(&mut self, mask: u32) -> Result<()> {
        let [mbox_a, mbox_b] = self.event_mbox();
        let (transport, clock) = self.transport_and_clock();
        let deadline = clock.now() + EVENT_TIMEOUT;

        loop {
            if clock.now() > deadline {
                error!("event wait timeout, mask {mask:#010x}");
                return Err(Error::Timeout(WaitTarget::Event(mask)));
            }

            clock.sleep(EVENT_POLL_DELAY);

            let mut vector = [0u8; 4];
            transport.read_bytes(mbox_a, &mut vector)?;
            let mut event = LittleEndian::read_u32(&vector) & mask;
            transport.read_bytes(mbox_b, &mut vector)?;
            event |= LittleEndian::read_u32(&vector) & mask;

            if event != 0 {
                debug!("event {event:#010x} arrived");
                return Ok(());
            }
        }
    }
}
