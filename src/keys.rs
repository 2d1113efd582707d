// src/keys.rs

use crate::command::{Command, CommandId, HEADER_SIZE};
use crate::constants::{ETH_ALEN, MAX_KEY_SIZE, NUM_ACCESS_CATEGORIES};
use crate::device::Wl1271;
use crate::error::{Error, Result};
use crate::transport::{Clock, Transport};
use bytes::BufMut;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum KeyAction {
    AddOrReplace = 1,
    Remove = 2,
    SetId = 3,

    #[num_enum(catch_all)]
    Unknown(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum KeyType {
    None = 0,
    Wep = 1,
    Tkip = 2,
    Aes = 3,
    Gem = 4,

    #[num_enum(catch_all)]
    Unknown(u8),
}

const TKIP_KEY_SIZE: usize = 32;
const TKIP_TK_LEN: usize = 16;
const TKIP_MIC_LEN: usize = 8;

/// Swap the two MIC halves of a TKIP key.
///
/// The stack hands over `[TK(16)][TX MIC(8)][RX MIC(8)]` while the
/// firmware expects `[TK(16)][RX MIC(8)][TX MIC(8)]`. The swap is its own
/// inverse, so the same function decodes a wire key.
pub fn tkip_swap_mic(key: &[u8; TKIP_KEY_SIZE]) -> [u8; TKIP_KEY_SIZE] {
    let mut out = [0u8; TKIP_KEY_SIZE];
    let (tk, mics) = key.split_at(TKIP_TK_LEN);
    let (first, second) = mics.split_at(TKIP_MIC_LEN);
    out[..TKIP_TK_LEN].copy_from_slice(tk);
    out[TKIP_TK_LEN..TKIP_TK_LEN + TKIP_MIC_LEN].copy_from_slice(second);
    out[TKIP_TK_LEN + TKIP_MIC_LEN..].copy_from_slice(first);
    out
}

/// `CMD_SET_KEYS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetKeysCommand {
    /// Peer address; left zero for WEP keys.
    pub addr: [u8; ETH_ALEN],
    pub action: KeyAction,
    pub key_size: u8,
    pub key_type: KeyType,
    pub id: u8,
    /// Key bytes exactly as the firmware wants them.
    pub key: [u8; MAX_KEY_SIZE],
    pub tx_seq_16: u16,
    pub tx_seq_32: u32,
}

impl Command for SetKeysCommand {
    const ID: CommandId = CommandId::SetKeys;
    const SIZE: usize =
        HEADER_SIZE + ETH_ALEN + 2 + 2 + 4 + 6 + MAX_KEY_SIZE + NUM_ACCESS_CATEGORIES * (2 + 4);

    fn encode(&self, mut payload: &mut [u8]) {
        payload.put_slice(&self.addr);
        payload.put_u16_le(self.action.into());
        payload.put_u16_le(0);
        payload.put_u8(self.key_size);
        payload.put_u8(self.key_type.into());
        // single SSID profile
        payload.put_u8(0);
        payload.put_u8(self.id);
        payload.put_bytes(0, 6);
        payload.put_slice(&self.key);
        payload.put_u16_le(self.tx_seq_16);
        payload.put_bytes(0, 2 * (NUM_ACCESS_CATEGORIES - 1));
        payload.put_u32_le(self.tx_seq_32);
        payload.put_bytes(0, 4 * (NUM_ACCESS_CATEGORIES - 1));
    }
}

/// Key material and addressing for [`Wl1271::set_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParams<'a> {
    pub action: KeyAction,
    pub id: u8,
    pub key_type: KeyType,
    /// Key as delivered by the stack; TKIP keys are 32 bytes with TX MIC first.
    pub key: &'a [u8],
    pub addr: [u8; ETH_ALEN],
    pub tx_seq_32: u32,
    pub tx_seq_16: u16,
}

impl SetKeysCommand {
    pub fn from_params(params: &KeyParams<'_>) -> Result<Self> {
        if params.key.len() > MAX_KEY_SIZE {
            return Err(Error::InvalidArgument(format!(
                "{} byte key exceeds {MAX_KEY_SIZE}",
                params.key.len()
            )));
        }

        let mut key = [0u8; MAX_KEY_SIZE];
        if params.key_type == KeyType::Tkip {
            let tkip: &[u8; TKIP_KEY_SIZE] = params.key.try_into().map_err(|_| {
                Error::InvalidArgument(format!("TKIP key is {} bytes, expected {TKIP_KEY_SIZE}", params.key.len()))
            })?;
            key = tkip_swap_mic(tkip);
        } else {
            key[..params.key.len()].copy_from_slice(params.key);
        }

        Ok(Self {
            addr: if params.key_type == KeyType::Wep {
                [0; ETH_ALEN]
            } else {
                params.addr
            },
            action: params.action,
            key_size: params.key.len() as u8,
            key_type: params.key_type,
            id: params.id,
            key,
            tx_seq_16: params.tx_seq_16,
            tx_seq_32: params.tx_seq_32,
        })
    }
}

impl<T: Transport, C: Clock> Wl1271<T, C> {
    /// Make WEP key `id` the default transmit key.
    pub fn set_default_wep_key(&mut self, id: u8) -> Result<()> {
        debug!("cmd set_default_wep_key {id}");

        let cmd = SetKeysCommand {
            addr: [0; ETH_ALEN],
            action: KeyAction::SetId,
            key_size: 0,
            key_type: KeyType::Wep,
            id,
            key: [0; MAX_KEY_SIZE],
            tx_seq_16: 0,
            tx_seq_32: 0,
        };

        self.send(&cmd, 0)
            .map(|_| ())
            .inspect_err(|e| warn!("cmd set_default_wep_key failed: {e}"))
    }

    /// Install, replace or remove a key.
    pub fn set_key(&mut self, params: &KeyParams<'_>) -> Result<()> {
        let cmd = SetKeysCommand::from_params(params)?;
        trace!(key_type = %cmd.key_type, id = cmd.id, "set key");

        self.send(&cmd, 0)
            .map(|_| ())
            .inspect_err(|_| warn!("could not set keys"))
    }
}
