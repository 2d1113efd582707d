// Wire and register constants for the wl1271 command mailbox

use std::time::Duration;

// --- Register file ---

/// Base of the ACX register window in the device address space.
pub const REGISTERS_BASE: u32 = 0x0030_0000;

/// Host-to-firmware interrupt trigger register.
pub const ACX_REG_INTERRUPT_TRIG: u32 = REGISTERS_BASE + 0x0474;

/// Firmware-to-host interrupt status, readable without clearing it.
pub const ACX_REG_INTERRUPT_NO_CLEAR: u32 = REGISTERS_BASE + 0x04E8;

/// Firmware-to-host interrupt acknowledge register.
pub const ACX_REG_INTERRUPT_ACK: u32 = REGISTERS_BASE + 0x04F0;

/// Written to `ACX_REG_INTERRUPT_TRIG` to start executing the command box.
pub const INTR_TRIG_CMD: u32 = 1 << 0;

/// Set in `ACX_REG_INTERRUPT_NO_CLEAR` once the firmware finished a command.
pub const INTR_CMD_COMPLETE: u32 = 1 << 9;

// --- Timing ---

/// Deadline for the command-complete interrupt, measured from the trigger.
pub const COMMAND_TIMEOUT: Duration = Duration::from_millis(2000);

/// Deadline for an event mailbox bit.
pub const EVENT_TIMEOUT: Duration = Duration::from_millis(750);

/// Number of busy-wait polls before the channel starts sleeping.
pub const CMD_FAST_POLL_COUNT: u32 = 50;

pub const CMD_FAST_POLL_DELAY: Duration = Duration::from_micros(10);
pub const CMD_SLOW_POLL_DELAY: Duration = Duration::from_millis(1);
pub const EVENT_POLL_DELAY: Duration = Duration::from_millis(1);

// --- Layout ---

/// Largest template payload the firmware accepts.
pub const CMD_TEMPL_MAX_SIZE: usize = 252;

/// Largest single READ_MEMORY transfer.
pub const MAX_READ_SIZE: usize = 256;

/// Channel descriptors carried by one scan command.
pub const SCAN_MAX_CHANNELS: usize = 24;

/// The join session counter wraps to 0 when it reaches this value.
pub const SESSION_COUNTER_MAX: u8 = 7;

pub const ETH_ALEN: usize = 6;
pub const SSID_MAX_LEN: usize = 32;
pub const MAX_KEY_SIZE: usize = 32;
pub const NUM_ACCESS_CATEGORIES: usize = 4;

// --- Event mailbox bits ---

pub const SCAN_COMPLETE_EVENT_ID: u32 = 1 << 10;
pub const DISCONNECT_EVENT_COMPLETE_ID: u32 = 1 << 15;
pub const JOIN_EVENT_COMPLETE_ID: u32 = 1 << 16;

// --- RX configuration / filter bits ---

pub const CFG_RX_FCS: u32 = 1 << 1;
pub const CFG_RX_ALL_GOOD: u32 = 1 << 2;
pub const CFG_UNI_FILTER_EN: u32 = 1 << 3;
pub const CFG_BSSID_FILTER_EN: u32 = 1 << 5;

pub const CFG_RX_RCTS_ACK: u32 = 1 << 1;
pub const CFG_RX_PRSP_EN: u32 = 1 << 2;
pub const CFG_RX_PREQ_EN: u32 = 1 << 3;
pub const CFG_RX_MGMT_EN: u32 = 1 << 4;
pub const CFG_RX_DATA_EN: u32 = 1 << 6;
pub const CFG_RX_CTL_EN: u32 = 1 << 7;
pub const CFG_RX_BCN_EN: u32 = 1 << 9;
pub const CFG_RX_AUTH_EN: u32 = 1 << 10;
pub const CFG_RX_ASSOC_EN: u32 = 1 << 11;

// --- Rates ---

pub const CONF_HW_BIT_RATE_1MBPS: u32 = 1 << 0;
pub const CONF_HW_BIT_RATE_2MBPS: u32 = 1 << 1;
pub const CONF_HW_BIT_RATE_6MBPS: u32 = 1 << 3;

/// Lets the firmware pick the rate for a template.
pub const RATE_AUTOMATIC: u32 = 0;
