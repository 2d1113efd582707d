// src/session.rs

use crate::constants::SESSION_COUNTER_MAX;
use crate::scan::ScanBand;

/// Scan parameters kept between a scan start and its completion event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    /// Band of the scan in flight; only tracked when the 5 GHz band is enabled.
    pub band: Option<ScanBand>,
    pub active: bool,
    pub high_prio: bool,
    pub probe_requests: u8,
    pub ssid: Vec<u8>,
}

/// Per-device sequencing state consulted and updated by the command encoders.
#[derive(Debug, Clone, Default)]
pub struct Session {
    session_counter: u8,
    calibrated: bool,
    scanning: bool,
    scan: ScanState,
    tx_security_seq_32: u32,
    tx_security_seq_16: u16,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_counter(&self) -> u8 {
        self.session_counter
    }

    /// Advance the join session counter and return the new value.
    pub(crate) fn next_session_counter(&mut self) -> u8 {
        self.session_counter += 1;
        if self.session_counter >= SESSION_COUNTER_MAX {
            self.session_counter = 0;
        }
        self.session_counter
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub(crate) fn mark_calibrated(&mut self) {
        self.calibrated = true;
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub(crate) fn set_scanning(&mut self, scanning: bool) {
        self.scanning = scanning;
    }

    pub fn scan(&self) -> &ScanState {
        &self.scan
    }

    pub(crate) fn scan_mut(&mut self) -> &mut ScanState {
        &mut self.scan
    }

    /// Transmit sequence counters of the current security association.
    pub fn tx_security_seq(&self) -> (u32, u16) {
        (self.tx_security_seq_32, self.tx_security_seq_16)
    }

    /// Updated by the data path as encrypted frames go out.
    pub fn set_tx_security_seq(&mut self, seq_32: u32, seq_16: u16) {
        self.tx_security_seq_32 = seq_32;
        self.tx_security_seq_16 = seq_16;
    }

    pub(crate) fn reset_tx_security_seq(&mut self) {
        self.tx_security_seq_32 = 0;
        self.tx_security_seq_16 = 0;
    }
}
