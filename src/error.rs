// src/error.rs

use crate::command::{CommandId, CommandStatus};
use crate::template::TemplateType;
use std::fmt;
use std::io;
use thiserror::Error;

/// What a bounded wait was polling for when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    CommandComplete(CommandId),
    Event(u32),
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitTarget::CommandComplete(id) => write!(f, "command complete interrupt ({id})"),
            WaitTarget::Event(mask) => write!(f, "event mailbox mask {mask:#010x}"),
        }
    }
}

/// The primary error type for the `wl1271-cmd` library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Timeout waiting for {0}")]
    Timeout(WaitTarget),

    #[error("Command {command} rejected by firmware with status {status:?}")]
    DeviceRejected { command: CommandId, status: CommandStatus },

    #[error("Could not allocate a {requested} byte command buffer")]
    ResourceExhausted { requested: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No device: non-volatile parameter store is not loaded")]
    NoDevice,

    #[error("Frame builder produced no {0} template")]
    FrameUnavailable(TemplateType),

    #[error("{sequence} failed at step '{step}': {source}")]
    PartialSequence {
        sequence: &'static str,
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Transport error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn partial(sequence: &'static str, step: &'static str, source: Error) -> Self {
        Error::PartialSequence {
            sequence,
            step,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through any partial-sequence wrapping.
    pub fn root(&self) -> &Error {
        match self {
            Error::PartialSequence { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
