pub mod acx;
pub mod calibration;
pub mod channel;
pub mod command;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod event;
pub mod join;
pub mod keys;
pub mod memory;
pub mod nvs;
pub mod power;
pub mod scan;
pub mod session;
pub mod template;
pub mod transport;


// Re-export the device and its collaborators for easy access
pub use channel::CommandChannel;
pub use config::Conf;
pub use device::{Band, BandInfo, BssContext, BssType, Channel, FrameBuilder, Wl1271};
pub use error::{Error, Result};
pub use transport::{Clock, SystemClock, Transport};
