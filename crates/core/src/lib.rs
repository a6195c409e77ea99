pub mod cancel;
pub mod config;
pub mod error;
pub mod media;
pub mod protocol;
pub mod session;
pub mod transport;

pub use cancel::{HoldSignal, TuneToken};
pub use config::TunerConfig;
pub use error::{Result, TunerError};
pub use media::RtpPacket;
pub use session::{Delivery, StreamMode, StreamRequest, StreamSession};
