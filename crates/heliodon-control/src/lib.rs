//! Control surface for heliodon - TCP server for driving the sun simulation
//!
//! Start the control server in your app:
//! ```ignore
//! let handler = Arc::new(Mutex::new(MyHandler::new()));
//! let server = ControlServer::bind(handler, ("127.0.0.1", DEFAULT_PORT)).await?;
//! ```

pub mod protocol;
pub mod server;

pub use protocol::*;
pub use server::{ControlHandler, ControlServer};

/// Default control server port
pub const DEFAULT_PORT: u16 = 9743;
