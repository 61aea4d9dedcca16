//! Logger initialization.
//!
//! Library code only talks to the `log` facade; binaries and tests call
//! [`init_logging`] once to install `env_logger`.

mod init;

pub use init::{LoggingConfig, init_logging};
