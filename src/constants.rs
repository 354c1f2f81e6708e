use std::time::Duration;

/// Name used for the zero-configuration registration.
pub const DEFAULT_NAME: &str = "Default";

/// Property key stamped on native configurations with the name of the
/// options that produced them.
pub const OPTIONS_NAME_PROPERTY: &str = "x-rust-options-name";

pub const AMQP_DEFAULT_PORT: u16 = 5672;

pub const STREAM_DEFAULT_PORT: u16 = 5552;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(60);

pub const DEFAULT_CLIENT_PROVIDED_NAME: &str = env!("CARGO_PKG_NAME");
