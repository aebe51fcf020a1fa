//! Per-room options sent to the conferencing server.

mod options;

pub use options::{ConfigXmlError, RoomOptions, AVAILABLE_LAYOUTS};
