//! Transport implementations.

mod bus;
mod http;
mod log;
mod queue;
mod recording;

pub use bus::BusTransport;
pub use http::{HttpEndpoints, HttpTransport};
pub use log::LogTransport;
pub use queue::QueueTransport;
pub use recording::RecordingTransport;
