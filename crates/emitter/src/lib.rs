//! Outbound side of the order saga.
//!
//! Events are encoded once into an [`OutboundMessage`] and handed to a
//! [`Transport`]. Every transport is usable as an [`EventEmitter`] through a
//! blanket implementation.

pub mod emitter;
pub mod error;
pub mod transports;

pub use emitter::{EventEmitter, OutboundMessage, Transport, TransportKind};
pub use error::{EmitError, Result};
pub use transports::{
    BusTransport, HttpEndpoints, HttpTransport, LogTransport, QueueTransport, RecordingTransport,
};
