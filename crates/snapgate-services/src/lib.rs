//! Snapgate Services Library
//!
//! The snapshot pipeline: cache probe, single-flight generation gate, stream tee,
//! completion notification, and the [`Gateway`] that composes them per request.

pub mod gateway;
pub mod generation;
pub mod notification;
pub mod probe;
pub mod serializer;
pub mod tee;

// Re-export commonly used types
pub use gateway::{
    Gateway, GatewayError, GatewayOptions, GatewayResponse, PersistHandle, PersistOutcome, Phase,
    SnapBody, StreamFault,
};
pub use generation::{
    GenerationError, GenerationResult, HttpSnapGenerator, SnapGenerator, SourceStream,
};
pub use notification::NotificationDispatcher;
pub use probe::{CacheProbe, ProbeError};
pub use serializer::{GenerationSerializer, GenerationTicket, SerializerClosed};
pub use tee::{tee, TeeBranch, TeeHandle, TeeSummary};
