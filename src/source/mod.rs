//! Clients for the remote event source service.
//!
//! - `traits`: the pull contract the sync engine depends on (`EventSource`)
//! - `http`: reqwest client for the JSON endpoints and the refresh trigger
//! - `stream`: Server-Sent Events push channel listener
//! - `types`: errors and response shapes

pub mod http;
pub mod stream;
pub mod traits;
pub mod types;

pub use http::HttpEventSource;
pub use stream::{ReconnectPolicy, StreamListener, StreamSignal};
pub use traits::EventSource;
pub use types::{Prediction, RefreshAck, SourceError};
