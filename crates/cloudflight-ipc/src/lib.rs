//! Cloudflight IPC - event stream between the daemon and a presentation
//! process.
//!
//! Events travel as newline-delimited JSON objects of the shape
//! `{"event": "<channel>", ...fields}`, one per line.

pub mod error;
pub mod events;
pub mod stream;

pub use error::{IpcError, IpcResult};
pub use events::WireEvent;
pub use stream::{EventReader, EventWriter};
