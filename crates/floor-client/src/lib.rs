//! HTTP client for the xFloor memory API.

mod config;
#[cfg(feature = "test-util")]
pub mod mock;
mod xfloor;

pub use config::ClientConfig;
pub use floor_types::{FloorError, MemoryApi, MemoryConnector, RemoteResponse};
pub use xfloor::{to_plain, XfloorClient, XfloorConnector};

#[cfg(feature = "test-util")]
pub use mock::{MockConnector, RecordedCall};
