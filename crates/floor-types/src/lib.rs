//! Core types and traits for the xFloor memory gateway.
//!
//! Request DTOs mirror the field names of the remote xFloor memory API.

mod dto;
mod traits;

pub use dto::*;
pub use traits::*;
