//! HTTP gateway that forwards memory requests to the xFloor API.

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
