//! Azure Resource Manager REST client for Azure Stack Hub stamps

pub mod auth;
pub mod blob;
pub mod client;
pub mod common;
pub mod compute;
pub mod dns;
pub mod error;
pub mod network;
pub mod poller;
pub mod pool;
pub mod resources;
pub mod storage;

pub use client::{Client, ConnectSettings, RetryConfig};
pub use error::{ignore_not_found, ApiError};
pub use poller::PollTarget;
