//! # BVision API
//!
//! Typed REST client for the BVision Hub backend. One [`ApiClient`] carries the
//! base URL, the HTTP connection pool and the signed-in user's bearer token;
//! per-resource services borrow it.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod gateway;
pub mod services;

// Re-export main types
pub use client::ApiClient;
pub use gateway::EntityGateway;
pub use services::{
    DeviceService, DeviceSource, GroupService, PermissionService, RecordingQuery,
    RecordingService, RecordingSource, RoleService, SiteService, UserService, WebRtcMessageRes,
    WebRtcService,
};
