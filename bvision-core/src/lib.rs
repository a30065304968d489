//! # BVision Core
//!
//! Entity model, device liveness, management form validation and the shared
//! error type for the BVision Hub client. This crate performs no I/O; the REST
//! client and the signaling layer build on it.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod forms;
pub mod model;
pub mod recording;

// Re-export main types
pub use device::{online_devices, parse_heartbeat, status_at, DeviceStatus, HEARTBEAT_FRESHNESS};
pub use error::BVisionError;
pub use forms::{
    EntityForm, EntityKind, FieldError, FieldSpec, FormMode, FormSchema, GroupForm, InputKind,
    RoleForm, SiteForm, UserForm, ValidationErrors,
};
pub use model::{
    CommonOptions, CountRes, Device, EntityPayload, EntityRecord, Group, GroupPayload, Permission,
    Recording, Role, RolePayload, RoleRef, SignInReq, SignInRes, SignUpReq, Site, SitePayload,
    User, UserInfo, UserPayload, UserToken,
};
pub use recording::RecordingCard;
