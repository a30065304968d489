//! REST-backed records exchanged with the BVision backend
//!
//! Field names follow the backend's camelCase JSON. Records are snapshots: the
//! client reads and submits them but never derives persistent state from them.

use serde::{Deserialize, Serialize};

/// Fields shared by every managed record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonOptions {
    /// Backend-defined status marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Creation timestamp as sent by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update timestamp as sent by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A registered camera or edge device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    /// Backend identifier
    pub id: String,
    /// Stable key used to address the device on the signaling relay
    pub key: String,
    /// Display name
    pub name: String,
    /// Firmware or agent version
    pub version: String,
    /// Reported hostname
    pub hostname: String,
    /// MAC addresses
    pub macs: Vec<String>,
    /// IP addresses
    pub ips: Vec<String>,
    /// Uptime as reported by the device
    pub uptime: String,
    /// Total memory as reported by the device
    pub total_memory: String,
    /// Used memory as reported by the device
    pub used_memory: String,
    /// ONVIF capability flag
    pub onvif: String,
    /// Timestamp of the last heartbeat, kept verbatim
    pub last_heartbeat: Option<String>,
    /// Direct stream URL when the device exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Permission granted through a role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Backend identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Code checked by authorization
    pub code: String,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Role assigned to users
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Backend identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Code checked by authorization
    pub code: String,
    /// Permissions carried by the role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Dashboard user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier
    pub id: String,
    /// Login name
    pub username: String,
    /// Only present on create payloads, never returned by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Contact email
    pub email: String,
    /// Assigned role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Device group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Backend identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Backend-defined group type
    #[serde(rename = "type", default)]
    pub group_type: String,
    /// Member devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Device>>,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Physical site hosting devices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Backend identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Devices installed at the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<Device>>,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Stored recording segment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    /// Backend identifier
    pub id: String,
    /// Name of the recording device
    pub device_name: String,
    /// Segment start (RFC 3339)
    pub start_time: String,
    /// Segment end (RFC 3339)
    pub end_time: String,
    /// Duration in seconds as reported by the backend
    #[serde(default)]
    pub duration: f64,
    /// Playback URL
    #[serde(default)]
    pub video_src: String,
    /// File size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Shared record fields
    #[serde(flatten)]
    pub common: CommonOptions,
}

/// Access and refresh tokens issued at sign-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToken {
    /// Bearer token for API calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Token used to obtain a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Profile of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Backend identifier
    pub id: String,
    /// Contact email
    pub email: String,
    /// Login name
    pub username: String,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Assigned role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInReq {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
}

/// Sign-up request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpReq {
    /// Login name
    pub username: String,
    /// Password
    pub password: String,
    /// Contact email
    pub email: String,
}

/// Sign-in / sign-up response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignInRes {
    /// Issued tokens
    #[serde(flatten)]
    pub token: UserToken,
    /// Signed-in user
    pub user: UserInfo,
}

/// Reply of the count endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRes {
    /// Number of records
    pub count: u64,
}

/// Reference to a role as submitted in user forms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    /// Role identifier
    pub id: String,
    /// Role name
    pub name: String,
    /// Role code
    pub code: String,
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.clone(),
            name: role.name.clone(),
            code: role.code.clone(),
        }
    }
}

/// Body sent when creating or updating a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayload {
    /// Display name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body sent when creating or updating a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePayload {
    /// Display name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Permissions granted by the role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

/// Body sent when creating or updating a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    /// Login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Omitted on updates that keep the current password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Assigned role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleRef>,
}

/// Body sent when creating or updating a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitePayload {
    /// Display name
    pub name: String,
    /// Street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Validated body for one of the managed entity kinds
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    /// Group body
    Group(GroupPayload),
    /// Role body
    Role(RolePayload),
    /// User body
    User(UserPayload),
    /// Site body
    Site(SitePayload),
}

/// Record returned after a create or update
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    /// Stored group
    Group(Group),
    /// Stored role
    Role(Role),
    /// Stored user
    User(User),
    /// Stored site
    Site(Site),
}

impl EntityRecord {
    /// Backend identifier of the stored record
    pub fn id(&self) -> &str {
        match self {
            EntityRecord::Group(g) => &g.id,
            EntityRecord::Role(r) => &r.id,
            EntityRecord::User(u) => &u.id,
            EntityRecord::Site(s) => &s.id,
        }
    }
}
