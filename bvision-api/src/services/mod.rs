//! One service per backend resource

mod device;
mod group;
mod permission;
mod recording;
mod role;
mod site;
mod user;
mod webrtc;

pub use device::{DeviceService, DeviceSource, DEVICES_PATH};
pub use group::{GroupService, GROUPS_PATH};
pub use permission::{PermissionService, PERMISSIONS_PATH};
pub use recording::{RecordingQuery, RecordingService, RecordingSource, RECORDINGS_PATH};
pub use role::{RoleService, ROLES_PATH};
pub use site::{SiteService, SITES_PATH};
pub use user::{
    UserService, AUTH_LOGOUT_PATH, AUTH_REFRESH_PATH, AUTH_SIGNIN_PATH, AUTH_SIGNUP_PATH,
    USERS_PATH,
};
pub use webrtc::{WebRtcMessageRes, WebRtcService, WEBRTC_MESSAGE_PATH};

/// Path of one record under `collection`, with `id` percent-encoded as a
/// single segment
pub fn item_path(collection: &str, id: &str) -> String {
    format!("{collection}/{}", urlencoding::encode(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_path_escapes_id() {
        assert_eq!(item_path(DEVICES_PATH, "d-9"), "/devices/d-9");
        assert_eq!(item_path(USERS_PATH, "a/b?c#d"), "/users/a%2Fb%3Fc%23d");
        assert_eq!(item_path(SITES_PATH, "north site"), "/sites/north%20site");
    }
}
