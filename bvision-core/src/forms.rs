//! Management form schemas and local validation
//!
//! Each managed entity kind owns its own form type, field list and rules. The
//! [`EntityForm`] variant is chosen once when an editor opens; validation then
//! dispatches to the matching schema and yields either a typed
//! [`EntityPayload`] or field-level [`ValidationErrors`].

use crate::model::{
    EntityPayload, GroupPayload, RolePayload, RoleRef, SitePayload, UserPayload,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Managed entity kinds that have an editor form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Device group
    Group,
    /// Role
    Role,
    /// Dashboard user
    User,
    /// Site
    Site,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Group => "group",
            EntityKind::Role => "role",
            EntityKind::User => "user",
            EntityKind::Site => "site",
        };
        f.write_str(label)
    }
}

/// Whether the form creates a record or edits an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    /// New record
    Create,
    /// Existing record with the given identifier
    Update {
        /// Identifier of the record being edited
        id: String,
    },
}

impl FormMode {
    /// Whether this is a create form
    pub fn is_create(&self) -> bool {
        matches!(self, FormMode::Create)
    }
}

/// Input widget a field renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Single-line text
    Text,
    /// Email address
    Email,
    /// Masked password
    Password,
    /// Role picker
    RoleSelect,
}

/// One field shown by an entity form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, also the key for errors
    pub name: &'static str,
    /// Label shown next to the input
    pub label: &'static str,
    /// Placeholder text
    pub placeholder: &'static str,
    /// Input widget
    pub input: InputKind,
}

const fn field(
    name: &'static str,
    label: &'static str,
    placeholder: &'static str,
    input: InputKind,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        placeholder,
        input,
    }
}

const NAME: FieldSpec = field("name", "Name", "Enter name", InputKind::Text);
const DESCRIPTION: FieldSpec = field(
    "description",
    "Description",
    "Enter description",
    InputKind::Text,
);
const ADDRESS: FieldSpec = field("address", "Address", "Enter address", InputKind::Text);
const USERNAME: FieldSpec = field("username", "Username", "Enter username", InputKind::Text);
const EMAIL: FieldSpec = field("email", "Email", "Enter email", InputKind::Email);
const ROLE: FieldSpec = field("role", "Role", "Select a role", InputKind::RoleSelect);
const PASSWORD: FieldSpec = field(
    "password",
    "Password",
    "Enter password",
    InputKind::Password,
);

/// A message attached to one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Message shown under the field
    pub message: String,
}

/// Field-level validation failures, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Whether no field failed
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failing fields
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First message for a field
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// All errors
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Schema owned by one entity form type
pub trait FormSchema {
    /// Fields shown for the given mode
    fn fields(mode: &FormMode) -> Vec<FieldSpec>;

    /// Check the input and build the request body
    fn validate(&self, mode: &FormMode) -> Result<EntityPayload, ValidationErrors>;
}

fn optional(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn require_name(errors: &mut ValidationErrors, value: &str) {
    if value.is_empty() {
        errors.add("name", "Name is required");
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Whether `value` looks like a deliverable email address
pub fn is_valid_email(value: &str) -> bool {
    !value.contains("..") && email_pattern().is_match(value)
}

/// Group editor input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupForm {
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
}

impl FormSchema for GroupForm {
    fn fields(_mode: &FormMode) -> Vec<FieldSpec> {
        vec![NAME, DESCRIPTION]
    }

    fn validate(&self, _mode: &FormMode) -> Result<EntityPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_name(&mut errors, &self.name);
        errors.into_result(EntityPayload::Group(GroupPayload {
            name: self.name.clone(),
            description: optional(&self.description),
        }))
    }
}

/// Role editor input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleForm {
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
}

impl FormSchema for RoleForm {
    fn fields(_mode: &FormMode) -> Vec<FieldSpec> {
        vec![NAME, DESCRIPTION]
    }

    fn validate(&self, _mode: &FormMode) -> Result<EntityPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_name(&mut errors, &self.name);
        errors.into_result(EntityPayload::Role(RolePayload {
            name: self.name.clone(),
            description: optional(&self.description),
            permissions: None,
        }))
    }
}

/// User editor input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserForm {
    /// Login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Only collected when creating a user
    pub password: Option<String>,
    /// Selected role
    pub role: Option<RoleRef>,
}

impl FormSchema for UserForm {
    fn fields(mode: &FormMode) -> Vec<FieldSpec> {
        let mut fields = vec![USERNAME, EMAIL, ROLE];
        if mode.is_create() {
            fields.push(PASSWORD);
        }
        fields
    }

    fn validate(&self, mode: &FormMode) -> Result<EntityPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.username.is_empty() {
            errors.add("username", "Username is required");
        }
        if !is_valid_email(&self.email) {
            errors.add("email", "Invalid email address");
        }
        let password = optional(&self.password);
        match (&password, mode.is_create()) {
            (None, true) => errors.add("password", "Password is required"),
            (Some(p), _) if p.chars().count() < MIN_PASSWORD_LEN => errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ),
            _ => {}
        }
        errors.into_result(EntityPayload::User(UserPayload {
            username: self.username.clone(),
            email: self.email.clone(),
            password,
            role: self.role.clone(),
        }))
    }
}

/// Site editor input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteForm {
    /// Name
    pub name: String,
    /// Street address
    pub address: Option<String>,
    /// Description
    pub description: Option<String>,
}

impl FormSchema for SiteForm {
    fn fields(_mode: &FormMode) -> Vec<FieldSpec> {
        vec![NAME, DESCRIPTION, ADDRESS]
    }

    fn validate(&self, _mode: &FormMode) -> Result<EntityPayload, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_name(&mut errors, &self.name);
        errors.into_result(EntityPayload::Site(SitePayload {
            name: self.name.clone(),
            address: optional(&self.address),
            description: optional(&self.description),
        }))
    }
}

/// Editor input for one of the managed entity kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityForm {
    /// Group form
    Group(GroupForm),
    /// Role form
    Role(RoleForm),
    /// User form
    User(UserForm),
    /// Site form
    Site(SiteForm),
}

impl EntityForm {
    /// Entity kind edited by this form
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityForm::Group(_) => EntityKind::Group,
            EntityForm::Role(_) => EntityKind::Role,
            EntityForm::User(_) => EntityKind::User,
            EntityForm::Site(_) => EntityKind::Site,
        }
    }

    /// Fields rendered for this form
    pub fn fields(&self, mode: &FormMode) -> Vec<FieldSpec> {
        match self {
            EntityForm::Group(_) => GroupForm::fields(mode),
            EntityForm::Role(_) => RoleForm::fields(mode),
            EntityForm::User(_) => UserForm::fields(mode),
            EntityForm::Site(_) => SiteForm::fields(mode),
        }
    }

    /// Validate with the schema of this form's kind
    pub fn validate(&self, mode: &FormMode) -> Result<EntityPayload, ValidationErrors> {
        match self {
            EntityForm::Group(form) => form.validate(mode),
            EntityForm::Role(form) => form.validate(mode),
            EntityForm::User(form) => form.validate(mode),
            EntityForm::Site(form) => form.validate(mode),
        }
    }
}

impl EntityPayload {
    /// Entity kind of this body
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::Group(_) => EntityKind::Group,
            EntityPayload::Role(_) => EntityKind::Role,
            EntityPayload::User(_) => EntityKind::User,
            EntityPayload::Site(_) => EntityKind::Site,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password: Option<&str>) -> UserForm {
        UserForm {
            username: "operator".to_string(),
            email: "operator@example.com".to_string(),
            password: password.map(str::to_string),
            role: None,
        }
    }

    fn update() -> FormMode {
        FormMode::Update {
            id: "u-1".to_string(),
        }
    }

    #[test]
    fn test_user_create_requires_password() {
        let errors = user(None).validate(&FormMode::Create).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.message_for("password"), Some("Password is required"));

        let errors = user(Some("")).validate(&FormMode::Create).unwrap_err();
        assert_eq!(errors.message_for("password"), Some("Password is required"));
    }

    #[test]
    fn test_user_update_without_password() {
        let payload = user(None).validate(&update()).unwrap();
        match payload {
            EntityPayload::User(body) => {
                assert_eq!(body.username, "operator");
                assert!(body.password.is_none());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_short_password_rejected_in_both_modes() {
        for mode in [FormMode::Create, update()] {
            let errors = user(Some("abc")).validate(&mode).unwrap_err();
            assert_eq!(
                errors.message_for("password"),
                Some("Password must be at least 6 characters")
            );
        }
        assert!(user(Some("secret")).validate(&FormMode::Create).is_ok());
    }

    #[test]
    fn test_user_field_errors_accumulate() {
        let form = UserForm {
            username: String::new(),
            email: "nope".to_string(),
            password: None,
            role: None,
        };
        let errors = form.validate(&FormMode::Create).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["username", "email", "password"]);
        assert_eq!(errors.message_for("email"), Some("Invalid email address"));
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a.b+tag@cam-hub.example.io"));
        assert!(!is_valid_email("missing-at.example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("user..dots@example.com"));
    }

    #[test]
    fn test_name_required_for_named_entities() {
        let forms = [
            EntityForm::Group(GroupForm::default()),
            EntityForm::Role(RoleForm::default()),
            EntityForm::Site(SiteForm::default()),
        ];
        for form in forms {
            let errors = form.validate(&FormMode::Create).unwrap_err();
            assert_eq!(errors.message_for("name"), Some("Name is required"));
        }
    }

    #[test]
    fn test_site_payload_drops_empty_optionals() {
        let form = SiteForm {
            name: "Depot".to_string(),
            address: Some(String::new()),
            description: Some("North gate".to_string()),
        };
        let payload = EntityForm::Site(form).validate(&FormMode::Create).unwrap();
        assert_eq!(
            payload,
            EntityPayload::Site(SitePayload {
                name: "Depot".to_string(),
                address: None,
                description: Some("North gate".to_string()),
            })
        );
        assert_eq!(payload.kind(), EntityKind::Site);
    }

    #[test]
    fn test_field_lists_per_kind() {
        let names = |form: &EntityForm, mode: &FormMode| -> Vec<&'static str> {
            form.fields(mode).iter().map(|f| f.name).collect()
        };
        let user_form = EntityForm::User(UserForm::default());
        assert_eq!(
            names(&user_form, &FormMode::Create),
            vec!["username", "email", "role", "password"]
        );
        assert_eq!(names(&user_form, &update()), vec!["username", "email", "role"]);
        assert_eq!(
            names(&EntityForm::Site(SiteForm::default()), &FormMode::Create),
            vec!["name", "description", "address"]
        );
        assert_eq!(
            names(&EntityForm::Group(GroupForm::default()), &FormMode::Create),
            vec!["name", "description"]
        );
    }

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name is required");
        errors.add("email", "Invalid email address");
        assert_eq!(
            errors.to_string(),
            "name: Name is required, email: Invalid email address"
        );
    }
}
