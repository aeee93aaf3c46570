use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Module version, kept in sync with the package version.
pub const REGISTRY_VERSION: &str = "1.0.2";

/// Capability required to see a notice when the registration omits one.
pub const DEFAULT_CAPABILITY: &str = "manage_options";

/// Key under which the full notice set is persisted.
pub const NOTICES_STORAGE_KEY: &str = "notice_registry_notices";

/// Fixed action name every dismiss token is bound to.
pub const DISMISS_TOKEN_ACTION: &str = "hide_notice";

/// Query parameter carried by a per-viewer dismiss link.
pub const DISMISS_PARAM: &str = "dismiss";

/// Query parameter carried by a dismiss-for-everyone link.
pub const DISMISS_ALL_PARAM: &str = "dismiss-all";

lazy_static! {
    static ref HEX_COLOR: Regex =
        Regex::new("^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("hex color pattern is valid");
}

// --- Enums ---

/// Visual styling of a notice: one of the four known kinds, or a custom
/// hex color used as a left-border accent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
    Custom(String),
}

impl NoticeKind {
    /// Parses a free-form type token.
    ///
    /// Returns `None` when the token is neither a known kind nor a valid
    /// 3- or 6-digit hex color; registration fails in that case.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "success" => Some(NoticeKind::Success),
            "error" => Some(NoticeKind::Error),
            "warning" => Some(NoticeKind::Warning),
            "info" => Some(NoticeKind::Info),
            other if HEX_COLOR.is_match(other) => Some(NoticeKind::Custom(other.to_string())),
            _ => None,
        }
    }

    /// CSS class suffix for the known kinds, `None` for custom colors.
    pub fn css_token(&self) -> Option<&'static str> {
        match self {
            NoticeKind::Success => Some("success"),
            NoticeKind::Error => Some("error"),
            NoticeKind::Warning => Some("warning"),
            NoticeKind::Info => Some("info"),
            NoticeKind::Custom(_) => None,
        }
    }

    /// Accent color for custom kinds, `None` for the known kinds.
    pub fn accent_color(&self) -> Option<&str> {
        match self {
            NoticeKind::Custom(color) => Some(color),
            _ => None,
        }
    }
}

/// Source of a notice's rendered content.
///
/// Resolution precedence is fixed: registered callback > template
/// resource > literal markup. Callbacks are referenced by name because
/// closures cannot be persisted; they are re-attached after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeMessage {
    Literal(String),
    Template(String),
    Computed(String),
}

impl Default for NoticeMessage {
    fn default() -> Self {
        NoticeMessage::Literal(String::new())
    }
}

// --- Core types ---

/// A registered notice: styling, audience, scoping and dismissal rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeDefinition {
    #[serde(default)]
    pub kind: NoticeKind,
    #[serde(default = "default_capability")]
    pub capability: String,
    #[serde(default)]
    pub message: NoticeMessage,
    /// Screens the notice applies to; empty means all screens.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screen_scope: Vec<String>,
    /// Content items the notice applies to; empty means all content.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_scope: Vec<String>,
    #[serde(default = "default_true")]
    pub dismissible: bool,
    /// Dismissal applies to every viewer. Wins over `dismissible` when
    /// both are set.
    #[serde(default)]
    pub dismiss_globally: bool,
    /// A non-persistent notice is removed after its first render.
    #[serde(default = "default_true")]
    pub persistent: bool,
}

fn default_capability() -> String {
    DEFAULT_CAPABILITY.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for NoticeDefinition {
    fn default() -> Self {
        NoticeDefinition {
            kind: NoticeKind::default(),
            capability: default_capability(),
            message: NoticeMessage::default(),
            screen_scope: Vec::new(),
            content_scope: Vec::new(),
            dismissible: true,
            dismiss_globally: false,
            persistent: true,
        }
    }
}

/// Registration arguments. Omitted fields fall back to the defaults of
/// [`NoticeDefinition`]; the `kind` token is validated at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct NoticeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<NoticeMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_scope: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_scope: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_globally: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
}

impl NoticeInput {
    /// Folds the input into a full definition, applying defaults.
    ///
    /// Returns `None` when the kind token is neither a known kind nor a
    /// valid hex color.
    pub fn into_definition(self) -> Option<NoticeDefinition> {
        let kind = match self.kind {
            Some(token) => NoticeKind::parse(&token)?,
            None => NoticeKind::default(),
        };
        Some(NoticeDefinition {
            kind,
            capability: self.capability.unwrap_or_else(default_capability),
            message: self.message.unwrap_or_default(),
            screen_scope: self.screen_scope.unwrap_or_default(),
            content_scope: self.content_scope.unwrap_or_default(),
            dismissible: self.dismissible.unwrap_or(true),
            dismiss_globally: self.dismiss_globally.unwrap_or(false),
            persistent: self.persistent.unwrap_or(true),
        })
    }
}

/// A named entry in the registry. The persisted notice set is an ordered
/// sequence of these records; registration order is render order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeRecord {
    pub name: String,
    pub definition: NoticeDefinition,
}

/// The current screen and content identifiers a render pass filters
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderScope {
    pub screen_id: Option<String>,
    pub content_id: Option<String>,
}

impl RenderScope {
    pub fn for_screen(screen_id: impl Into<String>) -> Self {
        RenderScope {
            screen_id: Some(screen_id.into()),
            content_id: None,
        }
    }
}

// --- Dismiss requests ---

/// Which dismissal a request asks for, carrying the target notice name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissAction {
    /// Dismiss for the current viewer only.
    One(String),
    /// Dismiss for every viewer.
    All(String),
}

impl DismissAction {
    pub fn notice_name(&self) -> &str {
        match self {
            DismissAction::One(name) | DismissAction::All(name) => name,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, DismissAction::All(_))
    }
}

/// An inbound dismiss signal plus the anti-forgery token that must
/// accompany it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissRequest {
    pub action: DismissAction,
    pub token: Option<String>,
}

// --- Key derivation ---

/// Key of the dismissal flag for `name`, scoped to a viewer identity or
/// global when `viewer` is `None`.
pub fn dismiss_flag_key(name: &str, viewer: Option<&str>) -> String {
    match viewer {
        Some(viewer_id) => format!("viewer_{}_hide_{}_notice", viewer_id, name),
        None => format!("hide_{}_notice", name),
    }
}

/// Key of the auxiliary per-notice record deleted alongside the entry.
pub fn notice_record_key(name: &str) -> String {
    format!("notice_registry_notice_{}", name)
}
