//! Notice registry for host applications.
//!
//! Callers register named notices with display rules (styling, audience,
//! screen and content scoping, persistence); the registry decides per
//! viewer whether each notice should be shown on a render pass, renders
//! survivors with a dismiss control, and records dismissal so a notice is
//! not shown again to that viewer (or to anyone, for global dismissals).
//! The notice set and all dismissal flags survive process restarts
//! through an injected key-value store.
//!
//! The registry is an explicitly constructed instance with an explicit
//! lifecycle: `load` at cycle start, `complete_cycle` at cycle end. All
//! collaborators (store, token service, template provider, event
//! observers) are injected, never looked up ambiently.

pub mod errors;
pub mod persistence;
pub mod persistence_iface;
pub mod render;
pub mod service;
pub mod types;

// Re-export primary error types
pub use errors::{NoticeError, StorageError};

// Re-export collaborator ports
pub use persistence_iface::{
    DismissTokenService, KeyValueStore, RenderSink, TemplateProvider, ViewerIdentity,
};

// Re-export concrete persistence implementations
pub use persistence::InMemoryKeyValueStore;

// Re-export registry components
pub use service::{
    CycleKind, DefaultNoticeRegistry, NoticeEvent, NoticeRegistry, VisibleNotice,
};
pub use types::{
    dismiss_flag_key, DismissAction, DismissRequest, NoticeDefinition, NoticeInput, NoticeKind,
    NoticeMessage, NoticeRecord, RenderScope, DEFAULT_CAPABILITY, DISMISS_TOKEN_ACTION,
    NOTICES_STORAGE_KEY, REGISTRY_VERSION,
};
