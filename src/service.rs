//! Notice registry service.
//!
//! Stores notice definitions keyed by name, decides per-viewer visibility
//! on each render pass, renders survivors with a dismiss control, and
//! persists both the notice set and dismissal flags through the injected
//! [`KeyValueStore`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::NoticeError;
use crate::persistence_iface::{
    DismissTokenService, KeyValueStore, RenderSink, TemplateProvider, ViewerIdentity,
};
use crate::render;
use crate::types::{
    dismiss_flag_key, notice_record_key, DismissRequest, NoticeDefinition, NoticeInput,
    NoticeMessage, NoticeRecord, RenderScope, DISMISS_TOKEN_ACTION, NOTICES_STORAGE_KEY,
};

/// Events published to external observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    /// A dismiss request was accepted for the named notice.
    Dismissed { name: String, global: bool },
}

/// What kind of processing cycle is completing. End-of-cycle flushes are
/// skipped for background task runs to avoid redundant writes during
/// scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Interactive,
    BackgroundTask,
}

/// A notice that survived the visibility filter, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNotice {
    pub name: String,
    pub definition: NoticeDefinition,
}

/// Zero-argument callback producing notice markup, referenced by name
/// from [`NoticeMessage::Computed`].
pub type MessageCallback = Arc<dyn Fn() -> String + Send + Sync>;

/// Hook adjusting the CSS class set before output.
pub type ClassHook = Box<dyn Fn(Vec<String>, &str, &NoticeDefinition) -> Vec<String> + Send + Sync>;

/// Hook adjusting the resolved message before output.
pub type MessageHook = Box<dyn Fn(String, &str, &NoticeDefinition) -> String + Send + Sync>;

/// Interface of the notice registry.
#[async_trait]
pub trait NoticeRegistry: Send + Sync {
    /// Registers a notice under `name`.
    ///
    /// Returns `Ok(false)` without mutating when the name is empty, the
    /// kind token is invalid, or the name is already registered and
    /// `force` is not set. A forced registration overwrites the existing
    /// entry and persists the full set immediately.
    async fn register(
        &self,
        name: &str,
        input: NoticeInput,
        force: bool,
    ) -> Result<bool, NoticeError>;

    /// Case-sensitive membership test.
    fn is_registered(&self, name: &str) -> bool;

    /// Removes a notice and its auxiliary per-notice record. Idempotent
    /// when the name is absent. `immediate_persist` flushes the set
    /// synchronously instead of waiting for the end-of-cycle flush.
    async fn remove(&self, name: &str, immediate_persist: bool) -> Result<(), NoticeError>;

    /// Clears every registered notice. Dismissal flags are untouched.
    fn remove_all(&self);

    /// Applies the visibility filter pipeline for the given viewer and
    /// scope: screen scope, content scope, capability, dismissal flag.
    /// Pure read; registration order is preserved.
    async fn collect_visible_notices(
        &self,
        viewer: &dyn ViewerIdentity,
        scope: &RenderScope,
    ) -> Result<Vec<VisibleNotice>, NoticeError>;

    /// Collects visible notices, renders each to the sink, then removes
    /// non-persistent survivors (one-shot semantics) with an immediate
    /// flush.
    async fn render_pass(
        &self,
        viewer: &dyn ViewerIdentity,
        scope: &RenderScope,
        sink: &mut dyn RenderSink,
    ) -> Result<(), NoticeError>;

    /// Handles an inbound dismiss signal. A missing or invalid token is a
    /// silent no-op. On a valid request the notice is removed, the
    /// dismissal flag (global or per-viewer) is set, and a
    /// [`NoticeEvent::Dismissed`] is published.
    async fn handle_dismiss_request(
        &self,
        request: &DismissRequest,
        viewer: &dyn ViewerIdentity,
    ) -> Result<(), NoticeError>;

    /// Serializes the full notice set to the store.
    async fn persist(&self) -> Result<(), NoticeError>;

    /// Loads the notice set from the store; absence initializes an empty
    /// set.
    async fn load(&self) -> Result<(), NoticeError>;

    /// End-of-cycle flush, skipped for background task cycles.
    async fn complete_cycle(&self, kind: CycleKind) -> Result<(), NoticeError>;
}

/// Default implementation of the notice registry.
pub struct DefaultNoticeRegistry {
    /// Registered notices in registration order.
    notices: RwLock<VecDeque<NoticeRecord>>,
    /// Durable key-value store collaborator.
    store: Arc<dyn KeyValueStore>,
    /// Anti-forgery token service for dismiss links.
    tokens: Arc<dyn DismissTokenService>,
    /// Template resource resolver for [`NoticeMessage::Template`].
    templates: Arc<dyn TemplateProvider>,
    /// Named callbacks for [`NoticeMessage::Computed`].
    callbacks: RwLock<HashMap<String, MessageCallback>>,
    class_hook: Option<ClassHook>,
    message_hook: Option<MessageHook>,
    event_publisher: Box<dyn Fn(NoticeEvent) + Send + Sync>,
}

impl DefaultNoticeRegistry {
    pub fn new<F>(
        store: Arc<dyn KeyValueStore>,
        tokens: Arc<dyn DismissTokenService>,
        templates: Arc<dyn TemplateProvider>,
        event_publisher: F,
    ) -> Self
    where
        F: Fn(NoticeEvent) + Send + Sync + 'static,
    {
        DefaultNoticeRegistry {
            notices: RwLock::new(VecDeque::new()),
            store,
            tokens,
            templates,
            callbacks: RwLock::new(HashMap::new()),
            class_hook: None,
            message_hook: None,
            event_publisher: Box::new(event_publisher),
        }
    }

    /// Installs a hook adjusting the CSS class set before output.
    pub fn with_class_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Vec<String>, &str, &NoticeDefinition) -> Vec<String> + Send + Sync + 'static,
    {
        self.class_hook = Some(Box::new(hook));
        self
    }

    /// Installs a hook adjusting the resolved message before output.
    pub fn with_message_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(String, &str, &NoticeDefinition) -> String + Send + Sync + 'static,
    {
        self.message_hook = Some(Box::new(hook));
        self
    }

    /// Registers a named message callback for computed messages.
    ///
    /// Callbacks are not persisted; hosts re-register them after `load`.
    pub fn register_message_callback<F>(&self, name: &str, callback: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.insert(name.to_string(), Arc::new(callback));
        }
    }

    /// Names of all registered notices, in registration order.
    pub fn registered_names(&self) -> Vec<String> {
        self.notices
            .read()
            .map(|notices| notices.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }

    fn notices_read(&self) -> Result<RwLockReadGuard<'_, VecDeque<NoticeRecord>>, NoticeError> {
        self.notices.read().map_err(|e| {
            NoticeError::InternalError(format!("Failed to acquire read lock for notices: {}", e))
        })
    }

    fn notices_write(&self) -> Result<RwLockWriteGuard<'_, VecDeque<NoticeRecord>>, NoticeError> {
        self.notices.write().map_err(|e| {
            NoticeError::InternalError(format!("Failed to acquire write lock for notices: {}", e))
        })
    }

    fn snapshot(&self) -> Result<Vec<NoticeRecord>, NoticeError> {
        Ok(self.notices_read()?.iter().cloned().collect())
    }

    fn publish_event(&self, event: NoticeEvent) {
        (self.event_publisher)(event);
    }

    /// Resolves a notice message to markup. Precedence is fixed:
    /// registered callback, then template resource, then literal text.
    fn resolve_message(&self, name: &str, definition: &NoticeDefinition) -> String {
        match &definition.message {
            NoticeMessage::Computed(callback_name) => {
                let callback = self
                    .callbacks
                    .read()
                    .ok()
                    .and_then(|callbacks| callbacks.get(callback_name).cloned());
                match callback {
                    Some(callback) => callback(),
                    None => {
                        warn!(
                            "Notice '{}' references unregistered message callback '{}'",
                            name, callback_name
                        );
                        String::new()
                    }
                }
            }
            NoticeMessage::Template(resource_id) => self
                .templates
                .render(resource_id)
                .unwrap_or_else(|| resource_id.clone()),
            NoticeMessage::Literal(text) => text.clone(),
        }
    }

    /// Composes the full markup for one visible notice.
    fn render_notice(&self, name: &str, definition: &NoticeDefinition) -> String {
        let mut classes = render::compose_class_list(definition);
        if let Some(hook) = &self.class_hook {
            classes = hook(classes, name, definition);
        }

        let mut message = self.resolve_message(name, definition);
        if let Some(hook) = &self.message_hook {
            message = hook(message, name, definition);
        }

        if let Some(param) = render::dismiss_param(definition) {
            let token = self.tokens.issue(DISMISS_TOKEN_ACTION);
            let url = render::dismiss_url(param, name, &token);
            message.push_str(&render::dismiss_link(&url));
        }

        let style = render::accent_style(definition);
        render::compose_markup(name, &classes, &style, &message)
    }

    async fn is_dismissed(
        &self,
        name: &str,
        definition: &NoticeDefinition,
        viewer_id: &str,
    ) -> Result<bool, NoticeError> {
        let key = if definition.dismiss_globally {
            dismiss_flag_key(name, None)
        } else {
            dismiss_flag_key(name, Some(viewer_id))
        };
        let raw = self
            .store
            .get(&key)
            .await
            .map_err(|e| NoticeError::storage("read_dismiss_flag", e))?;
        Ok(matches!(
            raw.as_deref().map(serde_json::from_str::<bool>),
            Some(Ok(true))
        ))
    }
}

#[async_trait]
impl NoticeRegistry for DefaultNoticeRegistry {
    async fn register(
        &self,
        name: &str,
        input: NoticeInput,
        force: bool,
    ) -> Result<bool, NoticeError> {
        if name.is_empty() {
            warn!("Rejecting notice registration with empty name");
            return Ok(false);
        }

        let Some(definition) = input.into_definition() else {
            warn!("Rejecting notice '{}': invalid kind token", name);
            return Ok(false);
        };

        {
            let mut notices = self.notices_write()?;
            let existing = notices.iter().position(|r| r.name == name);
            match existing {
                Some(_) if !force => {
                    debug!("Notice '{}' already registered, skipping", name);
                    return Ok(false);
                }
                Some(index) => {
                    notices[index] = NoticeRecord {
                        name: name.to_string(),
                        definition,
                    };
                }
                None => notices.push_back(NoticeRecord {
                    name: name.to_string(),
                    definition,
                }),
            }
        }

        // Forced registrations flush synchronously to shrink the window in
        // which a crash could lose the change.
        if force {
            self.persist().await?;
        }

        Ok(true)
    }

    fn is_registered(&self, name: &str) -> bool {
        self.notices
            .read()
            .map(|notices| notices.iter().any(|r| r.name == name))
            .unwrap_or(false)
    }

    async fn remove(&self, name: &str, immediate_persist: bool) -> Result<(), NoticeError> {
        {
            let mut notices = self.notices_write()?;
            if let Some(index) = notices.iter().position(|r| r.name == name) {
                notices.remove(index);
                debug!("Removed notice '{}'", name);
            }
        }

        self.store
            .delete(&notice_record_key(name))
            .await
            .map_err(|e| NoticeError::storage("delete_notice_record", e))?;

        if immediate_persist {
            self.persist().await?;
        }

        Ok(())
    }

    fn remove_all(&self) {
        if let Ok(mut notices) = self.notices.write() {
            notices.clear();
        }
    }

    async fn collect_visible_notices(
        &self,
        viewer: &dyn ViewerIdentity,
        scope: &RenderScope,
    ) -> Result<Vec<VisibleNotice>, NoticeError> {
        let records = self.snapshot()?;
        let viewer_id = viewer.id();
        let mut visible = Vec::new();

        for record in records {
            let definition = &record.definition;

            if !definition.screen_scope.is_empty() {
                let on_screen = scope
                    .screen_id
                    .as_ref()
                    .map(|id| definition.screen_scope.contains(id))
                    .unwrap_or(false);
                if !on_screen {
                    continue;
                }
            }

            if !definition.content_scope.is_empty() {
                let on_content = scope
                    .content_id
                    .as_ref()
                    .map(|id| definition.content_scope.contains(id))
                    .unwrap_or(false);
                if !on_content {
                    continue;
                }
            }

            if !viewer.has_capability(&definition.capability) {
                continue;
            }

            if self.is_dismissed(&record.name, definition, &viewer_id).await? {
                continue;
            }

            visible.push(VisibleNotice {
                name: record.name,
                definition: record.definition,
            });
        }

        Ok(visible)
    }

    async fn render_pass(
        &self,
        viewer: &dyn ViewerIdentity,
        scope: &RenderScope,
        sink: &mut dyn RenderSink,
    ) -> Result<(), NoticeError> {
        let visible = self.collect_visible_notices(viewer, scope).await?;

        for notice in &visible {
            let markup = self.render_notice(&notice.name, &notice.definition);
            sink.append(&markup);
        }

        // One-shot notices are gone after their first render.
        for notice in &visible {
            if !notice.definition.persistent {
                self.remove(&notice.name, true).await?;
            }
        }

        Ok(())
    }

    async fn handle_dismiss_request(
        &self,
        request: &DismissRequest,
        viewer: &dyn ViewerIdentity,
    ) -> Result<(), NoticeError> {
        let Some(token) = &request.token else {
            debug!("Dismiss request without token ignored");
            return Ok(());
        };

        if !self.tokens.verify(token, DISMISS_TOKEN_ACTION) {
            warn!(
                "Dismiss request for '{}' failed token verification, ignoring",
                request.action.notice_name()
            );
            return Ok(());
        }

        let name = request.action.notice_name().to_string();
        let global = request.action.is_global();

        self.remove(&name, false).await?;

        let key = if global {
            dismiss_flag_key(&name, None)
        } else {
            dismiss_flag_key(&name, Some(&viewer.id()))
        };
        self.store
            .set(&key, "true".to_string())
            .await
            .map_err(|e| NoticeError::storage("set_dismiss_flag", e))?;

        info!("Notice '{}' dismissed ({})", name, if global { "global" } else { "per-viewer" });
        self.publish_event(NoticeEvent::Dismissed { name, global });

        Ok(())
    }

    async fn persist(&self) -> Result<(), NoticeError> {
        let records = self.snapshot()?;
        debug!("Persisting {} notices to '{}'", records.len(), NOTICES_STORAGE_KEY);

        let encoded = serde_json::to_string(&records)
            .map_err(|e| NoticeError::InternalError(format!("Notice set serialization failed: {}", e)))?;

        self.store
            .set(NOTICES_STORAGE_KEY, encoded)
            .await
            .map_err(|e| NoticeError::storage("persist", e))
    }

    async fn load(&self) -> Result<(), NoticeError> {
        let raw = self
            .store
            .get(NOTICES_STORAGE_KEY)
            .await
            .map_err(|e| NoticeError::storage("load", e))?;

        let records: VecDeque<NoticeRecord> = match raw {
            Some(encoded) => serde_json::from_str(&encoded).map_err(|e| {
                NoticeError::InternalError(format!("Notice set deserialization failed: {}", e))
            })?,
            None => {
                info!("No stored notice set under '{}', starting empty", NOTICES_STORAGE_KEY);
                VecDeque::new()
            }
        };

        let mut notices = self.notices_write()?;
        *notices = records;
        Ok(())
    }

    async fn complete_cycle(&self, kind: CycleKind) -> Result<(), NoticeError> {
        match kind {
            CycleKind::BackgroundTask => {
                debug!("Background task cycle, skipping end-of-cycle flush");
                Ok(())
            }
            CycleKind::Interactive => self.persist().await,
        }
    }
}
