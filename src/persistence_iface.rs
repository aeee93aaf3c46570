use async_trait::async_trait;

use crate::errors::StorageError;

/// Durable key-value store the registry persists into.
///
/// The registry is the sole writer of the notice-set record; dismissal
/// flags may be read by other collaborators.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Identity and capability view of the viewer a render pass or dismiss
/// request runs for.
pub trait ViewerIdentity: Send + Sync {
    fn id(&self) -> String;
    fn has_capability(&self, capability: &str) -> bool;
}

/// Issues and verifies anti-forgery tokens for dismiss links. Tokens are
/// bound to a fixed action name; a request presenting a token that does
/// not verify is silently ignored.
pub trait DismissTokenService: Send + Sync {
    fn issue(&self, action: &str) -> String;
    fn verify(&self, token: &str, action: &str) -> bool;
}

/// Resolves template resource identifiers to rendered markup. Returning
/// `None` makes the registry fall back to using the identifier text as
/// literal content.
pub trait TemplateProvider: Send + Sync {
    fn render(&self, resource_id: &str) -> Option<String>;
}

/// Sink the composed notice markup is appended to, in registration order.
pub trait RenderSink: Send + Sync {
    fn append(&mut self, markup: &str);
}
