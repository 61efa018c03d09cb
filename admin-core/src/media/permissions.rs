use async_trait::async_trait;

/// Action required to upload media
pub const MEDIA_UPLOAD: &str = "media.upload";
/// Action required to delete media
pub const MEDIA_DELETE: &str = "media.delete";

/// Authorization consulted before mutating the media library
#[async_trait]
pub trait MediaPermissions: Send + Sync {
    async fn allows(&self, action_key: &str) -> bool;
}

/// Grants everything; for tools running without a signed-in actor
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl MediaPermissions for AllowAll {
    async fn allows(&self, _action_key: &str) -> bool {
        true
    }
}
