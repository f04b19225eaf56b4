//! Export permission hook

use crate::domain::{ToolId, UserId};
use async_trait::async_trait;

/// Decides whether a user may export a tool
#[async_trait]
pub trait PermissionHook: Send + Sync {
    async fn can_export(&self, user_id: &UserId, tool_id: &ToolId) -> bool;
}

/// Allows any export where both ids are present
///
/// Real authorization lives outside this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyIdsPermission;

#[async_trait]
impl PermissionHook for NonEmptyIdsPermission {
    async fn can_export(&self, user_id: &UserId, tool_id: &ToolId) -> bool {
        !user_id.is_blank() && !tool_id.is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn allowed(user: &str, tool: &str) -> bool {
        NonEmptyIdsPermission
            .can_export(&UserId::new(user), &ToolId::new(tool))
            .await
    }

    #[tokio::test]
    async fn test_non_empty_ids() {
        assert!(allowed("alice", "contact-form").await);
        assert!(!allowed("", "contact-form").await);
        assert!(!allowed("alice", "   ").await);
    }
}
