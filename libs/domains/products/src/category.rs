use async_trait::async_trait;

use crate::error::ProductResult;

/// Read-only view of the categories a product may reference
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryLookup: Send + Sync {
    async fn exists(&self, category_id: &str) -> ProductResult<bool>;
}
