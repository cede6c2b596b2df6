use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProductResult;
use crate::models::{Product, ProductPatch};
use crate::query::{Page, PageOptions, ProductQuery};

/// Data access for the products collection.
///
/// Implementations only persist; invariants live in the service. A store-level
/// uniqueness violation on `title` must surface as
/// [`ProductError::DuplicateTitle`](crate::ProductError::DuplicateTitle).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductDao: Send + Sync {
    /// Filtered, sorted, paginated find
    async fn paginate(&self, query: ProductQuery, options: PageOptions)
        -> ProductResult<Page<Product>>;

    async fn find_one(&self, query: ProductQuery) -> ProductResult<Option<Product>>;

    /// All matches in natural order, optionally capped
    async fn find(&self, query: ProductQuery, limit: Option<i64>) -> ProductResult<Vec<Product>>;

    async fn find_by_id(&self, id: Uuid) -> ProductResult<Option<Product>>;

    async fn insert_one(&self, product: Product) -> ProductResult<Product>;

    /// All-or-nothing from the caller's view: on error nothing is reported inserted
    async fn insert_many(&self, products: Vec<Product>) -> ProductResult<Vec<Product>>;

    /// Apply `patch` and return the record after the update
    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> ProductResult<Option<Product>>;

    /// Remove and return the record
    async fn find_by_id_and_delete(&self, id: Uuid) -> ProductResult<Option<Product>>;
}
