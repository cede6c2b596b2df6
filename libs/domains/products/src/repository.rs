use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::dao::ProductDao;
use crate::error::ProductResult;
use crate::models::{Product, ProductPatch};
use crate::query::{FilterValue, Page, PageOptions, ProductQuery};

/// Most results a search returns
pub const SEARCH_LIMIT: i64 = 15;

/// Repository trait for Product persistence
///
/// Normalizes DAO calls into the operations the service needs. Business
/// rules (validation, uniqueness pre-checks) are not applied here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get_all_products(
        &self,
        query: ProductQuery,
        options: PageOptions,
    ) -> ProductResult<Page<Product>>;

    async fn get_product_by_id(&self, id: Uuid) -> ProductResult<Option<Product>>;

    async fn get_product_by_title(&self, title: &str) -> ProductResult<Option<Product>>;

    async fn get_products_by_category(&self, category_id: &str) -> ProductResult<Vec<Product>>;

    /// Up to `limit` products whose thumbnail is exactly `path`
    async fn get_products_by_thumbnail(&self, path: &str, limit: i64)
        -> ProductResult<Vec<Product>>;

    async fn create_product(&self, product: Product) -> ProductResult<Product>;

    async fn insert_many_products(&self, products: Vec<Product>) -> ProductResult<Vec<Product>>;

    /// Case-insensitive literal match over title and description, capped at [`SEARCH_LIMIT`]
    async fn search_products(&self, term: &str) -> ProductResult<Vec<Product>>;

    /// Apply `patch`, stamping `updated_at`
    async fn update_product(&self, id: Uuid, patch: ProductPatch)
        -> ProductResult<Option<Product>>;

    /// Deactivate and stamp `deleted_at`
    async fn soft_delete_product(&self, id: Uuid) -> ProductResult<Option<Product>>;

    async fn delete_product(&self, id: Uuid) -> ProductResult<Option<Product>>;
}

/// [`ProductRepository`] over any [`ProductDao`]
pub struct ProductStore<D> {
    dao: D,
}

impl<D: ProductDao> ProductStore<D> {
    pub fn new(dao: D) -> Self {
        Self { dao }
    }

    pub fn dao(&self) -> &D {
        &self.dao
    }
}

#[async_trait]
impl<D: ProductDao> ProductRepository for ProductStore<D> {
    async fn get_all_products(
        &self,
        query: ProductQuery,
        options: PageOptions,
    ) -> ProductResult<Page<Product>> {
        self.dao.paginate(query, options).await
    }

    async fn get_product_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        self.dao.find_by_id(id).await
    }

    async fn get_product_by_title(&self, title: &str) -> ProductResult<Option<Product>> {
        self.dao.find_one(ProductQuery::new().with_title(title)).await
    }

    async fn get_products_by_category(&self, category_id: &str) -> ProductResult<Vec<Product>> {
        self.dao
            .find(ProductQuery::new().with_category(category_id), None)
            .await
    }

    async fn get_products_by_thumbnail(
        &self,
        path: &str,
        limit: i64,
    ) -> ProductResult<Vec<Product>> {
        let query =
            ProductQuery::new().with_field("thumbnail", FilterValue::Text(path.to_string()));
        self.dao.find(query, Some(limit)).await
    }

    async fn create_product(&self, product: Product) -> ProductResult<Product> {
        self.dao.insert_one(product).await
    }

    async fn insert_many_products(&self, products: Vec<Product>) -> ProductResult<Vec<Product>> {
        self.dao.insert_many(products).await
    }

    async fn search_products(&self, term: &str) -> ProductResult<Vec<Product>> {
        self.dao
            .find(ProductQuery::new().with_text(term), Some(SEARCH_LIMIT))
            .await
    }

    async fn update_product(
        &self,
        id: Uuid,
        mut patch: ProductPatch,
    ) -> ProductResult<Option<Product>> {
        patch.updated_at = Some(Utc::now());
        self.dao.find_by_id_and_update(id, patch).await
    }

    async fn soft_delete_product(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let now = Utc::now();
        let patch = ProductPatch {
            status: Some(false),
            deleted_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };
        self.dao.find_by_id_and_update(id, patch).await
    }

    async fn delete_product(&self, id: Uuid) -> ProductResult<Option<Product>> {
        self.dao.find_by_id_and_delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::MockProductDao;

    #[tokio::test]
    async fn test_search_is_capped() {
        let mut dao = MockProductDao::new();
        dao.expect_find()
            .withf(|query, limit| query.text.as_deref() == Some("shirt") && *limit == Some(15))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let store = ProductStore::new(dao);
        assert!(store.search_products("shirt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_title_lookup_uses_exact_title() {
        let mut dao = MockProductDao::new();
        dao.expect_find_one()
            .withf(|query| query.title.as_deref() == Some("Desk") && query.status.is_none())
            .returning(|_| Ok(None));

        let store = ProductStore::new(dao);
        assert!(store.get_product_by_title("Desk").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_thumbnail_lookup_matches_exact_path() {
        let mut dao = MockProductDao::new();
        dao.expect_find()
            .withf(|query, limit| {
                query.fields.get("thumbnail")
                    == Some(&FilterValue::Text("/uploads/a.png".to_string()))
                    && query.status.is_none()
                    && *limit == Some(2)
            })
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let store = ProductStore::new(dao);
        let found = store
            .get_products_by_thumbnail("/uploads/a.png", 2)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let id = Uuid::now_v7();
        let mut dao = MockProductDao::new();
        dao.expect_find_by_id_and_update()
            .withf(move |pid, patch| {
                *pid == id && patch.updated_at.is_some() && patch.deleted_at.is_none()
            })
            .returning(|_, _| Ok(None));

        let store = ProductStore::new(dao);
        store
            .update_product(id, ProductPatch::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_soft_delete_patch() {
        let mut dao = MockProductDao::new();
        dao.expect_find_by_id_and_update()
            .withf(|_, patch| {
                patch.status == Some(false)
                    && patch.deleted_at.is_some()
                    && patch.title.is_none()
                    && patch.stock.is_none()
            })
            .returning(|_, _| Ok(None));

        let store = ProductStore::new(dao);
        store.soft_delete_product(Uuid::now_v7()).await.unwrap();
    }
}
