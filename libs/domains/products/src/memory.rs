//! In-memory implementations (for development/testing)

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::category::CategoryLookup;
use crate::dao::ProductDao;
use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductPatch};
use crate::query::{Page, PageOptions, ProductQuery, SortDirection, SortField};

/// In-memory implementation of ProductDao.
///
/// Keeps insertion order as natural order and enforces title uniqueness like
/// the unique index does.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductDao {
    products: Arc<RwLock<Vec<Product>>>,
}

impl InMemoryProductDao {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

fn title_taken(products: &[Product], title: &str, except: Option<Uuid>) -> bool {
    products
        .iter()
        .any(|p| p.title == title && Some(p.id) != except)
}

#[async_trait]
impl ProductDao for InMemoryProductDao {
    async fn paginate(
        &self,
        query: ProductQuery,
        options: PageOptions,
    ) -> ProductResult<Page<Product>> {
        let products = self.products.read().await;
        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();

        if let Some(sort) = options.sort {
            matched.sort_by(|a, b| {
                let ordering = match sort.field {
                    SortField::Price => a.price.total_cmp(&b.price),
                    SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                };
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len() as u64;
        let payload = matched
            .into_iter()
            .skip(usize::try_from(options.skip()).unwrap_or(usize::MAX))
            .take(options.limit as usize)
            .collect();

        Ok(Page::new(payload, total, &options))
    }

    async fn find_one(&self, query: ProductQuery) -> ProductResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| query.matches(p)).cloned())
    }

    async fn find(&self, query: ProductQuery, limit: Option<i64>) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;
        let cap = limit
            .and_then(|l| usize::try_from(l).ok())
            .filter(|l| *l > 0)
            .unwrap_or(usize::MAX);

        Ok(products
            .iter()
            .filter(|p| query.matches(p))
            .take(cap)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_one(&self, product: Product) -> ProductResult<Product> {
        let mut products = self.products.write().await;

        if title_taken(&products, &product.title, None) {
            return Err(ProductError::DuplicateTitle(product.title));
        }

        products.push(product.clone());
        tracing::info!(product_id = %product.id, "Created product");
        Ok(product)
    }

    async fn insert_many(&self, batch: Vec<Product>) -> ProductResult<Vec<Product>> {
        let mut products = self.products.write().await;

        let mut seen = HashSet::new();
        for product in &batch {
            if title_taken(&products, &product.title, None) || !seen.insert(product.title.as_str()) {
                return Err(ProductError::DuplicateTitle(product.title.clone()));
            }
        }

        products.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> ProductResult<Option<Product>> {
        let mut products = self.products.write().await;

        if let Some(ref title) = patch.title {
            if title_taken(&products, title, Some(id)) {
                return Err(ProductError::DuplicateTitle(title.clone()));
            }
        }

        Ok(products.iter_mut().find(|p| p.id == id).map(|product| {
            product.apply_patch(&patch);
            product.clone()
        }))
    }

    async fn find_by_id_and_delete(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let mut products = self.products.write().await;
        let position = products.iter().position(|p| p.id == id);
        Ok(position.map(|index| products.remove(index)))
    }
}

/// Fixed set of known category ids
#[derive(Debug, Default, Clone)]
pub struct InMemoryCategoryLookup {
    categories: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryCategoryLookup {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: Arc::new(RwLock::new(
                categories.into_iter().map(Into::into).collect(),
            )),
        }
    }

    pub async fn add(&self, category_id: impl Into<String>) {
        self.categories.write().await.insert(category_id.into());
    }
}

#[async_trait]
impl CategoryLookup for InMemoryCategoryLookup {
    async fn exists(&self, category_id: &str) -> ProductResult<bool> {
        Ok(self.categories.read().await.contains(category_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProduct;
    use crate::query::SortSpec;

    fn product(title: &str, price: f64) -> Product {
        Product::new(
            NewProduct {
                title: title.into(),
                description: "desc".into(),
                price,
                stock: 1,
                code: "c".into(),
                category_id: "cat".into(),
                supplier_id: "sup".into(),
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let dao = InMemoryProductDao::new();
        let created = dao.insert_one(product("Lamp", 10.0)).await.unwrap();

        let fetched = dao.find_by_id(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_title_error() {
        let dao = InMemoryProductDao::new();
        dao.insert_one(product("Lamp", 10.0)).await.unwrap();

        let result = dao.insert_one(product("Lamp", 12.0)).await;
        assert!(matches!(result, Err(ProductError::DuplicateTitle(t)) if t == "Lamp"));
    }

    #[tokio::test]
    async fn test_insert_many_is_atomic() {
        let dao = InMemoryProductDao::new();
        dao.insert_one(product("Chair", 10.0)).await.unwrap();

        let result = dao
            .insert_many(vec![product("Desk", 1.0), product("Chair", 2.0)])
            .await;
        assert!(result.is_err());
        assert_eq!(dao.len().await, 1);
    }

    #[tokio::test]
    async fn test_paginate_sorts_by_price() {
        let dao = InMemoryProductDao::new();
        for (title, price) in [("a", 30.0), ("b", 10.0), ("c", 20.0)] {
            dao.insert_one(product(title, price)).await.unwrap();
        }

        let options = PageOptions {
            limit: 2,
            page: 1,
            sort: Some(SortSpec::new(SortField::Price, SortDirection::Asc)),
        };
        let page = dao.paginate(ProductQuery::new(), options).await.unwrap();

        let prices: Vec<f64> = page.payload.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![10.0, 20.0]);
        assert_eq!(page.total_docs, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let dao = InMemoryProductDao::new();
        let created = dao.insert_one(product("Lamp", 10.0)).await.unwrap();

        let patch = ProductPatch {
            stock: Some(0),
            status: Some(false),
            ..Default::default()
        };
        let updated = dao
            .find_by_id_and_update(created.id, patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.stock, 0);
        assert!(!updated.status);

        let deleted = dao.find_by_id_and_delete(created.id).await.unwrap();
        assert!(deleted.is_some());
        assert!(dao.is_empty().await);
        assert!(dao
            .find_by_id_and_update(created.id, ProductPatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_category_lookup() {
        let lookup = InMemoryCategoryLookup::new(["shoes"]);
        assert!(lookup.exists("shoes").await.unwrap());
        assert!(!lookup.exists("hats").await.unwrap());

        lookup.add("hats").await;
        assert!(lookup.exists("hats").await.unwrap());
    }
}
