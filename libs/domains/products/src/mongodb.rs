//! MongoDB implementations of ProductDao and CategoryLookup

use std::sync::LazyLock;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, to_document, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use regex::Regex;
use tracing::instrument;
use uuid::Uuid;

use crate::category::CategoryLookup;
use crate::dao::ProductDao;
use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductPatch};
use crate::query::{FilterValue, Page, PageOptions, ProductQuery};

const DUPLICATE_KEY: i32 = 11000;

static DUP_TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"title: "((?:[^"\\]|\\.)*)""#).ok());

/// MongoDB implementation of the ProductDao
pub struct MongoProductDao {
    collection: Collection<Product>,
}

impl MongoProductDao {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, "products")
    }

    /// Use a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        let collection = db.collection::<Product>(collection_name);
        Self { collection }
    }

    /// Create the title uniqueness index and the listing indexes
    pub async fn init_indexes(&self) -> ProductResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "title": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_title_unique".to_string())
                        .build(),
                )
                .build(),
            // Category listing and the default status filter
            IndexModel::builder()
                .keys(doc! { "category_id": 1, "status": 1, "created_at": -1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_category_status".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "status": 1, "price": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_status_price".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("Product indexes created successfully");
        Ok(())
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Product> {
        &self.collection
    }

    /// Render a ProductQuery as a MongoDB filter document
    pub(crate) fn build_filter(query: &ProductQuery) -> Document {
        let mut filter = doc! {};

        for (field, value) in &query.fields {
            filter.insert(field.as_str(), filter_value(value));
        }

        if let Some(status) = query.status {
            filter.insert("status", status);
        }

        if let Some(ref category_id) = query.category_id {
            filter.insert("category_id", category_id.as_str());
        }

        if let Some(ref title) = query.title {
            filter.insert("title", title.as_str());
        }

        if let Some(range) = query.price {
            let mut price = doc! {};
            if let Some(min) = range.min {
                price.insert("$gte", min);
            }
            if let Some(max) = range.max {
                price.insert("$lte", max);
            }
            if !price.is_empty() {
                filter.insert("price", price);
            }
        }

        if let Some(ref text) = query.text {
            let pattern = regex::escape(text);
            filter.insert(
                "$or",
                vec![
                    doc! { "title": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "description": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }

        filter
    }

    fn sort_document(options: &PageOptions) -> Option<Document> {
        options.sort.map(|sort| {
            let mut document = Document::new();
            document.insert(sort.field.as_str(), sort.direction.as_i32());
            document
        })
    }

    async fn collect(&self, filter: Document, options: FindOptions) -> ProductResult<Vec<Product>> {
        let cursor = self.collection.find(filter).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Delete whatever part of `batch` an interrupted insert_many wrote.
    ///
    /// Every id in the batch is freshly generated, so matching on all of them
    /// only ever touches documents from this batch.
    async fn rollback(&self, batch: &[Product]) {
        let ids = match batch
            .iter()
            .map(|product| to_bson(&product.id))
            .collect::<Result<Vec<Bson>, _>>()
        {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode batch ids for rollback");
                return;
            }
        };

        match self
            .collection
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
        {
            Ok(result) => tracing::warn!(
                batch = batch.len(),
                deleted = result.deleted_count,
                "Rolled back partial batch insert"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to roll back partial batch insert"),
        }
    }
}

fn filter_value(value: &FilterValue) -> Bson {
    match value {
        FilterValue::Text(text) => Bson::String(text.clone()),
        FilterValue::Int(int) => Bson::Int64(*int),
        FilterValue::Float(float) => Bson::Double(*float),
        FilterValue::Bool(flag) => Bson::Boolean(*flag),
    }
}

fn id_filter(id: Uuid) -> ProductResult<Document> {
    let id = to_bson(&id).map_err(|e| ProductError::Internal(e.to_string()))?;
    Ok(doc! { "_id": id })
}

/// True for E11000 duplicate key failures, however the driver wraps them
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    let by_code = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|w| w.code == DUPLICATE_KEY)),
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    };
    by_code || err.to_string().contains("E11000")
}

/// Title named in a duplicate key message, if the driver included it
fn duplicate_title(err: &mongodb::error::Error) -> Option<String> {
    let message = err.to_string();
    DUP_TITLE
        .as_ref()?
        .captures(&message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("\\\"", "\""))
}

#[async_trait]
impl ProductDao for MongoProductDao {
    #[instrument(skip(self))]
    async fn paginate(
        &self,
        query: ProductQuery,
        options: PageOptions,
    ) -> ProductResult<Page<Product>> {
        let filter = Self::build_filter(&query);
        let total = self.collection.count_documents(filter.clone()).await?;

        let find_options = FindOptions::builder()
            .limit(i64::from(options.limit))
            .skip(options.skip())
            .sort(Self::sort_document(&options))
            .build();

        let products = self.collect(filter, find_options).await?;
        Ok(Page::new(products, total, &options))
    }

    #[instrument(skip(self))]
    async fn find_one(&self, query: ProductQuery) -> ProductResult<Option<Product>> {
        let filter = Self::build_filter(&query);
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self))]
    async fn find(&self, query: ProductQuery, limit: Option<i64>) -> ProductResult<Vec<Product>> {
        let filter = Self::build_filter(&query);
        let options = FindOptions::builder().limit(limit).build();
        self.collect(filter, options).await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        Ok(self.collection.find_one(id_filter(id)?).await?)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id, title = %product.title))]
    async fn insert_one(&self, product: Product) -> ProductResult<Product> {
        match self.collection.insert_one(&product).await {
            Ok(_) => {
                tracing::info!("Product created successfully");
                Ok(product)
            }
            Err(e) if is_duplicate_key(&e) => Err(ProductError::DuplicateTitle(product.title)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, products), fields(count = products.len()))]
    async fn insert_many(&self, products: Vec<Product>) -> ProductResult<Vec<Product>> {
        if products.is_empty() {
            return Ok(products);
        }

        match self.collection.insert_many(&products).await {
            Ok(result) => {
                tracing::info!(inserted = result.inserted_ids.len(), "Products inserted");
                Ok(products)
            }
            Err(e) => {
                self.rollback(&products).await;
                if is_duplicate_key(&e) {
                    let title = duplicate_title(&e).unwrap_or_else(|| "unknown".to_string());
                    return Err(ProductError::DuplicateTitle(title));
                }
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, patch))]
    async fn find_by_id_and_update(
        &self,
        id: Uuid,
        patch: ProductPatch,
    ) -> ProductResult<Option<Product>> {
        let set = to_document(&patch).map_err(|e| ProductError::Internal(e.to_string()))?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .collection
            .find_one_and_update(id_filter(id)?, doc! { "$set": set })
            .with_options(options)
            .await;

        match result {
            Ok(updated) => {
                if updated.is_some() {
                    tracing::info!(product_id = %id, "Product updated successfully");
                }
                Ok(updated)
            }
            Err(e) if is_duplicate_key(&e) => Err(ProductError::DuplicateTitle(
                patch
                    .title
                    .or_else(|| duplicate_title(&e))
                    .unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id_and_delete(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let deleted = self
            .collection
            .find_one_and_delete(id_filter(id)?)
            .await?;
        if deleted.is_some() {
            tracing::info!(product_id = %id, "Product deleted successfully");
        }
        Ok(deleted)
    }
}

/// Category existence check against the `categories` collection.
///
/// Category ids may be stored as ObjectIds or plain strings; both are tried.
pub struct MongoCategoryLookup {
    collection: Collection<Document>,
}

impl MongoCategoryLookup {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Document>("categories"),
        }
    }

    fn id_filter(category_id: &str) -> Document {
        match ObjectId::parse_str(category_id) {
            Ok(oid) => doc! { "_id": { "$in": [Bson::ObjectId(oid), category_id] } },
            Err(_) => doc! { "_id": category_id },
        }
    }
}

#[async_trait]
impl CategoryLookup for MongoCategoryLookup {
    #[instrument(skip(self))]
    async fn exists(&self, category_id: &str) -> ProductResult<bool> {
        let count = self
            .collection
            .count_documents(Self::id_filter(category_id))
            .limit(1)
            .await?;
        Ok(count > 0)
    }
}
