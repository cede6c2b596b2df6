//! Product Service - Business logic layer

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::category::CategoryLookup;
use crate::error::{ProductError, ProductResult};
use crate::models::{
    CreateProduct, FileUpload, NewProduct, Product, ProductDto, ProductPatch, UpdateProduct,
};
use crate::query::{
    FilterValue, ListParams, Page, PageOptions, PriceRange, ProductQuery, SortDirection,
    SortField, SortSpec,
};
use crate::repository::ProductRepository;
use crate::uploads::{check_upload, ThumbnailStore};

/// How many products the new arrivals listing shows
pub const NEW_ARRIVALS_LIMIT: u32 = 12;

/// Product service providing business logic operations
///
/// The service is the only write path that enforces product invariants:
/// required fields, positive price and stock, title uniqueness, and
/// `stock == 0` implying an inactive product. Results are shaped as
/// [`ProductDto`]s.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
    categories: Arc<dyn CategoryLookup>,
    thumbnails: Arc<dyn ThumbnailStore>,
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(
        repository: R,
        categories: Arc<dyn CategoryLookup>,
        thumbnails: Arc<dyn ThumbnailStore>,
    ) -> Self {
        Self {
            repository: Arc::new(repository),
            categories,
            thumbnails,
        }
    }

    /// Paginated listing of active products.
    ///
    /// Extra filters are cast by field type; `minPrice`/`maxPrice` become one
    /// inclusive range on `price`. Any caller-supplied `status` is ignored.
    #[instrument(skip(self))]
    pub async fn get_all_products(&self, params: ListParams) -> ProductResult<Page<ProductDto>> {
        let mut query = ProductQuery::new();

        for (field, raw) in &params.filters {
            if field == "status" {
                continue;
            }
            query = query.with_field(field, FilterValue::cast(field, raw)?);
        }

        if let Some(category) = params.category {
            query = query.with_category(category);
        }

        let min = parse_price("minPrice", params.min_price.as_deref())?;
        let max = parse_price("maxPrice", params.max_price.as_deref())?;
        if min.is_some() || max.is_some() {
            query = query.with_price_range(PriceRange { min, max });
        }

        let page = self
            .repository
            .get_all_products(query.active(), params.options)
            .await?;
        Ok(page.map(ProductDto::from))
    }

    /// The most recently created active products
    #[instrument(skip(self))]
    pub async fn get_new_arrivals(&self) -> ProductResult<Vec<ProductDto>> {
        let options = PageOptions {
            limit: NEW_ARRIVALS_LIMIT,
            page: 1,
            sort: Some(SortSpec::new(SortField::CreatedAt, SortDirection::Desc)),
        };

        let page = self
            .repository
            .get_all_products(ProductQuery::new().active(), options)
            .await?;
        Ok(page.payload.into_iter().map(ProductDto::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_id(&self, id: Uuid) -> ProductResult<ProductDto> {
        self.find_existing(id).await.map(ProductDto::from)
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_title(&self, title: &str) -> ProductResult<ProductDto> {
        self.repository
            .get_product_by_title(title)
            .await?
            .map(ProductDto::from)
            .ok_or_else(|| ProductError::TitleNotFound(title.to_string()))
    }

    /// Every product in an existing category
    #[instrument(skip(self))]
    pub async fn get_products_by_category(&self, category_id: &str) -> ProductResult<Vec<ProductDto>> {
        if !self.categories.exists(category_id).await? {
            return Err(ProductError::CategoryNotFound(category_id.to_string()));
        }

        let products = self.repository.get_products_by_category(category_id).await?;
        Ok(products.into_iter().map(ProductDto::from).collect())
    }

    /// Create a product, storing the optional thumbnail first
    #[instrument(skip(self, input, file), fields(title = ?input.title))]
    pub async fn create_product(
        &self,
        input: CreateProduct,
        file: Option<FileUpload>,
    ) -> ProductResult<ProductDto> {
        if let Some(ref file) = file {
            check_upload(file)?;
        }

        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Err(ProductError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        input.validate()?;
        let new = input.into_new().ok_or_else(|| {
            ProductError::Validation("Missing required fields".to_string())
        })?;
        check_new_product(&new)?;

        if self
            .repository
            .get_product_by_title(&new.title)
            .await?
            .is_some()
        {
            return Err(ProductError::DuplicateTitle(new.title));
        }

        let thumbnail = match file {
            Some(file) => Some(self.thumbnails.store(file).await?),
            None => None,
        };

        let product = Product::new(new, thumbnail.clone());
        match self.repository.create_product(product).await {
            Ok(created) => Ok(created.into()),
            Err(e) => {
                if let Some(ref path) = thumbnail {
                    self.discard_thumbnail(path).await;
                }
                Err(e)
            }
        }
    }

    /// Insert a JSON array of products, all or nothing.
    ///
    /// Every element is checked before the store is touched; titles are then
    /// looked up one by one and the first existing title aborts the batch.
    #[instrument(skip(self, batch))]
    pub async fn insert_many_products(&self, batch: Value) -> ProductResult<Vec<ProductDto>> {
        let Value::Array(items) = batch else {
            return Err(ProductError::Validation(
                "Products must be an array".to_string(),
            ));
        };
        if items.is_empty() {
            return Err(ProductError::Validation(
                "Products array must not be empty".to_string(),
            ));
        }

        let inputs = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<CreateProduct>(item).map_err(|e| {
                    ProductError::Validation(format!("Product at index {}: {}", index, e))
                })
            })
            .collect::<ProductResult<Vec<_>>>()?;

        let incomplete: Vec<&str> = inputs
            .iter()
            .filter(|input| !input.missing_fields().is_empty())
            .map(|input| input.title.as_deref().unwrap_or("<untitled>"))
            .collect();
        if !incomplete.is_empty() {
            return Err(ProductError::Validation(format!(
                "Products must include all required fields: {}",
                incomplete.join(", ")
            )));
        }

        let mut products = Vec::with_capacity(inputs.len());
        let mut titles = HashSet::new();
        for input in inputs {
            input.validate()?;
            let new = input.into_new().ok_or_else(|| {
                ProductError::Validation("Missing required fields".to_string())
            })?;
            check_new_product(&new)?;

            if !titles.insert(new.title.clone()) {
                return Err(ProductError::Validation(format!(
                    "Title '{}' appears more than once in the batch",
                    new.title
                )));
            }
            products.push(new);
        }

        for new in &products {
            if self
                .repository
                .get_product_by_title(&new.title)
                .await?
                .is_some()
            {
                return Err(ProductError::DuplicateTitle(new.title.clone()));
            }
        }

        let products = products
            .into_iter()
            .map(|new| Product::new(new, None))
            .collect();
        let inserted = self.repository.insert_many_products(products).await?;

        tracing::info!(count = inserted.len(), "Inserted product batch");
        Ok(inserted.into_iter().map(ProductDto::from).collect())
    }

    /// Partial update. `stock == 0` always deactivates the product.
    #[instrument(skip(self, input, file))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProduct,
        file: Option<FileUpload>,
    ) -> ProductResult<ProductDto> {
        let existing = self.find_existing(id).await?;

        if let Some(ref file) = file {
            check_upload(file)?;
        }
        if input.is_empty() && file.is_none() {
            return Err(ProductError::Validation(
                "No fields provided to update the product".to_string(),
            ));
        }

        input.validate()?;
        for (field, value) in [
            ("title", &input.title),
            ("description", &input.description),
            ("category_id", &input.category_id),
            ("supplier_id", &input.supplier_id),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ProductError::Validation(format!("{} cannot be blank", field)));
            }
        }
        if input.price.is_some_and(|price| price < 0.0 || !price.is_finite()) {
            return Err(ProductError::Validation(
                "Price must be zero or greater".to_string(),
            ));
        }
        if input.stock.is_some_and(|stock| stock < 0) {
            return Err(ProductError::Validation(
                "Stock must be zero or greater; set status to false to deactivate".to_string(),
            ));
        }

        let mut patch = ProductPatch::from(input);
        if patch.stock == Some(0) {
            patch.status = Some(false);
        }

        if let Some(ref title) = patch.title {
            if title != &existing.title
                && self.repository.get_product_by_title(title).await?.is_some()
            {
                return Err(ProductError::DuplicateTitle(title.clone()));
            }
        }

        if let Some(file) = file {
            patch.thumbnail = Some(self.thumbnails.store(file).await?);
        }
        let new_thumbnail = patch.thumbnail.clone();

        let updated = match self.repository.update_product(id, patch).await {
            Ok(Some(updated)) => updated,
            Ok(None) => return Err(ProductError::NotFound(id)),
            Err(e) => {
                if let Some(ref path) = new_thumbnail {
                    self.discard_thumbnail(path).await;
                }
                return Err(e);
            }
        };

        if let (Some(old), Some(_)) = (existing.thumbnail.as_deref(), new_thumbnail.as_deref()) {
            if updated.thumbnail.as_deref() != Some(old) {
                self.release_thumbnail(old, id).await;
            }
        }

        Ok(updated.into())
    }

    /// Deactivate without removing the record
    #[instrument(skip(self))]
    pub async fn soft_delete_product(&self, id: Uuid) -> ProductResult<ProductDto> {
        self.find_existing(id).await?;

        self.repository
            .soft_delete_product(id)
            .await?
            .map(ProductDto::from)
            .ok_or(ProductError::NotFound(id))
    }

    /// Remove the record and its thumbnail
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> ProductResult<ProductDto> {
        self.find_existing(id).await?;

        let deleted = self
            .repository
            .delete_product(id)
            .await?
            .ok_or(ProductError::NotFound(id))?;

        if let Some(ref path) = deleted.thumbnail {
            self.release_thumbnail(path, id).await;
        }
        Ok(deleted.into())
    }

    /// Case-insensitive search over title and description; blank terms match nothing
    #[instrument(skip(self))]
    pub async fn search_products(&self, term: &str) -> ProductResult<Vec<ProductDto>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let products = self.repository.search_products(term).await?;
        Ok(products.into_iter().map(ProductDto::from).collect())
    }

    async fn find_existing(&self, id: Uuid) -> ProductResult<Product> {
        self.repository
            .get_product_by_id(id)
            .await?
            .ok_or(ProductError::NotFound(id))
    }

    /// Remove a thumbnail `owner` no longer uses, unless another product still
    /// points at it. `thumbnail` is client-writable, so paths can be shared.
    async fn release_thumbnail(&self, path: &str, owner: Uuid) {
        match self.repository.get_products_by_thumbnail(path, 2).await {
            Ok(users) if users.iter().any(|product| product.id != owner) => {
                tracing::debug!(path, "Thumbnail still referenced; keeping file");
            }
            Ok(_) => self.discard_thumbnail(path).await,
            Err(e) => tracing::warn!(path, error = %e, "Failed to check thumbnail references"),
        }
    }

    async fn discard_thumbnail(&self, path: &str) {
        if let Err(e) = self.thumbnails.remove(path).await {
            tracing::warn!(path, error = %e, "Failed to remove thumbnail");
        }
    }
}

fn parse_price(name: &str, raw: Option<&str>) -> ProductResult<Option<f64>> {
    raw.map(|raw| {
        raw.parse::<f64>()
            .ok()
            .filter(|price| price.is_finite())
            .ok_or_else(|| {
                ProductError::Validation(format!("{} must be a number, got '{}'", name, raw))
            })
    })
    .transpose()
}

/// Create-time rules on a complete product
fn check_new_product(product: &NewProduct) -> ProductResult<()> {
    for (field, value) in [
        ("title", &product.title),
        ("description", &product.description),
        ("code", &product.code),
    ] {
        if value.trim().is_empty() {
            return Err(ProductError::Validation(format!("{} cannot be blank", field)));
        }
    }
    if product.stock <= 0 {
        return Err(ProductError::Validation(
            "Stock must be greater than 0".to_string(),
        ));
    }
    if !(product.price > 0.0 && product.price.is_finite()) {
        return Err(ProductError::Validation(
            "Price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
