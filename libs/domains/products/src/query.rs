//! Listing options, product predicates and page arithmetic.
//!
//! The controller turns raw query pairs into [`ListParams`]; the service turns
//! those into a [`ProductQuery`] plus [`PageOptions`]; each DAO renders the
//! query for its own store (a BSON filter, or [`ProductQuery::matches`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{ProductError, ProductResult};
use crate::models::Product;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Mongo sort order: 1 ascending, -1 descending
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    CreatedAt,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Price => "price",
            SortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub limit: u32,
    pub page: u32,
    pub sort: Option<SortSpec>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
            sort: None,
        }
    }
}

impl PageOptions {
    /// Number of documents before the requested page
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Listing parameters lifted out of the raw query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub options: PageOptions,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    /// Every other non-empty pair, kept verbatim for the service to cast
    pub filters: BTreeMap<String, String>,
}

impl ListParams {
    /// `limit` falls back to [`DEFAULT_LIMIT`] when absent or unparsable and is
    /// clamped to `1..=MAX_LIMIT`; `page` falls back to 1. `sort` only knows
    /// `asc`/`desc` and always applies to price.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = Self::default();

        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                "limit" => {
                    params.options.limit = value
                        .parse::<u32>()
                        .map_or(DEFAULT_LIMIT, |limit| limit.clamp(1, MAX_LIMIT));
                }
                "page" => params.options.page = value.parse::<u32>().map_or(1, |page| page.max(1)),
                "sort" => {
                    params.options.sort = value
                        .parse::<SortDirection>()
                        .ok()
                        .map(|direction| SortSpec::new(SortField::Price, direction));
                }
                "category" => params.category = Some(value.to_string()),
                "minPrice" => params.min_price = Some(value.to_string()),
                "maxPrice" => params.max_price = Some(value.to_string()),
                _ => {
                    params.filters.insert(key.clone(), value.to_string());
                }
            }
        }

        params
    }
}

/// Inclusive price bounds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// A filter value cast to the type of the product field it targets
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FilterValue {
    /// `price` is a number, `stock` an integer, `status` a boolean; anything
    /// else is compared as a string.
    pub fn cast(field: &str, raw: &str) -> ProductResult<Self> {
        let invalid = |kind: &str| {
            ProductError::Validation(format!("Filter '{}' must be {}, got '{}'", field, kind, raw))
        };

        match field {
            "price" => raw
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite())
                .map(FilterValue::Float)
                .ok_or_else(|| invalid("a number")),
            "stock" => raw
                .parse::<i64>()
                .map(FilterValue::Int)
                .map_err(|_| invalid("an integer")),
            "status" => match raw {
                "true" => Ok(FilterValue::Bool(true)),
                "false" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid("true or false")),
            },
            _ => Ok(FilterValue::Text(raw.to_string())),
        }
    }

    fn matches_field(&self, product: &Product, field: &str) -> bool {
        match self {
            FilterValue::Text(text) => match field {
                "title" => &product.title == text,
                "description" => &product.description == text,
                "code" => &product.code == text,
                "category_id" => &product.category_id == text,
                "supplier_id" => &product.supplier_id == text,
                "thumbnail" => product.thumbnail.as_ref() == Some(text),
                _ => false,
            },
            FilterValue::Float(value) => field == "price" && product.price == *value,
            FilterValue::Int(value) => field == "stock" && i64::from(product.stock) == *value,
            FilterValue::Bool(value) => field == "status" && product.status == *value,
        }
    }
}

/// Predicate over products, rendered by each DAO for its store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub status: Option<bool>,
    pub category_id: Option<String>,
    pub title: Option<String>,
    pub price: Option<PriceRange>,
    /// Case-insensitive literal substring over title and description
    pub text: Option<String>,
    /// Exact matches on other fields
    pub fields: BTreeMap<String, FilterValue>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self) -> Self {
        self.status = Some(true);
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Replaces any exact `price` filter
    pub fn with_price_range(mut self, range: PriceRange) -> Self {
        self.fields.remove("price");
        self.price = Some(range);
        self
    }

    /// Adds an exact-match filter. Operator-like keys (`$...`, dotted paths)
    /// are dropped; `status`, `category_id` and `title` land in their own slots.
    pub fn with_field(mut self, field: &str, value: FilterValue) -> Self {
        if field.starts_with('$') || field.contains('.') {
            tracing::debug!(field, "Dropping operator-like filter key");
            return self;
        }

        match (field, value) {
            ("status", FilterValue::Bool(status)) => self.status = Some(status),
            ("category_id", FilterValue::Text(category)) => self.category_id = Some(category),
            ("title", FilterValue::Text(title)) => self.title = Some(title),
            ("price", _) if self.price.is_some() => {}
            (field, value) => {
                self.fields.insert(field.to_string(), value);
            }
        }
        self
    }

    /// In-process evaluation with the same semantics as the Mongo filter
    pub fn matches(&self, product: &Product) -> bool {
        if self.status.is_some_and(|status| product.status != status) {
            return false;
        }
        if self
            .category_id
            .as_ref()
            .is_some_and(|category| &product.category_id != category)
        {
            return false;
        }
        if self.title.as_ref().is_some_and(|title| &product.title != title) {
            return false;
        }
        if self.price.is_some_and(|range| !range.contains(product.price)) {
            return false;
        }
        if let Some(ref text) = self.text {
            let needle = text.to_lowercase();
            if !product.title.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        self.fields
            .iter()
            .all(|(field, value)| value.matches_field(product, field))
    }
}

/// One page of results with paginate-style metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub payload: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    /// Never less than 1, even for an empty result
    pub total_pages: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    pub fn new(payload: Vec<T>, total_docs: u64, options: &PageOptions) -> Self {
        let limit = options.limit.max(1);
        let pages = total_docs.div_ceil(u64::from(limit)).max(1);
        let total_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let page = options.page.max(1);

        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;

        Self {
            payload,
            total_docs,
            limit,
            page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            payload: self.payload.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            has_prev_page: self.has_prev_page,
            has_next_page: self.has_next_page,
            prev_page: self.prev_page,
            next_page: self.next_page,
        }
    }
}

/// `{base}?page={page}` followed by every original pair except `page`.
pub fn page_url(base: &str, pairs: &[(String, String)], page: u32) -> String {
    let mut url = format!("{}?page={}", base, page);
    for (key, value) in pairs.iter().filter(|(key, _)| key != "page") {
        url.push('&');
        url.push_str(&urlencoding::encode(key));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProduct;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn product(title: &str, price: f64) -> Product {
        Product::new(
            NewProduct {
                title: title.into(),
                description: "Cotton shirt".into(),
                price,
                stock: 4,
                code: "C1".into(),
                category_id: "cat".into(),
                supplier_id: "sup".into(),
            },
            None,
        )
    }

    #[test]
    fn test_defaults() {
        let params = ListParams::from_pairs(&[]);
        assert_eq!(params.options, PageOptions::default());
        assert!(params.filters.is_empty());
    }

    #[test]
    fn test_limit_and_page_bounds() {
        let params = ListParams::from_pairs(&pairs(&[("limit", "500"), ("page", "0")]));
        assert_eq!(params.options.limit, MAX_LIMIT);
        assert_eq!(params.options.page, 1);

        let params = ListParams::from_pairs(&pairs(&[("limit", "abc"), ("page", "-3")]));
        assert_eq!(params.options.limit, DEFAULT_LIMIT);
        assert_eq!(params.options.page, 1);

        let params = ListParams::from_pairs(&pairs(&[("limit", "0")]));
        assert_eq!(params.options.limit, 1);
    }

    #[test]
    fn test_sort_token() {
        let params = ListParams::from_pairs(&pairs(&[("sort", "DESC")]));
        assert_eq!(
            params.options.sort,
            Some(SortSpec::new(SortField::Price, SortDirection::Desc))
        );

        let params = ListParams::from_pairs(&pairs(&[("sort", "newest")]));
        assert_eq!(params.options.sort, None);
    }

    #[test]
    fn test_extra_filters_are_kept() {
        let params = ListParams::from_pairs(&pairs(&[
            ("category", "shoes"),
            ("minPrice", "10"),
            ("code", "A1"),
            ("supplier_id", ""),
        ]));

        assert_eq!(params.category.as_deref(), Some("shoes"));
        assert_eq!(params.min_price.as_deref(), Some("10"));
        assert_eq!(params.filters.len(), 1);
        assert_eq!(params.filters["code"], "A1");
    }

    #[test]
    fn test_cast_by_field_type() {
        assert_eq!(FilterValue::cast("price", "9.5").unwrap(), FilterValue::Float(9.5));
        assert_eq!(FilterValue::cast("stock", "3").unwrap(), FilterValue::Int(3));
        assert_eq!(FilterValue::cast("status", "false").unwrap(), FilterValue::Bool(false));
        assert_eq!(
            FilterValue::cast("code", "12").unwrap(),
            FilterValue::Text("12".into())
        );
        assert!(matches!(
            FilterValue::cast("stock", "many"),
            Err(ProductError::Validation(_))
        ));
    }

    #[test]
    fn test_operator_keys_dropped() {
        let query = ProductQuery::new()
            .with_field("$where", FilterValue::Text("1".into()))
            .with_field("meta.x", FilterValue::Text("1".into()));
        assert_eq!(query, ProductQuery::new());
    }

    #[test]
    fn test_range_replaces_exact_price() {
        let query = ProductQuery::new()
            .with_field("price", FilterValue::Float(5.0))
            .with_price_range(PriceRange {
                min: Some(1.0),
                max: None,
            })
            .with_field("price", FilterValue::Float(7.0));

        assert!(query.fields.is_empty());
        assert!(query.price.is_some());
    }

    #[test]
    fn test_matches() {
        let shirt = product("Blue Shirt", 20.0);
        let query = ProductQuery::new()
            .active()
            .with_text("SHIRT")
            .with_price_range(PriceRange {
                min: Some(10.0),
                max: Some(50.0),
            });
        assert!(query.matches(&shirt));

        let mut hidden = shirt.clone();
        hidden.status = false;
        assert!(!query.matches(&hidden));

        assert!(!query.matches(&product("Blue Shirt", 60.0)));
        assert!(ProductQuery::new().with_text("cotton").matches(&shirt));
        assert!(!ProductQuery::new()
            .with_field("stock", FilterValue::Int(5))
            .matches(&shirt));
    }

    #[test]
    fn test_page_arithmetic() {
        let options = PageOptions {
            limit: 10,
            page: 2,
            sort: None,
        };
        let page = Page::new(vec![1, 2, 3], 23, &options);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev_page && page.has_next_page);
        assert_eq!(page.prev_page, Some(1));
        assert_eq!(page.next_page, Some(3));
    }

    #[test]
    fn test_empty_page_has_one_page() {
        let page = Page::<u8>::new(vec![], 0, &PageOptions::default());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_prev_page && !page.has_next_page);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_skip() {
        let options = PageOptions {
            limit: 15,
            page: 3,
            sort: None,
        };
        assert_eq!(options.skip(), 30);
    }

    #[test]
    fn test_page_url_echoes_query() {
        let url = page_url(
            "http://localhost:8080/api/products/all",
            &pairs(&[("page", "1"), ("limit", "5"), ("category", "home & garden")]),
            2,
        );
        assert_eq!(
            url,
            "http://localhost:8080/api/products/all?page=2&limit=5&category=home%20%26%20garden"
        );
    }
}
