use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Fields a product must carry to be created, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "title",
    "description",
    "price",
    "code",
    "stock",
    "category_id",
    "supplier_id",
];

/// Product entity - represents a product stored in MongoDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (stored as _id in MongoDB)
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Unique display title
    pub title: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    /// Merchant-facing product code
    pub code: String,
    /// Reference into the categories collection
    pub category_id: String,
    pub supplier_id: String,
    /// Active flag; false once soft-deleted or out of stock
    pub status: bool,
    /// Public path of the stored thumbnail image
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(with = "bson_date")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_date")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "bson_date::option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create a new active product from validated input
    pub fn new(input: NewProduct, thumbnail: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: input.title,
            description: input.description,
            price: input.price,
            stock: input.stock,
            code: input.code,
            category_id: input.category_id,
            supplier_id: input.supplier_id,
            status: true,
            thumbnail,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Apply the fields present in `patch`, leaving the rest untouched
    pub fn apply_patch(&mut self, patch: &ProductPatch) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(ref code) = patch.code {
            self.code = code.clone();
        }
        if let Some(ref category_id) = patch.category_id {
            self.category_id = category_id.clone();
        }
        if let Some(ref supplier_id) = patch.supplier_id {
            self.supplier_id = supplier_id.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref thumbnail) = patch.thumbnail {
            self.thumbnail = Some(thumbnail.clone());
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
        if let Some(deleted_at) = patch.deleted_at {
            self.deleted_at = Some(deleted_at);
        }
    }
}

/// Shaped view of a product returned to callers; timestamps stay internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductDto {
    pub id: Uuid,
    #[schema(example = "Walnut desk")]
    pub title: String,
    pub description: String,
    #[schema(example = 249.9)]
    pub price: f64,
    pub stock: i32,
    pub code: String,
    pub category_id: String,
    pub supplier_id: String,
    pub status: bool,
    pub thumbnail: Option<String>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            title: product.title,
            description: product.description,
            price: product.price,
            stock: product.stock,
            code: product.code,
            category_id: product.category_id,
            supplier_id: product.supplier_id,
            status: product.status,
            thumbnail: product.thumbnail,
        }
    }
}

/// Create payload as sent by clients.
///
/// Every field is optional at the type level so the service can report all
/// missing fields at once. Numbers may arrive as strings (form posts).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i32")]
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 64))]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 128))]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 128))]
    pub supplier_id: Option<String>,
}

impl CreateProduct {
    /// Required fields that are absent or empty, in [`REQUIRED_FIELDS`] order
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            filled(&self.title),
            filled(&self.description),
            self.price.is_some(),
            filled(&self.code),
            self.stock.is_some(),
            filled(&self.category_id),
            filled(&self.supplier_id),
        ];

        REQUIRED_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(field, _)| *field)
            .collect()
    }

    /// Take the required fields, or `None` if any is missing
    pub fn into_new(self) -> Option<NewProduct> {
        Some(NewProduct {
            title: self.title?,
            description: self.description?,
            price: self.price?,
            stock: self.stock?,
            code: self.code?,
            category_id: self.category_id?,
            supplier_id: self.supplier_id?,
        })
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Create input with every required field present
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub code: String,
    pub category_id: String,
    pub supplier_id: String,
}

/// Partial update payload. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i32")]
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 64))]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 128))]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 128))]
    pub supplier_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub status: Option<bool>,
    #[serde(default, deserialize_with = "lenient::string")]
    #[validate(length(max = 2048))]
    pub thumbnail: Option<String>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Field changes handed to the store, serialized as a `$set` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "bson_date::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "bson_date::option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<UpdateProduct> for ProductPatch {
    fn from(input: UpdateProduct) -> Self {
        Self {
            title: input.title,
            description: input.description,
            price: input.price,
            stock: input.stock,
            code: input.code,
            category_id: input.category_id,
            supplier_id: input.supplier_id,
            status: input.status,
            thumbnail: input.thumbnail,
            updated_at: None,
            deleted_at: None,
        }
    }
}

/// An uploaded file as received from a multipart form
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Response envelope for lookups and mutations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = "Product created")]
    pub status: String,
    pub payload: T,
}

impl<T> ApiResponse<T> {
    pub fn new(status: impl Into<String>, payload: T) -> Self {
        Self {
            status: status.into(),
            payload,
        }
    }
}

/// Timestamps stored as native BSON dates (millisecond precision) so the
/// store orders them chronologically.
pub(crate) mod bson_date {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::de::{Deserializer, Error};
    use serde::{Deserialize, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        bson::DateTime::from_millis(value.timestamp_millis()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let millis = bson::DateTime::deserialize(d)?.timestamp_millis();
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", millis)))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            value
                .map(|dt| bson::DateTime::from_millis(dt.timestamp_millis()))
                .serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<bson::DateTime>::deserialize(d)? {
                None => Ok(None),
                Some(dt) => DateTime::from_timestamp_millis(dt.timestamp_millis())
                    .map(Some)
                    .ok_or_else(|| D::Error::custom("timestamp out of range")),
            }
        }
    }
}

/// Deserializers that accept JSON scalars of any kind, so form fields
/// ("12.5", "true") and JSON values (12.5, true) land in the same field.
pub(crate) mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Raw>::deserialize(d)?.map(|raw| match raw {
            Raw::Text(s) => s,
            Raw::Int(i) => i.to_string(),
            Raw::Float(f) => f.to_string(),
            Raw::Bool(b) => b.to_string(),
        }))
    }

    pub fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Int(i)) => Ok(Some(i as f64)),
            Some(Raw::Float(f)) => Ok(Some(f)),
            Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(Raw::Text(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid number: {}", s))),
            Some(Raw::Bool(_)) => Err(D::Error::custom("expected a number, found a boolean")),
        }
    }

    pub fn i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        let whole = |f: f64| (f.fract() == 0.0).then_some(f as i64);
        let value = match Option::<Raw>::deserialize(d)? {
            None => return Ok(None),
            Some(Raw::Int(i)) => Some(i),
            Some(Raw::Float(f)) => whole(f),
            Some(Raw::Text(s)) if s.trim().is_empty() => return Ok(None),
            Some(Raw::Text(s)) => s.trim().parse::<f64>().ok().and_then(whole),
            Some(Raw::Bool(_)) => None,
        };

        value
            .and_then(|i| i32::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a whole number"))
    }

    pub fn bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Bool(b)) => Ok(Some(b)),
            Some(Raw::Int(0)) => Ok(Some(false)),
            Some(Raw::Int(1)) => Ok(Some(true)),
            Some(Raw::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(D::Error::custom(format!("invalid boolean: {}", s))),
            },
            Some(_) => Err(D::Error::custom("expected a boolean")),
        }
    }
}
