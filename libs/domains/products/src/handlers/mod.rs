//! HTTP handlers for Products API

pub mod form;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, OriginalUri, Path, Query, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestUuidResponse, BadRequestValidationResponse, DuplicateResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
    UuidPath,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::error::ProductResult;
use crate::models::{ApiResponse, CreateProduct, ProductDto, UpdateProduct};
use crate::query::{page_url, ListParams, Page};
use crate::repository::ProductRepository;
use crate::service::ProductService;
use form::ProductForm;

/// Request bodies above this size are rejected before reaching a handler
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_products,
        new_arrivals,
        search_products,
        get_by_title,
        get_by_category,
        get_product,
        create_product,
        insert_many,
        update_product,
        soft_delete_product,
        delete_product,
    ),
    components(
        schemas(ProductDto, CreateProduct, UpdateProduct, ProductPage),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestUuidResponse,
            DuplicateResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints")
    )
)]
pub struct ApiDoc;

/// Create the products router with all HTTP endpoints
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/all", get(list_products))
        .route("/new-arrivals", get(new_arrivals))
        .route("/search", get(search_products))
        .route("/title/{title}", get(get_by_title))
        .route("/category/{category}", get(get_by_category))
        .route("/create", post(create_product))
        .route("/insertMany", post(insert_many))
        .route("/delete/{id}", put(soft_delete_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(shared_service)
}

/// Listing page as returned to callers; `prevPage`/`nextPage` are URLs.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub payload: Vec<ProductDto>,
    pub total_pages: u32,
    pub page: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    #[schema(example = "http://localhost:8080/api/products/all?page=1&limit=10")]
    pub prev_page: Option<String>,
    pub next_page: Option<String>,
}

impl ProductPage {
    fn new(page: Page<ProductDto>, base: &str, pairs: &[(String, String)]) -> Self {
        Self {
            prev_page: page.prev_page.map(|p| page_url(base, pairs, p)),
            next_page: page.next_page.map(|p| page_url(base, pairs, p)),
            payload: page.payload,
            total_pages: page.total_pages,
            page: page.page,
            has_prev_page: page.has_prev_page,
            has_next_page: page.has_next_page,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Text matched against title and description
    pub q: Option<String>,
}

/// Absolute URL of the current path, honouring a proxy's `X-Forwarded-Proto`
fn base_url(headers: &HeaderMap, path: &str) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
    };
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header(HOST.as_str()).unwrap_or("localhost");
    format!("{}://{}{}", scheme, host, path)
}

/// List active products, paginated
#[utoipa::path(
    get,
    path = "/all",
    tag = "Products",
    params(
        ("limit" = Option<u32>, Query, description = "Page size (1-100, default 10)"),
        ("page" = Option<u32>, Query, description = "Page number (default 1)"),
        ("sort" = Option<String>, Query, description = "Price order: asc or desc"),
        ("category" = Option<String>, Query, description = "Category id"),
        ("minPrice" = Option<f64>, Query, description = "Inclusive lower price bound"),
        ("maxPrice" = Option<f64>, Query, description = "Inclusive upper price bound"),
    ),
    responses(
        (status = 200, description = "Page of products", body = ProductPage),
        (status = 400, response = BadRequestValidationResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProductResult<Json<ProductPage>> {
    let page = service
        .get_all_products(ListParams::from_pairs(&pairs))
        .await?;
    let base = base_url(&headers, uri.path());
    Ok(Json(ProductPage::new(page, &base, &pairs)))
}

/// The 12 newest active products
#[utoipa::path(
    get,
    path = "/new-arrivals",
    tag = "Products",
    responses(
        (status = 200, description = "Newest products", body = ApiResponse<Vec<ProductDto>>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn new_arrivals<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
) -> ProductResult<Json<ApiResponse<Vec<ProductDto>>>> {
    let products = service.get_new_arrivals().await?;
    let status = if products.is_empty() {
        "No new products"
    } else {
        "New products retrieved"
    };
    Ok(Json(ApiResponse::new(status, products)))
}

/// Search products by title or description
#[utoipa::path(
    get,
    path = "/search",
    tag = "Products",
    params(SearchParams),
    responses(
        (status = 200, description = "Up to 15 matches", body = ApiResponse<Vec<ProductDto>>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn search_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Query(params): Query<SearchParams>,
) -> ProductResult<Json<ApiResponse<Vec<ProductDto>>>> {
    let term = params.q.unwrap_or_default();
    if term.trim().is_empty() {
        return Ok(Json(ApiResponse::new("Success", Vec::new())));
    }

    let products = service.search_products(&term).await?;
    Ok(Json(ApiResponse::new("Search results", products)))
}

/// Get a product by its exact title
#[utoipa::path(
    get,
    path = "/title/{title}",
    tag = "Products",
    params(
        ("title" = String, Path, description = "Product title")
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductDto>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_by_title<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Path(title): Path<String>,
) -> ProductResult<Json<ApiResponse<ProductDto>>> {
    let product = service.get_product_by_title(&title).await?;
    Ok(Json(ApiResponse::new("Product retrieved", product)))
}

/// List every product in a category
#[utoipa::path(
    get,
    path = "/category/{category}",
    tag = "Products",
    params(
        ("category" = String, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Products in category", body = ApiResponse<Vec<ProductDto>>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_by_category<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Path(category): Path<String>,
) -> ProductResult<Json<ApiResponse<Vec<ProductDto>>>> {
    let products = service.get_products_by_category(&category).await?;
    Ok(Json(ApiResponse::new("Products by category retrieved", products)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductDto>),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<ApiResponse<ProductDto>>> {
    let product = service.get_product_by_id(id).await?;
    Ok(Json(ApiResponse::new("Product retrieved", product)))
}

/// Create a product from JSON or a multipart form with an optional `file` image
#[utoipa::path(
    post,
    path = "/create",
    tag = "Products",
    request_body(
        content(
            (CreateProduct = "application/json"),
            (CreateProduct = "multipart/form-data")
        ),
        description = "Product fields; multipart forms may add a `file` image (max 4MB)"
    ),
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductDto>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 413, description = "Payload too large"),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    form: ProductForm<CreateProduct>,
) -> ProductResult<impl IntoResponse> {
    let product = service.create_product(form.data, form.file).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Product created", product)),
    ))
}

/// Insert a batch of products; any invalid or duplicate entry rejects the whole batch
#[utoipa::path(
    post,
    path = "/insertMany",
    tag = "Products",
    request_body = Vec<CreateProduct>,
    responses(
        (status = 201, description = "Products created", body = ApiResponse<Vec<ProductDto>>),
        (status = 400, response = DuplicateResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn insert_many<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    Json(batch): Json<Value>,
) -> ProductResult<impl IntoResponse> {
    let products = service.insert_many_products(batch).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Products created", products)),
    ))
}

/// Update a product from JSON or a multipart form
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(
        content(
            (UpdateProduct = "application/json"),
            (UpdateProduct = "multipart/form-data")
        )
    ),
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductDto>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(id): UuidPath,
    form: ProductForm<UpdateProduct>,
) -> ProductResult<Json<ApiResponse<ProductDto>>> {
    let product = service.update_product(id, form.data, form.file).await?;
    Ok(Json(ApiResponse::new("Product updated", product)))
}

/// Deactivate a product without removing it
#[utoipa::path(
    put,
    path = "/delete/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deactivated", body = ApiResponse<ProductDto>),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn soft_delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<ApiResponse<ProductDto>>> {
    let product = service.soft_delete_product(id).await?;
    Ok(Json(ApiResponse::new("Product deactivated", product)))
}

/// Permanently delete a product
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Products",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<ProductDto>),
        (status = 400, response = BadRequestUuidResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    UuidPath(id): UuidPath,
) -> ProductResult<Json<ApiResponse<ProductDto>>> {
    let product = service.delete_product(id).await?;
    Ok(Json(ApiResponse::new("Product deleted", product)))
}
