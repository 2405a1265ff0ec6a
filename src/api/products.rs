//! Product API handlers using repository pattern
//!
//! Versions travel as HTTP validators: responses carry an `ETag`, updates
//! must send it back in `If-Match`, deletes may.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, audit_context};
use crate::domain::{
    CreateProductInput, DomainError, ProductFilter, UpdateProductInput, VersionToken,
};
use crate::infrastructure::AppState;
use crate::infrastructure::persistence::CancelSignal;
use crate::models::Product;

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct GetProductQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

fn etag(product: &Product) -> [(header::HeaderName, String); 1] {
    [(header::ETAG, format!("\"{}\"", product.version))]
}

/// What an `If-Match` header asked for
#[derive(Debug, PartialEq, Eq)]
enum IfMatch {
    Absent,
    /// `*`: any current version
    Any,
    Version(VersionToken),
}

impl IfMatch {
    /// The token a write must be guarded by, if the caller named one
    fn into_version(self) -> Option<VersionToken> {
        match self {
            IfMatch::Version(token) => Some(token),
            IfMatch::Absent | IfMatch::Any => None,
        }
    }
}

fn if_match(headers: &HeaderMap) -> Result<IfMatch, DomainError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(IfMatch::Absent);
    };
    let value = value
        .to_str()
        .map_err(|_| DomainError::Validation("If-Match must be ASCII".to_string()))?;
    let value = value.trim();
    if value == "*" {
        return Ok(IfMatch::Any);
    }
    let value = value.strip_prefix("W/").unwrap_or(value);

    VersionToken::from_hex(value).map(IfMatch::Version)
}

// List products, optionally including deleted ones
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProductFilter {
        query: query.q,
        include_deleted: query.include_deleted,
    };
    let products = state
        .product_repo
        .find_all(&CancelSignal::never(), filter)
        .await?;
    let total = products.len();

    Ok(Json(json!({
        "products": products,
        "total": total
    })))
}

// Get a single product by ID
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<GetProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let product = if query.include_deleted {
        state
            .product_repo
            .find_by_id_including_deleted(&CancelSignal::never(), id)
            .await?
    } else {
        state
            .product_repo
            .find_by_id(&CancelSignal::never(), id)
            .await?
    };
    let product = product.ok_or_else(|| DomainError::not_found("products", id))?;

    Ok((etag(&product), Json(json!({ "product": product }))))
}

pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let audit = audit_context(&state, &headers)?;
    let product = state
        .product_repo
        .create(&audit, &CancelSignal::never(), payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        etag(&product),
        Json(json!({
            "product": product,
            "message": "Product created successfully"
        })),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    // An update must name the version it was based on; `*` does not
    let expected = if_match(&headers)?
        .into_version()
        .ok_or(ApiError::PreconditionRequired("If-Match"))?;
    let audit = audit_context(&state, &headers)?;

    let product = state
        .product_repo
        .update(&audit, &CancelSignal::never(), id, payload, expected)
        .await?;

    Ok((etag(&product), Json(json!({ "product": product }))))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let expected = if_match(&headers)?.into_version();
    let audit = audit_context(&state, &headers)?;

    state
        .product_repo
        .delete(&audit, &CancelSignal::never(), id, expected)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({"message": "Product deleted successfully"})),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_if_match(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MATCH, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_if_match_accepts_quoted_and_weak_tags() {
        assert_eq!(if_match(&HeaderMap::new()).unwrap(), IfMatch::Absent);

        let token = if_match(&with_if_match("\"0a0b\"")).unwrap().into_version();
        assert_eq!(token.unwrap().to_hex(), "0a0b");

        let token = if_match(&with_if_match("W/\"0a0b\"")).unwrap().into_version();
        assert_eq!(token.unwrap().to_hex(), "0a0b");
    }

    #[test]
    fn test_if_match_wildcard_names_no_version() {
        let parsed = if_match(&with_if_match(" * ")).unwrap();
        assert_eq!(parsed, IfMatch::Any);
        assert!(parsed.into_version().is_none());
    }

    #[test]
    fn test_if_match_rejects_garbage() {
        assert!(matches!(
            if_match(&with_if_match("\"not-hex\"")),
            Err(DomainError::Validation(_))
        ));
    }
}
