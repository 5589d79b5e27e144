use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use shelf_authz::{require_identity, Identity, TokenKeys};
use shelf_http::AppError;
use uuid::Uuid;

use super::models::{Book, BookPatch, CreateBook};
use super::service::{BookError, BookService};

/// Every route sits behind the request gate.
pub fn router(service: Arc<BookService>, keys: Arc<TokenKeys>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route_layer(middleware::from_fn_with_state(keys, require_identity))
        .with_state(service)
}

/// Ids that are not UUIDs cannot name a book, so they are reported the same
/// way as unknown ones.
fn book_id(raw: &str) -> Result<Uuid, BookError> {
    Uuid::parse_str(raw).map_err(|_| BookError::NotFound)
}

async fn list_books(
    State(service): State<Arc<BookService>>,
    identity: Identity,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(service.list(identity.id).await?))
}

async fn get_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let book = service.get(book_id(&id)?, identity.id).await?;
    Ok(Json(book))
}

async fn create_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = payload?;
    let book = service.create(identity.id, input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    Path(id): Path<String>,
    payload: Result<Json<BookPatch>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(&id)?;
    let Json(patch) = payload?;
    let book = service.update(id, identity.id, patch).await?;
    Ok(Json(book))
}

async fn delete_book(
    State(service): State<Arc<BookService>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete(book_id(&id)?, identity.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
