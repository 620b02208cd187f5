//! HTTP handlers for `/api/books`.
//!
//! Every store call is mapped through [`AppError`]: absence becomes 404
//! "Book not found", store validation becomes 400, anything else 500.
//! An id that cannot be decoded from the path fails like a malformed one.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shelf_http::error::{AppError, ErrorBody};
use utoipa::OpenApi;

use super::models::{Book, BookPatch, Message, NewBook};
use super::store::{BookStore, StoreError};

pub const NOT_FOUND_MESSAGE: &str = "Book not found";

type SharedStore = Arc<dyn BookStore>;

type IdParam = Result<Path<String>, PathRejection>;

/// A body decoded as a JSON object first. The derived impls of the model
/// types would also accept an array and fill the fields by position.
type ObjectBody = Result<Json<Map<String, Value>>, JsonRejection>;

fn decode_object<T: DeserializeOwned>(payload: ObjectBody) -> Result<T, AppError> {
    let Json(fields) = payload?;
    serde_json::from_value(Value::Object(fields))
        .map_err(|err| AppError::bad_request(format!("invalid book body: {err}")))
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => AppError::bad_request(message),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

/// Routes relative to the module mount point.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route(
            "/",
            get(list_books).post(create_book).delete(delete_all_books),
        )
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_books,
        create_book,
        delete_all_books,
        get_book,
        update_book,
        delete_book
    ),
    components(schemas(Book, NewBook, BookPatch, Message)),
    tags((name = "Books", description = "Book catalogue"))
)]
pub struct BooksApi;

/// Create a book
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "Books",
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Body could not be stored", body = ErrorBody),
        (status = 500, description = "Store fault", body = ErrorBody)
    )
)]
async fn create_book(
    State(store): State<SharedStore>,
    payload: ObjectBody,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let new_book: NewBook = decode_object(payload)?;
    let book = store.insert(new_book).await?;
    tracing::info!(id = %book.id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// List every book
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "Books",
    responses(
        (status = 200, description = "All books", body = [Book]),
        (status = 500, description = "Store fault", body = ErrorBody)
    )
)]
async fn list_books(State(store): State<SharedStore>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(store.find_all().await?))
}

/// Fetch one book
#[utoipa::path(
    get,
    path = "/api/books/{id}",
    tag = "Books",
    params(("id" = String, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book", body = Book),
        (status = 404, description = "No book with this id", body = ErrorBody),
        (status = 500, description = "Malformed id or store fault", body = ErrorBody)
    )
)]
async fn get_book(
    State(store): State<SharedStore>,
    id: IdParam,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    store
        .find_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(NOT_FOUND_MESSAGE))
}

/// Update some fields of a book
#[utoipa::path(
    put,
    path = "/api/books/{id}",
    tag = "Books",
    params(("id" = String, Path, description = "Book id")),
    request_body = BookPatch,
    responses(
        (status = 200, description = "The book after the update", body = Book),
        (status = 400, description = "Body could not be stored", body = ErrorBody),
        (status = 404, description = "No book with this id", body = ErrorBody),
        (status = 500, description = "Malformed id or store fault", body = ErrorBody)
    )
)]
async fn update_book(
    State(store): State<SharedStore>,
    id: IdParam,
    payload: ObjectBody,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    let patch: BookPatch = decode_object(payload)?;
    let book = store
        .update_by_id(&id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND_MESSAGE))?;
    tracing::info!(id = %book.id, "book updated");
    Ok(Json(book))
}

/// Delete one book
#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    tag = "Books",
    params(("id" = String, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book deleted", body = Message),
        (status = 404, description = "No book with this id", body = ErrorBody),
        (status = 500, description = "Malformed id or store fault", body = ErrorBody)
    )
)]
async fn delete_book(
    State(store): State<SharedStore>,
    id: IdParam,
) -> Result<Json<Message>, AppError> {
    let Path(id) = id?;
    if !store.delete_by_id(&id).await? {
        return Err(AppError::not_found(NOT_FOUND_MESSAGE));
    }
    tracing::info!(%id, "book deleted");
    Ok(Json(Message::new("Book deleted")))
}

/// Delete every book
#[utoipa::path(
    delete,
    path = "/api/books",
    tag = "Books",
    responses(
        (status = 200, description = "Number of books removed", body = Message),
        (status = 500, description = "Store fault", body = ErrorBody)
    )
)]
async fn delete_all_books(State(store): State<SharedStore>) -> Result<Json<Message>, AppError> {
    let count = store.delete_all().await?;
    tracing::info!(count, "all books deleted");
    Ok(Json(Message::new(format!("{count} books deleted"))))
}
