//! Persistence for books.
//!
//! [`BookStore`] is the seam the handlers talk to. [`MongoBookStore`] backs it
//! with one MongoDB collection; [`super::memory::MemoryBookStore`] keeps the
//! same contract in process.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{Book, BookPatch, NewBook};

/// Server code for a write refused by the collection's validator.
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The id is not a syntactically valid ObjectId.
    #[error("invalid book id \"{0}\": expected 24 hexadecimal characters")]
    InvalidId(String),

    /// The store refused the document; the message is the store's own.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Fault(String),

    #[error(transparent)]
    Backend(#[from] mongodb::error::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations on the single books collection.
///
/// Absence is reported as `Ok(None)` / `Ok(false)`, never as an error.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Persist a new book and return it with its assigned id.
    async fn insert(&self, book: NewBook) -> StoreResult<Book>;

    /// Every book, in store order.
    async fn find_all(&self) -> StoreResult<Vec<Book>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Book>>;

    /// Apply `patch` and return the book as it is after the update.
    async fn update_by_id(&self, id: &str, patch: BookPatch) -> StoreResult<Option<Book>>;

    /// `true` when a book was removed.
    async fn delete_by_id(&self, id: &str) -> StoreResult<bool>;

    /// Remove every book, returning how many there were.
    async fn delete_all(&self) -> StoreResult<u64>;
}

pub(crate) fn parse_id(id: &str) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// On-disk shape of a book.
#[derive(Debug, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

impl From<NewBook> for BookDocument {
    fn from(book: NewBook) -> Self {
        Self {
            id: None,
            name: book.name,
            img: book.img,
            summary: book.summary,
        }
    }
}

impl From<BookDocument> for Book {
    fn from(document: BookDocument) -> Self {
        Book {
            id: document.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: document.name,
            img: document.img,
            summary: document.summary,
        }
    }
}

/// `$set` for new values, `$unset` for cleared ones.
fn update_document(patch: &BookPatch) -> Document {
    let mut set = Document::new();
    let mut unset = Document::new();

    for (field, value) in patch.changes() {
        match value {
            Some(value) => {
                set.insert(field, value);
            }
            None => {
                unset.insert(field, "");
            }
        }
    }

    let mut update = Document::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    update
}

/// Lift validator rejections out of the generic driver error.
fn classify_write_error(err: mongodb::error::Error) -> StoreError {
    let refused = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DOCUMENT_VALIDATION_FAILURE =>
        {
            Some(write_error.message.clone())
        }
        ErrorKind::Command(command_error) if command_error.code == DOCUMENT_VALIDATION_FAILURE => {
            Some(command_error.message.clone())
        }
        _ => None,
    };

    match refused {
        Some(message) => StoreError::Validation(message),
        None => StoreError::Backend(err),
    }
}

/// [`BookStore`] over a MongoDB collection.
#[derive(Clone, Debug)]
pub struct MongoBookStore {
    collection: Collection<BookDocument>,
}

impl MongoBookStore {
    pub fn new(db: &shelf_db::Db, collection: &str) -> Self {
        Self {
            collection: db.collection(collection),
        }
    }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let mut document = BookDocument::from(book);
        let result = self
            .collection
            .insert_one(&document)
            .await
            .map_err(classify_write_error)?;

        let id = result.inserted_id.as_object_id().ok_or_else(|| {
            StoreError::Fault(format!(
                "store assigned a non-ObjectId identity: {}",
                result.inserted_id
            ))
        })?;
        document.id = Some(id);

        Ok(document.into())
    }

    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        let cursor = self.collection.find(doc! {}).await?;
        let documents: Vec<BookDocument> = cursor.try_collect().await?;
        tracing::debug!(count = documents.len(), "listed books");
        Ok(documents.into_iter().map(Book::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
        let id = parse_id(id)?;
        let document = self.collection.find_one(doc! { "_id": id }).await?;
        Ok(document.map(Book::from))
    }

    async fn update_by_id(&self, id: &str, patch: BookPatch) -> StoreResult<Option<Book>> {
        let object_id = parse_id(id)?;
        if patch.is_empty() {
            // an empty `$set` is rejected by the server
            return self.find_by_id(id).await;
        }

        let document = self
            .collection
            .find_one_and_update(doc! { "_id": object_id }, update_document(&patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(classify_write_error)?;

        Ok(document.map(Book::from))
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id(id)?;
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count == 1)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let result = self.collection.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::error::{CommandError, Error, WriteError};

    fn write_error(code: i32, message: &str) -> Error {
        let write_error: WriteError =
            mongodb::bson::from_document(doc! { "code": code, "errmsg": message }).unwrap();
        Error::from(ErrorKind::Write(WriteFailure::WriteError(write_error)))
    }

    #[test]
    fn validator_refusals_are_validation_errors() {
        let err = classify_write_error(write_error(121, "Document failed validation"));
        assert!(matches!(err, StoreError::Validation(m) if m == "Document failed validation"));

        let command_error: CommandError = mongodb::bson::from_document(doc! {
            "code": 121,
            "codeName": "DocumentValidationFailure",
            "errmsg": "Document failed validation",
        })
        .unwrap();
        let err = classify_write_error(Error::from(ErrorKind::Command(command_error)));
        assert!(matches!(err, StoreError::Validation(m) if m == "Document failed validation"));
    }

    #[test]
    fn other_write_errors_stay_backend_errors() {
        let err = classify_write_error(write_error(11000, "E11000 duplicate key error"));
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn parse_id_rejects_malformed_tokens() {
        assert!(matches!(parse_id("not-an-id"), Err(StoreError::InvalidId(id)) if id == "not-an-id"));
        assert!(parse_id("665f1c2ab8e4a1d3c9f0a001").is_ok());
    }

    #[test]
    fn update_document_sets_and_unsets() {
        let patch = BookPatch {
            name: None,
            img: Some(None),
            summary: Some(Some("Updated".to_string())),
        };

        assert_eq!(
            update_document(&patch),
            doc! {
                "$set": { "summary": "Updated" },
                "$unset": { "img": "" },
            }
        );
    }

    #[test]
    fn update_document_omits_empty_operators() {
        let patch = BookPatch {
            name: Some(Some("Dune".to_string())),
            ..BookPatch::default()
        };
        assert_eq!(update_document(&patch), doc! { "$set": { "name": "Dune" } });
    }

    #[test]
    fn stored_document_without_fields_maps_to_bare_book() {
        let id = ObjectId::new();
        let book = Book::from(BookDocument {
            id: Some(id),
            name: None,
            img: None,
            summary: None,
        });
        assert_eq!(book.id, id.to_hex());
        assert_eq!(book.name, None);
    }
}
