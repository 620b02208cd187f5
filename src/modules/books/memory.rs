use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::models::{Book, BookPatch, NewBook};
use super::store::{parse_id, BookStore, StoreResult};

/// In-process [`BookStore`]. Ids are real ObjectIds, so malformed ids fail
/// exactly as they do against MongoDB. Books are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: RwLock<Vec<Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.books.read().await.is_empty()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let book = book.into_book(ObjectId::new().to_hex());
        self.books.write().await.push(book.clone());
        Ok(book)
    }

    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        Ok(self.books.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
        let id = parse_id(id)?.to_hex();
        let books = self.books.read().await;
        Ok(books.iter().find(|book| book.id == id).cloned())
    }

    async fn update_by_id(&self, id: &str, patch: BookPatch) -> StoreResult<Option<Book>> {
        let id = parse_id(id)?.to_hex();
        let mut books = self.books.write().await;
        Ok(books.iter_mut().find(|book| book.id == id).map(|book| {
            patch.apply(book);
            book.clone()
        }))
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id(id)?.to_hex();
        let mut books = self.books.write().await;
        let before = books.len();
        books.retain(|book| book.id != id);
        Ok(books.len() < before)
    }

    async fn delete_all(&self) -> StoreResult<u64> {
        let mut books = self.books.write().await;
        let count = books.len() as u64;
        books.clear();
        Ok(count)
    }
}
