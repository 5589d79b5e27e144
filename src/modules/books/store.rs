use async_trait::async_trait;
use shelf_db::StoreResult;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{Book, BookChanges, NewBook};

/// Every book query projects the same joined shape.
macro_rules! select_book {
    ($tail:literal) => {
        concat!(
            "SELECT b.id, b.user_id, b.title, b.author_id, a.name AS author_name, ",
            "b.isbn, b.cover_image_url, b.status, b.current_page, b.start_date, ",
            "b.finish_date, b.created_at, b.updated_at ",
            "FROM books b LEFT JOIN authors a ON a.id = b.author_id ",
            $tail
        )
    };
}

/// Persistence for books. Every operation except insert is scoped to the
/// owning user; a book owned by someone else behaves as if it did not exist.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Newest first.
    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<Book>>;

    async fn find(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Book>>;

    async fn insert(&self, book: NewBook) -> StoreResult<Book>;

    /// `None` when no book matched both `id` and `user_id`.
    async fn update(&self, id: Uuid, user_id: Uuid, changes: &BookChanges)
        -> StoreResult<Option<Book>>;

    /// `false` when no book matched both `id` and `user_id`.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;
}

pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Compose the ownership-guarded UPDATE for the supplied columns.
///
/// Columns appear in a fixed order so the generated SQL is stable;
/// `updated_at` is always stamped.
pub(crate) fn build_update(
    id: Uuid,
    user_id: Uuid,
    changes: &BookChanges,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE books SET ");
    let mut set = builder.separated(", ");

    if let Some(title) = &changes.title {
        set.push("title = ").push_bind_unseparated(title.clone());
    }
    if let Some(author_id) = changes.author_id {
        set.push("author_id = ").push_bind_unseparated(author_id);
    }
    if let Some(isbn) = &changes.isbn {
        set.push("isbn = ").push_bind_unseparated(isbn.clone());
    }
    if let Some(cover_image_url) = &changes.cover_image_url {
        set.push("cover_image_url = ")
            .push_bind_unseparated(cover_image_url.clone());
    }
    if let Some(status) = changes.status {
        set.push("status = ").push_bind_unseparated(status);
    }
    if let Some(current_page) = changes.current_page {
        set.push("current_page = ").push_bind_unseparated(current_page);
    }
    if let Some(start_date) = changes.start_date {
        set.push("start_date = ").push_bind_unseparated(start_date);
    }
    if let Some(finish_date) = changes.finish_date {
        set.push("finish_date = ").push_bind_unseparated(finish_date);
    }
    set.push("updated_at = NOW()");

    builder
        .push(" WHERE id = ")
        .push_bind(id)
        .push(" AND user_id = ")
        .push_bind(user_id)
        .push(" RETURNING id");

    builder
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(select_book!(
            "WHERE b.user_id = $1 ORDER BY b.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn find(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(select_book!("WHERE b.id = $1 AND b.user_id = $2"))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO books (
                id, user_id, title, author_id, isbn, cover_image_url,
                status, current_page, start_date, finish_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(book.id)
        .bind(book.user_id)
        .bind(&book.title)
        .bind(book.author_id)
        .bind(&book.isbn)
        .bind(&book.cover_image_url)
        .bind(book.status)
        .bind(book.current_page)
        .bind(book.start_date)
        .bind(book.finish_date)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, Book>(select_book!("WHERE b.id = $1"))
            .bind(book.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: &BookChanges,
    ) -> StoreResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<(Uuid,)> = build_update(id, user_id, changes)
            .build_query_as()
            .fetch_optional(&mut *tx)
            .await?;

        let Some((id,)) = updated else {
            // Nothing changed; dropping the transaction rolls it back.
            return Ok(None);
        };

        let book = sqlx::query_as::<_, Book>(select_book!("WHERE b.id = $1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(book))
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;
    use shelf_db::StoreError;

    use super::*;

    /// Vec-backed store mirroring the table's ownership and author rules.
    #[derive(Default)]
    pub struct MemoryBookStore {
        authors: HashMap<Uuid, String>,
        books: Mutex<Vec<Book>>,
    }

    impl MemoryBookStore {
        pub fn with_author(mut self, id: Uuid, name: &str) -> Self {
            self.authors.insert(id, name.to_string());
            self
        }

        pub fn count(&self) -> usize {
            self.books.lock().unwrap().len()
        }

        fn check_author(&self, author_id: Option<Uuid>) -> StoreResult<Option<String>> {
            match author_id {
                None => Ok(None),
                Some(id) => match self.authors.get(&id) {
                    Some(name) => Ok(Some(name.clone())),
                    None => Err(StoreError::ForeignKeyViolation {
                        constraint: "books_author_id_fkey".to_string(),
                    }),
                },
            }
        }
    }

    #[async_trait]
    impl BookStore for MemoryBookStore {
        async fn list(&self, user_id: Uuid) -> StoreResult<Vec<Book>> {
            // Stored in insertion order, so reversing gives newest first.
            Ok(self
                .books
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|book| book.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn find(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Book>> {
            Ok(self
                .books
                .lock()
                .unwrap()
                .iter()
                .find(|book| book.id == id && book.user_id == user_id)
                .cloned())
        }

        async fn insert(&self, book: NewBook) -> StoreResult<Book> {
            let author_name = self.check_author(book.author_id)?;
            let now = Utc::now();
            let created = Book {
                id: book.id,
                user_id: book.user_id,
                title: book.title,
                author_id: book.author_id,
                author_name,
                isbn: book.isbn,
                cover_image_url: book.cover_image_url,
                status: book.status,
                current_page: book.current_page,
                start_date: book.start_date,
                finish_date: book.finish_date,
                created_at: now,
                updated_at: now,
            };
            self.books.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update(
            &self,
            id: Uuid,
            user_id: Uuid,
            changes: &BookChanges,
        ) -> StoreResult<Option<Book>> {
            let mut books = self.books.lock().unwrap();
            let Some(book) = books
                .iter_mut()
                .find(|book| book.id == id && book.user_id == user_id)
            else {
                return Ok(None);
            };

            let author_name = match changes.author_id {
                Some(author_id) => Some(self.check_author(author_id)?),
                None => None,
            };

            if let Some(title) = &changes.title {
                book.title = title.clone();
            }
            if let (Some(author_id), Some(name)) = (changes.author_id, author_name) {
                book.author_id = author_id;
                book.author_name = name;
            }
            if let Some(isbn) = &changes.isbn {
                book.isbn = isbn.clone();
            }
            if let Some(cover_image_url) = &changes.cover_image_url {
                book.cover_image_url = cover_image_url.clone();
            }
            if let Some(status) = changes.status {
                book.status = status;
            }
            if let Some(current_page) = changes.current_page {
                book.current_page = current_page;
            }
            if let Some(start_date) = changes.start_date {
                book.start_date = start_date;
            }
            if let Some(finish_date) = changes.finish_date {
                book.finish_date = finish_date;
            }
            book.updated_at = Utc::now();

            Ok(Some(book.clone()))
        }

        async fn delete(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
            let mut books = self.books.lock().unwrap();
            let before = books.len();
            books.retain(|book| !(book.id == id && book.user_id == user_id));
            Ok(books.len() < before)
        }
    }
}
