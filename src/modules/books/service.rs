use std::sync::Arc;

use serde_json::json;
use shelf_db::StoreError;
use shelf_http::AppError;
use uuid::Uuid;

use super::models::{Book, BookChanges, BookPatch, CreateBook, NewBook};
use super::store::BookStore;

const AUTHOR_FKEY: &str = "books_author_id_fkey";

#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: &'static str,
    },

    /// Missing or owned by someone else; callers cannot tell which.
    #[error("book not found or access denied")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BookError {
    fn invalid(field: &'static str, message: &'static str) -> Self {
        Self::Validation {
            field: Some(field),
            message,
        }
    }

    fn from_store(err: StoreError, operation: &'static str) -> Self {
        match err {
            StoreError::ForeignKeyViolation { constraint } if constraint == AUTHOR_FKEY => {
                Self::invalid("author_id", "Referenced author does not exist")
            }
            other => Self::Internal(anyhow::Error::new(other).context(operation)),
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation { field, message } => {
                let details = field
                    .map(|field| vec![json!({ "field": field, "error": message })])
                    .unwrap_or_default();
                AppError::validation(details, message)
            }
            BookError::NotFound => AppError::not_found("Book not found or access denied"),
            BookError::Internal(err) => AppError::Internal(err),
        }
    }
}

/// Book operations, each scoped to the calling user.
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Book>, BookError> {
        self.store
            .list(user_id)
            .await
            .map_err(|e| BookError::from_store(e, "Error fetching books"))
    }

    pub async fn get(&self, id: Uuid, user_id: Uuid) -> Result<Book, BookError> {
        self.store
            .find(id, user_id)
            .await
            .map_err(|e| BookError::from_store(e, "Error fetching book"))?
            .ok_or(BookError::NotFound)
    }

    pub async fn create(&self, user_id: Uuid, input: CreateBook) -> Result<Book, BookError> {
        let Some(title) = input.title.filter(|title| !title.is_empty()) else {
            return Err(BookError::invalid("title", "Title is required"));
        };
        check_page(input.current_page)?;

        let new_book = NewBook {
            id: Uuid::now_v7(),
            user_id,
            title,
            author_id: input.author_id,
            isbn: input.isbn,
            cover_image_url: input.cover_image_url,
            status: input.status.unwrap_or_default(),
            current_page: input.current_page,
            start_date: input.start_date,
            finish_date: input.finish_date,
        };

        let book = self
            .store
            .insert(new_book)
            .await
            .map_err(|e| BookError::from_store(e, "Error creating book"))?;

        tracing::info!(book_id = %book.id, user_id = %user_id, "book created");
        Ok(book)
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: BookPatch,
    ) -> Result<Book, BookError> {
        let changes = validate_patch(patch)?;

        let book = self
            .store
            .update(id, user_id, &changes)
            .await
            .map_err(|e| BookError::from_store(e, "Error updating book"))?
            .ok_or(BookError::NotFound)?;

        tracing::info!(book_id = %book.id, user_id = %user_id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), BookError> {
        let deleted = self
            .store
            .delete(id, user_id)
            .await
            .map_err(|e| BookError::from_store(e, "Error deleting book"))?;

        if !deleted {
            return Err(BookError::NotFound);
        }

        tracing::info!(book_id = %id, user_id = %user_id, "book deleted");
        Ok(())
    }
}

fn check_page(page: Option<i32>) -> Result<(), BookError> {
    match page {
        Some(page) if page < 0 => Err(BookError::invalid(
            "current_page",
            "current_page must not be negative",
        )),
        _ => Ok(()),
    }
}

fn validate_patch(patch: BookPatch) -> Result<BookChanges, BookError> {
    if patch.is_empty() {
        return Err(BookError::Validation {
            field: None,
            message: "No update data provided.",
        });
    }

    let title = match patch.title {
        None => None,
        Some(Some(title)) if !title.is_empty() => Some(title),
        Some(_) => return Err(BookError::invalid("title", "Title is required")),
    };

    let status = match patch.status {
        None => None,
        Some(Some(status)) => Some(status),
        Some(None) => return Err(BookError::invalid("status", "Status cannot be null")),
    };

    check_page(patch.current_page.flatten())?;

    Ok(BookChanges {
        title,
        author_id: patch.author_id,
        isbn: patch.isbn,
        cover_image_url: patch.cover_image_url,
        status,
        current_page: patch.current_page,
        start_date: patch.start_date,
        finish_date: patch.finish_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::BookStatus;
    use crate::modules::books::store::memory::MemoryBookStore;
    use axum::http::StatusCode;

    fn titled(title: &str) -> CreateBook {
        CreateBook {
            title: Some(title.to_string()),
            ..CreateBook::default()
        }
    }

    fn service() -> (BookService, Arc<MemoryBookStore>) {
        let store = Arc::new(MemoryBookStore::default());
        (BookService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_defaults_status() {
        let (service, _) = service();
        let owner = Uuid::now_v7();

        let book = service.create(owner, titled("T")).await.unwrap();
        assert_eq!(book.title, "T");
        assert_eq!(book.status, BookStatus::ToRead);
        assert_eq!(book.user_id, owner);
        assert_eq!(book.author_name, None);
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let (service, store) = service();

        for input in [CreateBook::default(), titled("")] {
            let err = service.create(Uuid::now_v7(), input).await.unwrap_err();
            assert!(matches!(err, BookError::Validation { field: Some("title"), .. }));
        }
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_create_joins_author_name() {
        let author = Uuid::now_v7();
        let store = Arc::new(MemoryBookStore::default().with_author(author, "Frank Herbert"));
        let service = BookService::new(store);

        let mut input = titled("Dune");
        input.author_id = Some(author);
        let book = service.create(Uuid::now_v7(), input).await.unwrap();

        assert_eq!(book.author_name.as_deref(), Some("Frank Herbert"));
    }

    #[tokio::test]
    async fn test_unknown_author_is_validation_error() {
        let (service, _) = service();
        let mut input = titled("Dune");
        input.author_id = Some(Uuid::now_v7());

        let err = service.create(Uuid::now_v7(), input).await.unwrap_err();
        assert_eq!(AppError::from(err).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_is_owner_scoped_and_newest_first() {
        let (service, _) = service();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        service.create(alice, titled("first")).await.unwrap();
        service.create(bob, titled("not yours")).await.unwrap();
        service.create(alice, titled("second")).await.unwrap();

        let titles: Vec<String> = service
            .list(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_foreign_books_look_missing() {
        let (service, store) = service();
        let owner = Uuid::now_v7();
        let intruder = Uuid::now_v7();
        let book = service.create(owner, titled("mine")).await.unwrap();

        assert!(matches!(
            service.get(book.id, intruder).await,
            Err(BookError::NotFound)
        ));
        assert!(matches!(
            service
                .update(book.id, intruder, BookPatch { status: Some(Some(BookStatus::Read)), ..BookPatch::default() })
                .await,
            Err(BookError::NotFound)
        ));
        assert!(matches!(
            service.delete(book.id, intruder).await,
            Err(BookError::NotFound)
        ));
        assert!(matches!(
            service.get(Uuid::now_v7(), owner).await,
            Err(BookError::NotFound)
        ));

        assert_eq!(store.count(), 1);
        assert_eq!(service.get(book.id, owner).await.unwrap().status, BookStatus::ToRead);
    }

    #[tokio::test]
    async fn test_update_touches_only_supplied_fields() {
        let (service, _) = service();
        let owner = Uuid::now_v7();
        let mut input = titled("T");
        input.isbn = Some("123".to_string());
        let book = service.create(owner, input).await.unwrap();

        let patch = BookPatch {
            status: Some(Some(BookStatus::Reading)),
            ..BookPatch::default()
        };
        let updated = service.update(book.id, owner, patch.clone()).await.unwrap();

        assert_eq!(updated.status, BookStatus::Reading);
        assert_eq!(updated.title, "T");
        assert_eq!(updated.isbn.as_deref(), Some("123"));

        let again = service.update(book.id, owner, patch).await.unwrap();
        assert_eq!(
            (again.title, again.isbn, again.status),
            (updated.title, updated.isbn, updated.status)
        );
    }

    #[tokio::test]
    async fn test_update_null_clears_nullable_field() {
        let (service, _) = service();
        let owner = Uuid::now_v7();
        let mut input = titled("T");
        input.current_page = Some(10);
        let book = service.create(owner, input).await.unwrap();

        let patch = BookPatch {
            current_page: Some(None),
            ..BookPatch::default()
        };
        let updated = service.update(book.id, owner, patch).await.unwrap();
        assert_eq!(updated.current_page, None);
    }

    #[test]
    fn test_patch_validation() {
        assert!(matches!(
            validate_patch(BookPatch::default()),
            Err(BookError::Validation { field: None, message: "No update data provided." })
        ));
        assert!(matches!(
            validate_patch(BookPatch { title: Some(None), ..BookPatch::default() }),
            Err(BookError::Validation { field: Some("title"), .. })
        ));
        assert!(matches!(
            validate_patch(BookPatch { title: Some(Some(String::new())), ..BookPatch::default() }),
            Err(BookError::Validation { field: Some("title"), .. })
        ));
        assert!(matches!(
            validate_patch(BookPatch { status: Some(None), ..BookPatch::default() }),
            Err(BookError::Validation { field: Some("status"), .. })
        ));
        assert!(matches!(
            validate_patch(BookPatch { current_page: Some(Some(-1)), ..BookPatch::default() }),
            Err(BookError::Validation { field: Some("current_page"), .. })
        ));

        let changes = validate_patch(BookPatch {
            isbn: Some(None),
            ..BookPatch::default()
        })
        .unwrap();
        assert_eq!(changes.isbn, Some(None));
        assert_eq!(changes.title, None);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            AppError::from(BookError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(BookError::from_store(
                StoreError::Database(sqlx::Error::PoolTimedOut),
                "Error fetching books"
            ))
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(BookError::from_store(
                StoreError::ForeignKeyViolation {
                    constraint: AUTHOR_FKEY.to_string()
                },
                "Error creating book"
            ))
            .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
