use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Reading status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "book_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BookStatus {
    #[default]
    ToRead,
    Reading,
    Read,
}

/// Book joined with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub status: BookStatus,
    pub current_page: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub finish_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBook {
    pub title: Option<String>,
    pub author_id: Option<Uuid>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub status: Option<BookStatus>,
    pub current_page: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub finish_date: Option<NaiveDate>,
}

/// Validated book ready for insertion.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author_id: Option<Uuid>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub status: BookStatus,
    pub current_page: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub finish_date: Option<NaiveDate>,
}

/// Body of `PUT /books/{id}`.
///
/// Outer `None` means the key was absent; `Some(None)` means an explicit
/// `null`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "explicit")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub author_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "explicit")]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub cover_image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub status: Option<Option<BookStatus>>,
    #[serde(default, deserialize_with = "explicit")]
    pub current_page: Option<Option<i32>>,
    #[serde(default, deserialize_with = "explicit")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "explicit")]
    pub finish_date: Option<Option<NaiveDate>>,
}

fn explicit<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Validated partial update. `None` leaves a column untouched; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author_id: Option<Option<Uuid>>,
    pub isbn: Option<Option<String>>,
    pub cover_image_url: Option<Option<String>>,
    pub status: Option<BookStatus>,
    pub current_page: Option<Option<i32>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub finish_date: Option<Option<NaiveDate>>,
}
