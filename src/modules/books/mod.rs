//! Per-user book collection.

pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_authz::TokenKeys;
use shelf_kernel::{InitCtx, Migration, Module};

pub use service::{BookError, BookService};
pub use store::{BookStore, PgBookStore};

pub struct BooksModule {
    service: Arc<BookService>,
    keys: Arc<TokenKeys>,
}

impl BooksModule {
    pub fn new(service: Arc<BookService>, keys: Arc<TokenKeys>) -> Self {
        Self { service, keys }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone(), self.keys.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = json!({
            "application/json": { "schema": { "$ref": "#/components/schemas/Book" } }
        });
        let id_param = json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string", "format": "uuid" }
        }]);
        let secured = json!([{ "bearerAuth": [] }]);

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List the caller's books, newest first",
                        "tags": ["Books"],
                        "security": secured,
                        "responses": {
                            "200": {
                                "description": "Books owned by the caller",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "401": error("Missing or invalid token")
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "security": secured,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Created book", "content": book },
                            "400": error("Title missing or invalid field"),
                            "401": error("Missing or invalid token")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Fetch one of the caller's books",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "responses": {
                            "200": { "description": "The book", "content": book },
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found or access denied")
                        }
                    },
                    "put": {
                        "summary": "Update any subset of a book's fields",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Updated book", "content": book },
                            "400": error("No update data provided or invalid field"),
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found or access denied")
                        }
                    },
                    "delete": {
                        "summary": "Delete one of the caller's books",
                        "tags": ["Books"],
                        "security": secured,
                        "parameters": id_param,
                        "responses": {
                            "204": { "description": "Deleted" },
                            "401": error("Missing or invalid token"),
                            "404": error("Book not found or access denied")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookStatus": {
                        "type": "string",
                        "enum": ["to-read", "reading", "read"]
                    },
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "user_id": { "type": "string", "format": "uuid" },
                            "title": { "type": "string" },
                            "author_id": { "type": ["string", "null"], "format": "uuid" },
                            "author_name": { "type": ["string", "null"] },
                            "isbn": { "type": ["string", "null"] },
                            "cover_image_url": { "type": ["string", "null"] },
                            "status": { "$ref": "#/components/schemas/BookStatus" },
                            "current_page": { "type": ["integer", "null"], "minimum": 0 },
                            "start_date": { "type": ["string", "null"], "format": "date" },
                            "finish_date": { "type": ["string", "null"], "format": "date" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "user_id", "title", "status", "created_at", "updated_at"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "minLength": 1 },
                            "author_id": { "type": "string", "format": "uuid" },
                            "isbn": { "type": "string" },
                            "cover_image_url": { "type": "string" },
                            "status": { "$ref": "#/components/schemas/BookStatus" },
                            "current_page": { "type": "integer", "minimum": 0 },
                            "start_date": { "type": "string", "format": "date" },
                            "finish_date": { "type": "string", "format": "date" }
                        },
                        "required": ["title"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "description": "Only supplied keys change; null clears a nullable field",
                        "properties": {
                            "title": { "type": "string", "minLength": 1 },
                            "author_id": { "type": ["string", "null"], "format": "uuid" },
                            "isbn": { "type": ["string", "null"] },
                            "cover_image_url": { "type": ["string", "null"] },
                            "status": { "$ref": "#/components/schemas/BookStatus" },
                            "current_page": { "type": ["integer", "null"], "minimum": 0 },
                            "start_date": { "type": ["string", "null"], "format": "date" },
                            "finish_date": { "type": ["string", "null"], "format": "date" }
                        },
                        "minProperties": 1
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_books",
            sql: r#"
                CREATE TABLE IF NOT EXISTS authors (
                    id   UUID PRIMARY KEY,
                    name TEXT NOT NULL
                );

                DO $$
                BEGIN
                    CREATE TYPE book_status AS ENUM ('to-read', 'reading', 'read');
                EXCEPTION
                    WHEN duplicate_object THEN NULL;
                END
                $$;

                CREATE TABLE IF NOT EXISTS books (
                    id              UUID PRIMARY KEY,
                    user_id         UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                    title           TEXT NOT NULL CHECK (title <> ''),
                    author_id       UUID,
                    isbn            TEXT,
                    cover_image_url TEXT,
                    status          book_status NOT NULL DEFAULT 'to-read',
                    current_page    INTEGER CHECK (current_page >= 0),
                    start_date      DATE,
                    finish_date     DATE,
                    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    CONSTRAINT books_author_id_fkey
                        FOREIGN KEY (author_id) REFERENCES authors (id) ON DELETE SET NULL
                );

                CREATE INDEX IF NOT EXISTS books_user_created_idx
                    ON books (user_id, created_at DESC);
                "#,
        }]
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}
