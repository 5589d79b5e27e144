//! Account registration and login.

pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{InitCtx, Migration, Module};

pub use service::{AuthError, AuthService};
pub use store::{PgUserStore, UserStore};

pub struct AuthModule {
    service: Arc<AuthService>,
}

impl AuthModule {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            token_ttl_secs = ctx.settings.auth.token_ttl_secs,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } }
        });

        Some(json!({
            "paths": {
                "/register": {
                    "post": {
                        "summary": "Register a new account",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/RegisterRequest" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Account created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/RegisterResponse" }
                                    }
                                }
                            },
                            "400": { "description": "Missing fields", "content": error },
                            "409": { "description": "Email or username already exists", "content": error }
                        }
                    }
                },
                "/login": {
                    "post": {
                        "summary": "Exchange credentials for a bearer token",
                        "tags": ["Auth"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/LoginRequest" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Signed token valid for the configured lifetime",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/TokenResponse" }
                                    }
                                }
                            },
                            "400": { "description": "Missing fields", "content": error },
                            "401": { "description": "Invalid credentials", "content": error }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "format": "uuid" },
                            "username": { "type": "string" },
                            "email": { "type": "string" },
                            "created_at": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "username", "email", "created_at"]
                    },
                    "RegisterRequest": {
                        "type": "object",
                        "properties": {
                            "username": { "type": "string" },
                            "email": { "type": "string" },
                            "password": { "type": "string" }
                        },
                        "required": ["username", "email", "password"]
                    },
                    "RegisterResponse": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "user": { "$ref": "#/components/schemas/User" }
                        },
                        "required": ["message", "user"]
                    },
                    "LoginRequest": {
                        "type": "object",
                        "properties": {
                            "email": { "type": "string" },
                            "password": { "type": "string" }
                        },
                        "required": ["email", "password"]
                    },
                    "TokenResponse": {
                        "type": "object",
                        "properties": { "token": { "type": "string" } },
                        "required": ["token"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_users",
            sql: r#"
                CREATE TABLE IF NOT EXISTS users (
                    id            UUID PRIMARY KEY,
                    username      TEXT NOT NULL UNIQUE,
                    email         TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                "#,
        }]
    }
}
