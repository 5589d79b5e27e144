pub mod auth;
pub mod books;

use std::sync::Arc;

use anyhow::Context;
use shelf_authz::{PasswordHasher, TokenKeys};
use shelf_kernel::settings::AuthSettings;
use shelf_kernel::ModuleRegistry;
use sqlx::PgPool;

use auth::{AuthModule, AuthService, PgUserStore, UserStore};
use books::{BookService, BookStore, BooksModule, PgBookStore};

/// Services shared by the HTTP modules, built once at startup.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub books: Arc<BookService>,
    pub keys: Arc<TokenKeys>,
}

impl Services {
    pub fn new(
        settings: &AuthSettings,
        users: Arc<dyn UserStore>,
        books: Arc<dyn BookStore>,
    ) -> anyhow::Result<Self> {
        let keys = Arc::new(TokenKeys::from_settings(settings));
        let hasher = PasswordHasher::new(settings.hash_memory_kib, settings.hash_iterations)
            .context("invalid password hashing parameters")?;
        let auth = AuthService::new(users, hasher, keys.clone())
            .context("failed to prepare password verifier")?;

        Ok(Self {
            auth: Arc::new(auth),
            books: Arc::new(BookService::new(books)),
            keys,
        })
    }

    /// Services backed by PostgreSQL.
    pub fn postgres(settings: &AuthSettings, pool: PgPool) -> anyhow::Result<Self> {
        Self::new(
            settings,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgBookStore::new(pool)),
        )
    }
}

/// Register all project-specific modules with the registry.
///
/// `auth` goes first: its migration creates the table `books` references.
pub fn register_all(registry: &mut ModuleRegistry, services: &Services) {
    registry.register(Arc::new(AuthModule::new(services.auth.clone())));
    registry.register(Arc::new(BooksModule::new(
        services.books.clone(),
        services.keys.clone(),
    )));
}
