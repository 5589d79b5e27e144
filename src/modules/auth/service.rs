use std::sync::Arc;

use anyhow::Context;
use shelf_authz::{Identity, PasswordError, PasswordHasher, TokenKeys};
use shelf_db::StoreError;
use shelf_http::AppError;
use uuid::Uuid;

use super::models::{present, LoginRequest, NewUser, PublicUser, RegisterRequest};
use super::store::UserStore;

const REGISTER_FAILED: &str = "Server error during registration";
const LOGIN_FAILED: &str = "Server error during login";

/// Verified against when the email is unknown so both login failures cost
/// one hash verification.
const DUMMY_PASSWORD: &str = "shelf-timing-equalizer";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    MissingFields(&'static str),

    #[error("email or username already exists")]
    DuplicateUser,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingFields(message) => AppError::validation(vec![], message),
            AuthError::DuplicateUser => {
                AppError::conflict(vec![], "Email or username already exists")
            }
            AuthError::InvalidCredentials => AppError::unauthorized("Invalid credentials"),
            AuthError::Internal(err) => AppError::Internal(err),
        }
    }
}

fn internal(err: impl Into<anyhow::Error>, operation: &'static str) -> AuthError {
    AuthError::Internal(err.into().context(operation))
}

/// Registration and login.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    keys: Arc<TokenKeys>,
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        keys: Arc<TokenKeys>,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            store,
            hasher,
            keys,
            dummy_hash,
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, AuthError> {
        let (Some(username), Some(email), Some(password)) = (
            present(request.username),
            present(request.email),
            present(request.password),
        ) else {
            return Err(AuthError::MissingFields(
                "Username, email, and password are required",
            ));
        };

        let taken = self
            .store
            .exists_by_email_or_username(&email, &username)
            .await
            .map_err(|e| internal(e, REGISTER_FAILED))?;
        if taken {
            tracing::info!("registration rejected: email or username taken");
            return Err(AuthError::DuplicateUser);
        }

        let password_hash = self
            .hash_password(password)
            .await
            .map_err(|e| internal(e, REGISTER_FAILED))?;

        let new_user = NewUser {
            id: Uuid::now_v7(),
            username,
            email,
            password_hash,
        };

        let user = match self.store.insert(new_user).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration.
            Err(StoreError::UniqueViolation { constraint }) => {
                tracing::info!(%constraint, "registration rejected by unique constraint");
                return Err(AuthError::DuplicateUser);
            }
            Err(e) => return Err(internal(e, REGISTER_FAILED)),
        };

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Returns a signed token for the account behind `email`.
    pub async fn login(&self, request: LoginRequest) -> Result<String, AuthError> {
        let (Some(email), Some(password)) = (present(request.email), present(request.password))
        else {
            return Err(AuthError::MissingFields("Email and password are required"));
        };

        let credentials = self
            .store
            .find_by_email(&email)
            .await
            .map_err(|e| internal(e, LOGIN_FAILED))?;

        let (hash, identity) = match credentials {
            Some(found) => (
                found.password_hash,
                Some(Identity {
                    id: found.id,
                    username: found.username,
                }),
            ),
            None => (self.dummy_hash.clone(), None),
        };

        let matched = self
            .verify_password(password, hash)
            .await
            .map_err(|e| internal(e, LOGIN_FAILED))?;

        let identity = match identity {
            Some(identity) if matched => identity,
            _ => {
                tracing::info!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = self
            .keys
            .issue(&identity)
            .map_err(|e| internal(e, LOGIN_FAILED))?;

        tracing::info!(user_id = %identity.id, "login succeeded");
        Ok(token)
    }

    async fn hash_password(&self, password: String) -> anyhow::Result<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;
        Ok(hash)
    }

    async fn verify_password(&self, password: String, hash: String) -> anyhow::Result<bool> {
        let hasher = self.hasher.clone();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verification task failed")??;
        Ok(matched)
    }
}
