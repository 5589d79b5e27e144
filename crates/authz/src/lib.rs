//! Authentication primitives: password hashing, signed identity tokens and
//! the request gate that turns a bearer token into an [`Identity`].

pub mod gate;
pub mod password;
pub mod token;

pub use gate::{authenticate, require_identity, GateError};
pub use password::{PasswordError, PasswordHasher};
pub use token::{Claims, Identity, SigningError, TokenKeys, VerificationError};
