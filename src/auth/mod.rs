/// Authentication module
///
/// Credential verification, the JWT codec, typed claims and the token
/// lifecycle engine that ties them to the session cache.

mod claims;
mod engine;
mod jwt;
mod password;

pub use claims::{Claims, TokenSubject, TokenType};
pub use engine::{TokenEngine, TokenPair, TokenTtls};
pub use jwt::TokenCodec;
pub use password::{hash_password, hash_password_with_cost, verify_password, CredentialError};
