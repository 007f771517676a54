//! Shared cryptographic primitives for identity services.
//!
//! - `jwt`: HS256 token pair issuance and strict validation

pub mod jwt;

pub use jwt::{
    AccessClaims, JwtConfig, JwtError, RefreshClaims, TokenIssuer, TokenPair, TokenSubject,
    TokenValidator, MAX_TOKEN_TTL,
};
