//! Domain entities carried through the token lifecycle.

pub mod claims;
pub mod token;


// Re-export commonly used types
pub use claims::{
    is_reserved_claim, Claims, Payload, CLAIM_AUDIENCE, CLAIM_EXPIRES_AT, CLAIM_ID,
    CLAIM_ISSUED_AT, CLAIM_ISSUER, CLAIM_NOT_BEFORE, CLAIM_SUBJECT, RESERVED_CLAIMS,
};
pub use token::{
    Token, DEFAULT_SESSION_GRACE_SECONDS, DEFAULT_TOKEN_TTL_SECONDS, MAX_TOKEN_TTL_SECONDS,
};
