//! `farmlink-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: claims are
//! validated deterministically against an explicit clock, and the only IO-free
//! seam is the [`JwtValidator`] trait the API middleware consumes.

pub mod authorize;
pub mod claims;
pub mod roles;
pub mod token;

pub use authorize::{require_role, Principal};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use roles::Role;
pub use token::{Hs256JwtValidator, JwtValidator, TokenError};
