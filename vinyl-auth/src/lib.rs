//! vinyl-auth: turns a presented bearer credential into a `Principal`.
//!
//! ```rust,no_run
//! use vinyl_auth::{CredentialValidator, JwtOptions};
//!
//! let options = JwtOptions::builder()
//!     .issuer("https://project.supabase.co/auth/v1")
//!     .audience(["authenticated"])
//!     .role("authenticated")
//!     .secret("change-me")
//!     .build();
//!
//! let validator = CredentialValidator::new(options)?;
//! let principal = validator.validate(Some("Bearer eyJhbGciOi..."))?;
//! println!("hello {}", principal.display_label);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod error;
pub mod issuer;
pub mod options;
pub mod validator;

pub use error::AuthError;
pub use issuer::TokenIssuer;
pub use options::{JwtAlgorithm, JwtOptions, JwtOptionsBuilder};
pub use validator::{authorization_header, extract_bearer_token, CredentialValidator};
