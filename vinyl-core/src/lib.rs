//! vinyl-core: errors, configuration and identity types shared by the
//! Vinyl crates.

pub mod config;
pub mod errors;
pub mod principal;

pub use config::{VinylConfig, VinylConfigSnapshot};
pub use errors::{ErrorKind, VinylError};
pub use principal::{Principal, RequestContext, SubjectId};
