//! vinyl-axum: HTTP surface of the Vinyl audio storage service.
//!
//! Bearer credentials are checked by the [`auth`] extractors, storage
//! operations go through the `StorageGateway` held in [`VinylAxumState`],
//! and object bytes leave through the [`RangeStreamer`].

pub mod app;
pub mod auth;
pub mod params;
pub mod rest;
pub mod state;
pub mod stream;
pub mod upload;
mod error;

pub use app::VinylApp;
pub use auth::{Authenticated, MaybeAuthenticated};
pub use error::VinylAxumError;
pub use state::VinylAxumState;
pub use stream::{Disposition, RangeStreamer};

pub use axum;
