//! Backend variants.

pub mod drive;
pub mod memory;
pub mod s3;

pub use drive::{
    DriveConfig, DriveConnection, DriveCredentialStore, DriveCredentials, DriveProvider, DriveStore,
    MemoryDriveCredentials,
};
pub use memory::MemoryStore;
pub use s3::{S3Config, S3Store};
