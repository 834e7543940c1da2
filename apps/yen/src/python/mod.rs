//! Standalone Python runtime acquisition.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS, architecture and libc detection
//! - [`catalog`] - Release data fetching and per-platform filtering
//! - [`resolver`] - Version prefix matching
//! - [`download`] - HTTP download with progress and retries
//! - [`verify`] - SHA256 checksum verification
//! - [`archive`] - tar.gz extraction
//! - [`store`] - Idempotent install of a runtime under the runtimes root

pub mod archive;
pub mod catalog;
pub mod download;
pub mod platform;
pub mod resolver;
pub mod store;
pub mod verify;

pub use platform::PlatformProfile;
pub use store::RuntimeStore;
