//! mlirci Docker engine operations
//!
//! This crate talks to the Docker daemon on behalf of the CI stages:
//! build context creation, image builds with provenance build args,
//! label inspection, pull/tag/push with registry credentials, and
//! removal of the images and containers left behind by a pull request.

pub mod auth;
pub mod builder;
pub mod cleaner;
pub mod connect;
pub mod context;
pub mod error;
pub mod images;
pub mod progress;
pub mod puller;
pub mod pusher;
pub mod recipe;

pub use auth::RegistryAuth;
pub use builder::{BuildRequest, ImageBuilder};
pub use cleaner::{CleanupReport, ImageCleaner, OnError};
pub use connect::connect;
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use images::{ImageQuery, ImageStore};
pub use progress::TransferProgress;
pub use puller::ImagePuller;
pub use pusher::{ImagePusher, validate_tag};
