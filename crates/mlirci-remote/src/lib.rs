//! mlirci remote services
//!
//! REST clients for the three services the CI stages talk to:
//! the Docker registry (remote image labels), GitHub (mergeable state,
//! commit dates, PR comments) and Jenkins (superseded build cancellation).

pub mod error;
pub mod github;
pub mod jenkins;
pub mod registry;

pub use error::{RemoteError, Result};
pub use github::{Comment, GitHubClient, comments_url};
pub use jenkins::{BuildInfo, JenkinsClient, RunningBuild};
pub use registry::RegistryClient;
