//! イメージの取得

use crate::auth::RegistryAuth;
use crate::error::{BuildError, BuildResult};
use crate::progress::TransferProgress;
use bollard::Docker;
use futures_util::StreamExt;

pub struct ImagePuller {
    docker: Docker,
    auth: RegistryAuth,
}

impl ImagePuller {
    pub fn new(docker: Docker, auth: RegistryAuth) -> Self {
        Self { docker, auth }
    }

    /// `repo:tag` を pull する
    pub async fn pull(&self, repo: &str, tag: &str) -> BuildResult<()> {
        let full_image = format!("{}:{}", repo, tag);
        let credentials = self.auth.get_credentials(&full_image)?;

        tracing::info!("Pulling {}", full_image);
        let progress = TransferProgress::new("Pulling", &full_image);

        #[allow(deprecated)]
        let options = bollard::image::CreateImageOptions {
            from_image: repo,
            tag,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, credentials);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(detail) = info.error_detail {
                        let message = detail.message.unwrap_or_else(|| "unknown error".to_string());
                        progress.finish_error(&message);
                        return Err(BuildError::PullFailed {
                            image: full_image,
                            message,
                        });
                    }
                    if let Some(status) = info.status.as_deref() {
                        progress.update(info.id.as_deref(), status, info.progress.as_deref());
                        if status == "Pull complete" || status.starts_with("Digest:") {
                            tracing::debug!("{}: {}", info.id.as_deref().unwrap_or("-"), status);
                        }
                    }
                }
                Err(e) => {
                    progress.finish_error(&e.to_string());
                    return Err(BuildError::PullFailed {
                        image: full_image,
                        message: e.to_string(),
                    });
                }
            }
        }

        progress.finish_success(&format!("Pulled {}", full_image));
        Ok(())
    }
}
