//! イメージプッシュ処理
//!
//! ローカルのイメージにアーキテクチャ名のタグを付けてレジストリへ送り、
//! 送信後はそのタグを外します。

use crate::auth::RegistryAuth;
use crate::error::{BuildError, BuildResult};
use crate::images::ImageStore;
use crate::progress::TransferProgress;
use bollard::Docker;
use bollard::models::PushImageInfo;
use colored::Colorize;
use futures_util::StreamExt;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
    auth: RegistryAuth,
}

impl ImagePusher {
    pub fn new(docker: Docker, auth: RegistryAuth) -> Self {
        Self { docker, auth }
    }

    /// `repo:local_tag` を `repo:arch` として公開する
    ///
    /// `repo:arch` のタグは push の成否に関わらず削除する。
    pub async fn publish(&self, repo: &str, local_tag: &str, arch: &str) -> BuildResult<String> {
        validate_tag(local_tag)?;
        validate_tag(arch)?;

        let store = ImageStore::new(self.docker.clone());
        let source = format!("{}:{}", repo, local_tag);
        store.tag(&source, repo, arch).await?;

        let pushed = self.push(repo, arch).await;

        let arch_image = format!("{}:{}", repo, arch);
        if let Err(e) = store.remove(&arch_image).await {
            tracing::warn!("Failed to remove tag {}: {}", arch_image, e);
        }

        pushed
    }

    /// `repo:tag` をレジストリにプッシュ
    pub async fn push(&self, repo: &str, tag: &str) -> BuildResult<String> {
        let full_image = format!("{}:{}", repo, tag);
        validate_tag(tag)?;

        let credentials = self.auth.get_credentials(&full_image)?;

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };

        println!("  → {}", full_image.cyan());
        let progress = TransferProgress::new("Pushing", &full_image);

        let mut stream = self.docker.push_image(repo, Some(options), credentials);
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(message) = push_error(&info) {
                        error_message = Some(message);
                    } else {
                        report_progress(&progress, &info);
                    }
                }
                Err(e) => {
                    progress.finish_error(&e.to_string());
                    return Err(BuildError::PushFailed {
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(message) = error_message {
            progress.finish_error(&message);
            return Err(BuildError::PushFailed { message });
        }

        progress.finish_success(&format!("Pushed {}", full_image));
        tracing::info!("Pushed {}", full_image);
        Ok(full_image)
    }
}

fn push_error(info: &PushImageInfo) -> Option<String> {
    info.error.clone().filter(|e| !e.is_empty())
}

fn report_progress(progress: &TransferProgress, info: &PushImageInfo) {
    let Some(status) = info.status.as_deref() else {
        return;
    };

    match status {
        // 準備中はノイズになるので表示しない
        "Preparing" | "Waiting" => {}
        "Pushed" | "Layer already exists" => {
            progress.println(&format!("  {} {}", "✓".green(), status));
        }
        _ => progress.update(None, status, info.progress.as_deref()),
    }
}

/// タグのバリデーション
///
/// Docker タグは 128 文字以下の英数字・`.`・`-`・`_` で、
/// 先頭は `.` / `-` 以外。
pub fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_'))
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("1234").is_ok());
        assert!(validate_tag("master").is_ok());
        assert!(validate_tag("amd64").is_ok());
        assert!(validate_tag("ppc64le").is_ok());
        assert!(validate_tag("").is_err());
        assert!(validate_tag("-1").is_err());
        assert!(validate_tag("pr/1234").is_err());
        assert!(validate_tag(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_push_error() {
        let info = PushImageInfo {
            error: Some("denied: requested access to the resource is denied".to_string()),
            ..Default::default()
        };
        assert_eq!(
            push_error(&info).as_deref(),
            Some("denied: requested access to the resource is denied")
        );

        let ok = PushImageInfo {
            status: Some("Pushed".to_string()),
            ..Default::default()
        };
        assert!(push_error(&ok).is_none());
    }
}
