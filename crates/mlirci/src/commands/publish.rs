//! ビルド済みイメージの公開

use crate::docker;
use colored::Colorize;
use mlirci_build::{ImagePusher, ImageStore};
use mlirci_config::Settings;
use mlirci_core::{ImageKind, MergeableState, PublishOptions, ValidLabels, decide, repository};
use mlirci_remote::{GitHubClient, RegistryClient};

pub async fn handle(settings: &Settings) -> anyhow::Result<()> {
    let user = settings.require_dockerhub_user()?;
    let pr = settings.require_pr_number()?;
    let arch = settings.cpu_arch.as_str();

    let docker = docker::connect(settings)?;
    let store = ImageStore::new(docker.clone());
    let pusher = ImagePusher::new(docker, docker::registry_auth(settings));
    let github = GitHubClient::new(settings.github_token.clone())?;
    let endpoints = &settings.endpoints;
    let registry = RegistryClient::new(
        &endpoints.registry_auth_url,
        &endpoints.registry_url,
        &endpoints.registry_service,
    );

    println!("{}", "イメージの公開を判定中...".green());

    for kind in ImageKind::ALL {
        let options = PublishOptions::new(kind, settings.pr.phrase.clone(), pr);
        let repo = repository(user, kind);
        let local_tag = options.tag.tag();
        let local_ref = format!("{}:{}", repo, local_tag);

        println!();
        println!("{} {}", "▶".blue(), local_ref.cyan());

        // ローカルのラベルが読めない・不正なのはビルドの不具合なので中断
        let local = store
            .labels(&local_ref)
            .await?
            .validate(kind.family(), &local_ref)?;
        tracing::info!("local {} labels: {:?}", local_ref, local);

        let remote = remote_labels(&registry, kind, &repo, arch).await;
        let mergeable = pr_mergeable(settings, &github).await;

        let decision = decide(&local, remote.as_ref(), options.force(), mergeable);
        tracing::info!(
            "{} publish: {} ({})",
            local_ref,
            decision.publish,
            decision.reason
        );

        if !decision.publish {
            println!("  {} 公開しません: {}", "-".yellow(), decision.reason);
            continue;
        }

        println!("  {} 公開します: {}", "↑".green(), decision.reason);
        let pushed = pusher.publish(&repo, local_tag, arch).await?;
        println!("  {} {}", "✓".green(), pushed);
    }

    Ok(())
}

/// レジストリのラベル。取得失敗・不正は「無い」扱い
async fn remote_labels(
    registry: &RegistryClient,
    kind: ImageKind,
    repo: &str,
    arch: &str,
) -> Option<ValidLabels> {
    let image = format!("{}:{}", repo, arch);
    let labels = match registry.labels(repo, arch).await {
        Ok(labels) => labels,
        Err(e) => {
            tracing::info!("remote {} unavailable: {}", image, e);
            return None;
        }
    };

    match labels.validate(kind.family(), &image) {
        Ok(valid) => Some(valid),
        Err(e) => {
            tracing::info!("{}", e);
            None
        }
    }
}

/// PR がマージ可能か。push イベント（URL が none）は常に可能
async fn pr_mergeable(settings: &Settings, github: &GitHubClient) -> bool {
    let Some(pr_url) = settings.pr.request_url.as_deref() else {
        return true;
    };

    let state = match github.mergeable_state(pr_url).await {
        Ok(state) => state,
        Err(e) => {
            tracing::info!("Failed to get mergeable state: {}", e);
            MergeableState::Unknown
        }
    };

    tracing::info!("mergeable state: {}, {}", state, state.description());
    state.is_mergeable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use mlirci_config::Endpoints;
    use mlirci_config::settings::PR_REQUEST_URL;
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn settings(request_url: Option<&str>) -> Settings {
        let request_url = request_url.map(str::to_string);
        Settings::from_lookup(
            |name| {
                if name == PR_REQUEST_URL {
                    request_url.clone()
                } else {
                    None
                }
            },
            Endpoints::default(),
        )
        .unwrap()
    }

    async fn pull(Path(number): Path<u64>) -> impl IntoResponse {
        match number {
            1 => Json(json!({ "mergeable_state": "clean" })).into_response(),
            2 => Json(json!({ "mergeable_state": "dirty" })).into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    async fn github_base() -> String {
        let app = Router::new().route("/repos/onnx/onnx-mlir/pulls/{number}", get(pull));
        serve(app).await
    }

    #[tokio::test]
    async fn test_mergeable_without_request_url() {
        let github = GitHubClient::new(None).unwrap();
        assert!(pr_mergeable(&settings(None), &github).await);
        assert!(pr_mergeable(&settings(Some("none")), &github).await);
    }

    #[tokio::test]
    async fn test_mergeable_state_from_github() {
        let base = github_base().await;
        let github = GitHubClient::new(Some("droid".to_string())).unwrap();

        let clean = format!("{}/repos/onnx/onnx-mlir/pulls/1", base);
        assert!(pr_mergeable(&settings(Some(&clean)), &github).await);

        let dirty = format!("{}/repos/onnx/onnx-mlir/pulls/2", base);
        assert!(!pr_mergeable(&settings(Some(&dirty)), &github).await);
    }

    #[tokio::test]
    async fn test_mergeable_fetch_failure_blocks() {
        let base = github_base().await;
        let github = GitHubClient::new(Some("droid".to_string())).unwrap();

        let broken = format!("{}/repos/onnx/onnx-mlir/pulls/3", base);
        assert!(!pr_mergeable(&settings(Some(&broken)), &github).await);
    }

    async fn token() -> impl IntoResponse {
        Json(json!({ "token": "anonymous" }))
    }

    async fn manifest(Path((_user, _name, tag)): Path<(String, String, String)>) -> impl IntoResponse {
        let labels = match tag.as_str() {
            "amd64" => json!({
                "onnx_mlir_sha1": "c0ffee",
                "onnx_mlir_sha1_date": "2024-03-01T00:00:00Z",
                "onnx_mlir_dockerfile_sha1": "abc"
            }),
            // Dockerfile のハッシュが無い
            "ppc64le" => json!({
                "onnx_mlir_sha1": "c0ffee",
                "onnx_mlir_sha1_date": "2024-03-01T00:00:00Z"
            }),
            _ => return StatusCode::NOT_FOUND.into_response(),
        };
        let compat = json!({ "config": { "Labels": labels } });
        Json(json!({ "history": [{ "v1Compatibility": compat.to_string() }] })).into_response()
    }

    async fn registry() -> RegistryClient {
        let app = Router::new()
            .route("/token", get(token))
            .route("/v2/{user}/{name}/manifests/{tag}", get(manifest));
        let base = serve(app).await;
        RegistryClient::new(format!("{}/token", base), base, "registry.docker.io")
    }

    #[tokio::test]
    async fn test_remote_labels_valid() {
        let registry = registry().await;
        let labels = remote_labels(&registry, ImageKind::Dev, "onnxmlir/onnx-mlir-dev", "amd64")
            .await
            .unwrap();
        assert_eq!(labels.recipe_hash, "abc");
    }

    #[tokio::test]
    async fn test_remote_labels_missing_image_is_absent() {
        let registry = registry().await;
        let labels =
            remote_labels(&registry, ImageKind::Dev, "onnxmlir/onnx-mlir-dev", "s390x").await;
        assert!(labels.is_none());
    }

    #[tokio::test]
    async fn test_remote_labels_incomplete_is_absent() {
        let registry = registry().await;
        let labels =
            remote_labels(&registry, ImageKind::Dev, "onnxmlir/onnx-mlir-dev", "ppc64le").await;
        assert!(labels.is_none());

        // ファミリーが違うラベルも不正扱い
        let labels = remote_labels(
            &registry,
            ImageKind::Static,
            "onnxmlir/onnx-mlir-llvm-static",
            "amd64",
        )
        .await;
        assert!(labels.is_none());
    }
}
