//! ローカルイメージの参照・タグ付け・削除

use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use mlirci_core::LabelSet;
use std::collections::HashMap;

/// イメージ検索の条件
#[derive(Debug, Clone, Default)]
pub struct ImageQuery {
    /// `repo:tag` で絞り込む
    pub reference: Option<String>,
    /// `key=value` のラベル条件（すべて満たすもの）
    pub labels: Vec<String>,
    /// タグの外れたイメージだけ
    pub dangling: bool,
    /// 中間イメージも含める
    pub all: bool,
}

impl ImageQuery {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            labels: vec![label.into()],
            ..Default::default()
        }
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels.extend(labels);
        self
    }

    pub fn dangling(mut self, dangling: bool) -> Self {
        self.dangling = dangling;
        self
    }

    pub fn all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Docker API の filters パラメータ
    pub fn filters(&self) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        if let Some(reference) = &self.reference {
            filters.insert("reference".to_string(), vec![reference.clone()]);
        }
        if !self.labels.is_empty() {
            filters.insert("label".to_string(), self.labels.clone());
        }
        if self.dangling {
            filters.insert("dangling".to_string(), vec!["true".to_string()]);
        }
        filters
    }
}

pub struct ImageStore {
    docker: Docker,
}

impl ImageStore {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージのラベル。イメージが無ければ ImageNotFound
    pub async fn labels(&self, reference: &str) -> BuildResult<LabelSet> {
        let inspect = self
            .docker
            .inspect_image(reference)
            .await
            .map_err(|e| not_found_or(e, reference))?;

        let labels = inspect
            .config
            .and_then(|config| config.labels)
            .unwrap_or_default();

        tracing::debug!("{} labels: {:?}", reference, labels);
        Ok(LabelSet::from(labels))
    }

    /// `sha256:` 付きの ID の先頭 19 文字
    pub async fn short_id(&self, reference: &str) -> BuildResult<String> {
        let inspect = self
            .docker
            .inspect_image(reference)
            .await
            .map_err(|e| not_found_or(e, reference))?;

        let id = inspect.id.unwrap_or_default();
        Ok(id.chars().take(19).collect())
    }

    /// 条件に合うイメージの ID 一覧
    pub async fn find(&self, query: &ImageQuery) -> BuildResult<Vec<String>> {
        let options = bollard::query_parameters::ListImagesOptions {
            all: query.all,
            filters: Some(query.filters()),
            ..Default::default()
        };

        let images = self.docker.list_images(Some(options)).await?;
        tracing::debug!("Found {} images for {:?}", images.len(), query);

        Ok(images.into_iter().map(|image| image.id).collect())
    }

    /// `source` に `repo:tag` を付ける
    pub async fn tag(&self, source: &str, repo: &str, tag: &str) -> BuildResult<()> {
        tracing::debug!("Tagging {} as {}:{}", source, repo, tag);

        #[allow(deprecated)]
        let options = bollard::image::TagImageOptions {
            repo: repo.to_string(),
            tag: tag.to_string(),
        };

        self.docker
            .tag_image(source, Some(options))
            .await
            .map_err(|e| not_found_or(e, source))?;

        Ok(())
    }

    /// イメージ（またはタグ）を強制削除
    pub async fn remove(&self, reference: &str) -> BuildResult<()> {
        let options = bollard::query_parameters::RemoveImageOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_image(reference, Some(options), None)
            .await
            .map_err(|e| not_found_or(e, reference))?;

        tracing::debug!("Removed image {}", reference);
        Ok(())
    }
}

fn not_found_or(error: bollard::errors::Error, reference: &str) -> BuildError {
    match error {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        } => BuildError::ImageNotFound {
            image: reference.to_string(),
        },
        e => BuildError::DockerConnection(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_reference_and_labels() {
        let query = ImageQuery::reference("onnxmlir/onnx-mlir-llvm-static:1234").with_labels(vec![
            "llvm_project_sha1=29b92d07".to_string(),
            "llvm_project_dockerfile_sha1=0123abcd".to_string(),
        ]);
        let filters = query.filters();

        assert_eq!(
            filters["reference"],
            vec!["onnxmlir/onnx-mlir-llvm-static:1234"]
        );
        assert_eq!(filters["label"].len(), 2);
        assert!(!filters.contains_key("dangling"));
    }

    #[test]
    fn test_filters_dangling() {
        let filters = ImageQuery::label("onnx_mlir_pr_number=1234")
            .dangling(true)
            .filters();

        assert_eq!(filters["label"], vec!["onnx_mlir_pr_number=1234"]);
        assert_eq!(filters["dangling"], vec!["true"]);
        assert!(!filters.contains_key("reference"));
    }

    #[test]
    fn test_not_found_mapping() {
        let err = not_found_or(
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message: "No such image".to_string(),
            },
            "onnxmlir/onnx-mlir-dev:1234",
        );
        assert!(matches!(err, BuildError::ImageNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要
    async fn test_missing_image_labels() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let store = ImageStore::new(docker);
        let result = store.labels("mlirci-test/does-not-exist:0").await;
        assert!(matches!(result, Err(BuildError::ImageNotFound { .. })));
    }
}
