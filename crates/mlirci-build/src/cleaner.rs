//! PR に紐づくイメージとコンテナの削除

use crate::error::{BuildError, BuildResult};
use crate::images::{ImageQuery, ImageStore};
use bollard::Docker;
use mlirci_core::provenance::pr_label_filter;
use std::collections::HashMap;

/// 削除失敗の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// 最初の失敗で中断
    Abort,
    /// ログに残して続行（中断されたビルドがエンジン側の後始末と競合するため）
    Ignore,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub containers_removed: usize,
    pub images_removed: usize,
    pub failures: usize,
}

pub struct ImageCleaner {
    docker: Docker,
    store: ImageStore,
    on_error: OnError,
}

impl ImageCleaner {
    pub fn new(docker: Docker, on_error: OnError) -> Self {
        Self {
            store: ImageStore::new(docker.clone()),
            docker,
            on_error,
        }
    }

    /// `onnx_mlir_pr_number=<pr>` のラベルを持つイメージ
    pub async fn pr_images(&self, pr_number: &str, dangling: bool, all: bool) -> BuildResult<Vec<String>> {
        let query = ImageQuery::label(pr_label_filter(pr_number))
            .dangling(dangling)
            .all(all);
        self.store.find(&query).await
    }

    /// 各イメージについて、それを祖先とするコンテナを消してからイメージを消す
    ///
    /// イメージ ID の代わりに `repo:tag` を渡すとタグだけ外れる。
    pub async fn remove_all(&self, images: &[String]) -> BuildResult<CleanupReport> {
        let mut report = CleanupReport::default();

        for image in images {
            for container in self.dependent_containers(image).await? {
                tracing::info!("Removing container {}", container);
                match self.remove_container(&container).await {
                    Ok(()) => report.containers_removed += 1,
                    Err(e) => self.record_failure(&mut report, e)?,
                }
            }

            tracing::info!("Removing image {}", image);
            match self.store.remove(image).await {
                Ok(()) => report.images_removed += 1,
                Err(e) => self.record_failure(&mut report, e)?,
            }
        }

        Ok(report)
    }

    async fn dependent_containers(&self, image: &str) -> BuildResult<Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert("ancestor".to_string(), vec![image.to_string()]);

        #[allow(deprecated)]
        let options = bollard::container::ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = match self.docker.list_containers(Some(options)).await {
            Ok(containers) => containers,
            // 既に消えたイメージは ancestor フィルタが 404 を返すことがある
            Err(e) if self.on_error == OnError::Ignore => {
                tracing::info!("Listing containers for {} failed: {}", image, e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(BuildError::DockerConnection(e)),
        };

        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    async fn remove_container(&self, id: &str) -> BuildResult<()> {
        self.docker
            .remove_container(
                id,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    v: true,
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    fn record_failure(&self, report: &mut CleanupReport, error: BuildError) -> BuildResult<()> {
        match self.on_error {
            OnError::Abort => Err(error),
            OnError::Ignore => {
                tracing::info!("Ignoring cleanup failure: {}", error);
                report.failures += 1;
                Ok(())
            }
        }
    }
}
