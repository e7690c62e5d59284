use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use bytes::Bytes;
use colored::Colorize;
use futures_util::stream::StreamExt;
use http_body_util::{Either, Full};
use std::collections::HashMap;

/// ビルド 1 回分の指定
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// コンテキスト内の Dockerfile の相対パス
    pub dockerfile: String,
    /// `repo:tag`
    pub tag: String,
    pub build_args: HashMap<String, String>,
}

pub struct ImageBuilder {
    docker: Docker,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// イメージをビルドし、ビルド出力をそのまま標準出力に流す
    pub async fn build_image(&self, context_data: Vec<u8>, request: &BuildRequest) -> BuildResult<()> {
        tracing::info!("Building image: {} ({})", request.tag, request.dockerfile);
        tracing::debug!("Build args: {:?}", request.build_args);

        let build_args: HashMap<&str, &str> = request
            .build_args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        // BASE_IMAGE はローカルにしかないタグなので pull しない
        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions {
            dockerfile: request.dockerfile.as_str(),
            t: request.tag.as_str(),
            buildargs: build_args,
            rm: true,
            forcerm: true,
            pull: false,
            ..Default::default()
        };

        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        while let Some(msg) = stream.next().await {
            let output = msg.map_err(BuildError::DockerConnection)?;
            handle_build_output(output)?;
        }

        tracing::info!("Successfully built: {}", request.tag);
        Ok(())
    }
}

fn handle_build_output(output: bollard::models::BuildInfo) -> BuildResult<()> {
    if let Some(error_detail) = output.error_detail {
        let error_msg = error_detail
            .message
            .or(output.error)
            .unwrap_or_else(|| "Unknown build error".to_string());
        return Err(BuildError::BuildFailed(error_msg));
    }

    if let Some(error) = output.error {
        return Err(BuildError::BuildFailed(error));
    }

    if let Some(stream) = output.stream {
        print!("{}", stream);
    }

    if let Some(status) = output.status {
        println!("{}", status.cyan());
    }

    Ok(())
}
