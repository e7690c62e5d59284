use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Image not found: {image}")]
    ImageNotFound { image: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Pull failed for {image}: {message}")]
    PullFailed { image: String, message: String },

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Registry auth failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Failed to read {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pattern not found in {path}: {pattern}")]
    PatternNotFound { path: PathBuf, pattern: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     リポジトリのルートで実行しているか確認してください。",
                    path.display()
                )
            }
            BuildError::BuildFailed(msg) => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileとビルド引数を確認してください。",
                    msg
                )
            }
            BuildError::SourceRead { path, source } => {
                format!(
                    "ファイルを読み込めません: {} ({})\n\
                     \n\
                     onnx-mlir のソースツリーのルートで実行しているか確認してください。",
                    path.display(),
                    source
                )
            }
            BuildError::ImageNotFound { image } => {
                format!(
                    "ローカルイメージが見つかりません: {}\n\
                     \n\
                     先に mlirci llvm / mlirci build を実行してください。",
                    image
                )
            }
            _ => format!("{}", self),
        }
    }

    /// Docker API の 404 か
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BuildError::ImageNotFound { .. }
                | BuildError::DockerConnection(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404,
                    ..
                })
        )
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
