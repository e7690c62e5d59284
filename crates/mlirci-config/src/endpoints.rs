//! 外部サービスのエンドポイント設定
//!
//! YAML ファイルで上書きできる。ファイルが無ければ組み込みのデフォルトを使う。
//!
//! ```yaml
//! registry_auth_url: https://auth.docker.io/token
//! registry_url: https://registry-1.docker.io
//! github_api_url: https://api.github.com
//! jenkins_url: http://localhost:8080/jenkins
//! jenkins_user: jenkins
//! toolchain_repo: llvm/llvm-project
//! ```

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// レジストリのトークン発行 URL
    pub registry_auth_url: String,
    /// レジストリ API のベース URL
    pub registry_url: String,
    /// レジストリのサービス名（トークン要求の `service` パラメータ）
    pub registry_service: String,
    pub github_api_url: String,
    pub jenkins_url: String,
    pub jenkins_user: String,
    /// llvm-project の GitHub リポジトリ（owner/name）
    pub toolchain_repo: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            registry_auth_url: "https://auth.docker.io/token".to_string(),
            registry_url: "https://registry-1.docker.io".to_string(),
            registry_service: "registry.docker.io".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            jenkins_url: "http://localhost:8080/jenkins".to_string(),
            jenkins_user: "jenkins".to_string(),
            toolchain_repo: "llvm/llvm-project".to_string(),
        }
    }
}

impl Endpoints {
    /// YAML ファイルから読み込み（未指定のキーはデフォルト）
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let endpoints: Endpoints =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Loaded endpoints from {}", path.display());
        Ok(endpoints)
    }

    /// 設定ファイルを探して読み込む。見つからなければデフォルト
    pub fn discover() -> Result<Self> {
        match crate::find_config_file() {
            Some(path) => Self::load(&path),
            None => {
                tracing::debug!("No mlirci config file found, using default endpoints");
                Ok(Self::default())
            }
        }
    }

    /// llvm-project の GitHub API URL（`/repos/<owner>/<name>`）
    pub fn toolchain_repo_api(&self) -> String {
        format!(
            "{}/repos/{}",
            self.github_api_url.trim_end_matches('/'),
            self.toolchain_repo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.jenkins_user, "jenkins");
        assert_eq!(
            endpoints.toolchain_repo_api(),
            "https://api.github.com/repos/llvm/llvm-project"
        );
    }

    #[test]
    fn test_load_partial_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mlirci.yaml");
        fs::write(
            &path,
            "jenkins_url: http://ci.example.com/jenkins\nregistry_url: http://127.0.0.1:5000\n",
        )
        .unwrap();

        let endpoints = Endpoints::load(&path).unwrap();
        assert_eq!(endpoints.jenkins_url, "http://ci.example.com/jenkins");
        assert_eq!(endpoints.registry_url, "http://127.0.0.1:5000");
        // 未指定はデフォルト
        assert_eq!(endpoints.registry_auth_url, "https://auth.docker.io/token");
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("mlirci.yaml");
        fs::write(&path, "jenkins_url: [unclosed").unwrap();

        assert!(matches!(
            Endpoints::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Endpoints::load(Path::new("/nonexistent/mlirci.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
