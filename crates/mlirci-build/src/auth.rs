//! レジストリ認証処理
//!
//! DOCKERHUB_USER_NAME / DOCKERHUB_USER_TOKEN が渡されていればそれを使い、
//! なければ Docker config.json の auths から探します。

use crate::error::{BuildError, BuildResult};
use base64::Engine;
use bollard::auth::DockerCredentials;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Docker Hub として扱うレジストリ名
const DOCKER_HUB: &str = "docker.io";

/// config.json で Docker Hub が登録されうるキー
const DOCKER_HUB_KEYS: [&str; 3] = ["https://index.docker.io/v1/", "index.docker.io", "docker.io"];

/// ~/.docker/config.json のうち読む部分
#[derive(Debug, Default, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, ConfigAuth>,
}

#[derive(Debug, Deserialize)]
struct ConfigAuth {
    auth: Option<String>,
}

/// レジストリ認証を管理
#[derive(Debug)]
pub struct RegistryAuth {
    token: Option<(String, String)>,
    config_path: PathBuf,
}

impl Default for RegistryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryAuth {
    /// $DOCKER_CONFIG/config.json（未設定なら ~/.docker/config.json）を使う
    pub fn new() -> Self {
        let dir = match std::env::var_os("DOCKER_CONFIG") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir().unwrap_or_default().join(".docker"),
        };
        Self::with_config_path(dir.join("config.json"))
    }

    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self {
            token: None,
            config_path,
        }
    }

    /// Docker Hub のユーザーとアクセストークンを優先して使う
    pub fn with_token(mut self, user: Option<&str>, token: Option<&str>) -> Self {
        if let (Some(user), Some(token)) = (user, token) {
            self.token = Some((user.to_string(), token.to_string()));
        }
        self
    }

    /// イメージ名からレジストリの認証情報を取得
    ///
    /// 見つからなければ `Ok(None)`（匿名アクセス）
    pub fn get_credentials(&self, image: &str) -> BuildResult<Option<DockerCredentials>> {
        let registry = extract_registry(image);

        if registry == DOCKER_HUB
            && let Some((user, token)) = &self.token
        {
            tracing::debug!("Using token credentials for {}", registry);
            return Ok(Some(credentials(user, token, &registry)));
        }

        if !self.config_path.exists() {
            tracing::debug!("Docker config.json not found at {:?}", self.config_path);
            return Ok(None);
        }

        let config = self.load_docker_config()?;
        let keys: Vec<&str> = if registry == DOCKER_HUB {
            DOCKER_HUB_KEYS.to_vec()
        } else {
            vec![registry.as_str()]
        };

        for key in keys {
            if let Some(auth_b64) = config.auths.get(key).and_then(|e| e.auth.as_deref())
                && let Some(creds) = decode_auth(auth_b64, &registry)?
            {
                tracing::debug!("Found credentials in auths[{}]", key);
                return Ok(Some(creds));
            }
        }

        tracing::debug!("No credentials found for {}", registry);
        Ok(None)
    }

    fn load_docker_config(&self) -> BuildResult<DockerConfig> {
        let source = self.config_path.display().to_string();
        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| auth_failed(&source, format!("config.json を読めません: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| auth_failed(&source, format!("config.json が不正です: {}", e)))
    }
}

fn auth_failed(registry: &str, message: String) -> BuildError {
    BuildError::AuthFailed {
        registry: registry.to_string(),
        message,
    }
}

/// イメージ名からレジストリを抽出
///
/// - `onnxmlir/onnx-mlir-dev:amd64` -> `docker.io`
/// - `ghcr.io/org/app:tag` -> `ghcr.io`
/// - `localhost:5000/app` -> `localhost:5000`
pub fn extract_registry(image: &str) -> String {
    match image.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') => first.to_string(),
        _ => DOCKER_HUB.to_string(),
    }
}

fn credentials(user: &str, secret: &str, registry: &str) -> DockerCredentials {
    DockerCredentials {
        username: Some(user.to_string()),
        password: Some(secret.to_string()),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    }
}

/// config.json の `auth`（base64 の "user:password"）を展開
fn decode_auth(auth_b64: &str, registry: &str) -> BuildResult<Option<DockerCredentials>> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64.trim())
        .map_err(|e| auth_failed(registry, format!("auth の base64 が不正です: {}", e)))?;
    let pair = String::from_utf8(decoded)
        .map_err(|e| auth_failed(registry, format!("auth が UTF-8 ではありません: {}", e)))?;

    Ok(pair
        .split_once(':')
        .map(|(user, password)| credentials(user, password, registry)))
}
