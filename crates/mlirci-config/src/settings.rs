//! 実行時設定
//!
//! Jenkins がジョブに渡す環境変数をまとめて読み、明示的な構造体として
//! 各コマンドに渡す。PR 番号とアクションは `ONNX_MLIR_PR_NUMBER` /
//! `ONNX_MLIR_PR_ACTION` に統一している。

use crate::endpoints::Endpoints;
use crate::error::{ConfigError, Result};
use mlirci_core::{BuildResult, PrAction, TriggerPhrase};

pub const DOCKER_DAEMON_SOCKET: &str = "DOCKER_DAEMON_SOCKET";
pub const CPU_ARCH: &str = "CPU_ARCH";
pub const DOCKERHUB_USER_NAME: &str = "DOCKERHUB_USER_NAME";
pub const DOCKERHUB_USER_TOKEN: &str = "DOCKERHUB_USER_TOKEN";
pub const GITHUB_TOKEN: &str = "GITHUB_JENKINS_DROID_TOKEN";
pub const JENKINS_REST_API_TOKEN: &str = "JENKINS_REST_API_TOKEN";
pub const JENKINS_HOME: &str = "JENKINS_HOME";
pub const JENKINS_JOB_NAME: &str = "JOB_NAME";
pub const JENKINS_BUILD_NUMBER: &str = "BUILD_NUMBER";
pub const JENKINS_BUILD_RESULT: &str = "JENKINS_BUILD_RESULT";
pub const PR_NUMBER: &str = "ONNX_MLIR_PR_NUMBER";
pub const PR_ACTION: &str = "ONNX_MLIR_PR_ACTION";
pub const PR_MERGED: &str = "ONNX_MLIR_PR_MERGED";
pub const PR_PHRASE: &str = "ONNX_MLIR_PR_PHRASE";
pub const PR_REQUEST_URL: &str = "ONNX_MLIR_PR_REQUEST_URL";

/// Jenkins ジョブのコンテキスト
#[derive(Debug, Clone, Default)]
pub struct JenkinsContext {
    pub api_token: Option<String>,
    pub home: Option<String>,
    pub job_name: Option<String>,
    pub build_number: Option<u64>,
    pub build_result: BuildResult,
}

/// ビルド対象の PR
#[derive(Debug, Clone)]
pub struct PrContext {
    pub number: Option<String>,
    pub action: Option<PrAction>,
    pub merged: bool,
    pub phrase: TriggerPhrase,
    /// PR の API URL。push イベントでは None（環境変数値 `none`）
    pub request_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub docker_socket: Option<String>,
    /// レジストリ上のアーキテクチャタグ（amd64, s390x, ...）
    pub cpu_arch: String,
    pub dockerhub_user: Option<String>,
    pub dockerhub_token: Option<String>,
    pub github_token: Option<String>,
    pub jenkins: JenkinsContext,
    pub pr: PrContext,
    pub endpoints: Endpoints,
}

impl Settings {
    /// プロセスの環境変数から作成
    pub fn from_env(endpoints: Endpoints) -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), endpoints)
    }

    /// 任意の変数ソースから作成（空文字列は未設定扱い）
    pub fn from_lookup<F>(lookup: F, endpoints: Endpoints) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let build_number = match get(JENKINS_BUILD_NUMBER) {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue {
                    name: JENKINS_BUILD_NUMBER.to_string(),
                    value,
                }
            })?),
            None => None,
        };

        let merged = match get(PR_MERGED) {
            Some(value) => parse_bool(PR_MERGED, &value)?,
            None => false,
        };

        let request_url = get(PR_REQUEST_URL).filter(|url| url != "none");

        Ok(Self {
            docker_socket: get(DOCKER_DAEMON_SOCKET),
            cpu_arch: get(CPU_ARCH).unwrap_or_else(|| host_arch().to_string()),
            dockerhub_user: get(DOCKERHUB_USER_NAME),
            dockerhub_token: get(DOCKERHUB_USER_TOKEN),
            github_token: get(GITHUB_TOKEN),
            jenkins: JenkinsContext {
                api_token: get(JENKINS_REST_API_TOKEN),
                home: get(JENKINS_HOME),
                job_name: get(JENKINS_JOB_NAME),
                build_number,
                build_result: get(JENKINS_BUILD_RESULT)
                    .map(|v| BuildResult::parse(&v))
                    .unwrap_or_default(),
            },
            pr: PrContext {
                number: get(PR_NUMBER),
                action: get(PR_ACTION).map(|v| PrAction::parse(&v)),
                merged,
                phrase: get(PR_PHRASE)
                    .map(|v| TriggerPhrase::parse(&v))
                    .unwrap_or_else(|| TriggerPhrase::Other(String::new())),
                request_url,
            },
            endpoints,
        })
    }

    pub fn require_dockerhub_user(&self) -> Result<&str> {
        require(self.dockerhub_user.as_deref(), DOCKERHUB_USER_NAME)
    }

    pub fn require_pr_number(&self) -> Result<&str> {
        require(self.pr.number.as_deref(), PR_NUMBER)
    }

    pub fn require_jenkins_token(&self) -> Result<&str> {
        require(self.jenkins.api_token.as_deref(), JENKINS_REST_API_TOKEN)
    }

    pub fn require_job_name(&self) -> Result<&str> {
        require(self.jenkins.job_name.as_deref(), JENKINS_JOB_NAME)
    }

    pub fn require_build_number(&self) -> Result<u64> {
        self.jenkins
            .build_number
            .ok_or_else(|| ConfigError::MissingEnvVar(JENKINS_BUILD_NUMBER.to_string()))
    }

    pub fn require_jenkins_home(&self) -> Result<&str> {
        require(self.jenkins.home.as_deref(), JENKINS_HOME)
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value.ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// ホストのアーキテクチャをレジストリのタグ名に変換
///
/// `uname -m` の x86_64 は amd64 として公開している。
pub fn host_arch() -> &'static str {
    arch_tag(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

fn arch_tag(arch: &'static str, little_endian: bool) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "powerpc64" if little_endian => "ppc64le",
        other => other,
    }
}
