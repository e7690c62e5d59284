//! Docker エンジンへの接続

use crate::error::BuildResult;
use bollard::{API_DEFAULT_VERSION, Docker};

const CONNECT_TIMEOUT_SECS: u64 = 120;

/// 接続先の種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonAddress {
    /// unix ソケットのパス
    Socket(String),
    /// tcp:// または http:// のエンドポイント
    Http(String),
    /// 環境のデフォルト（DOCKER_HOST かローカルソケット）
    LocalDefaults,
}

impl DaemonAddress {
    pub fn parse(socket: Option<&str>) -> Self {
        match socket.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::LocalDefaults,
            Some(s) if s.starts_with("tcp://") || s.starts_with("http://") => {
                Self::Http(s.to_string())
            }
            Some(s) => Self::Socket(s.strip_prefix("unix://").unwrap_or(s).to_string()),
        }
    }
}

/// DOCKER_DAEMON_SOCKET の値に従って接続
pub fn connect(socket: Option<&str>) -> BuildResult<Docker> {
    let address = DaemonAddress::parse(socket);
    tracing::debug!("Connecting to Docker daemon: {:?}", address);

    let docker = match address {
        DaemonAddress::Socket(path) => {
            Docker::connect_with_socket(&path, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
        }
        DaemonAddress::Http(url) => {
            Docker::connect_with_http(&url, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
        }
        DaemonAddress::LocalDefaults => Docker::connect_with_local_defaults()?,
    };

    Ok(docker)
}
