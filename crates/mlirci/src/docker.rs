use anyhow::Context;
use mlirci_build::RegistryAuth;
use mlirci_config::Settings;

/// Docker デーモンに接続
pub fn connect(settings: &Settings) -> anyhow::Result<bollard::Docker> {
    let socket = settings.docker_socket.as_deref();
    mlirci_build::connect(socket).with_context(|| {
        format!(
            "Dockerデーモンに接続できません: {}",
            socket.unwrap_or("(デフォルト)")
        )
    })
}

/// レジストリ認証（Docker Hub のトークン優先、なければ config.json）
pub fn registry_auth(settings: &Settings) -> RegistryAuth {
    RegistryAuth::new().with_token(
        settings.dockerhub_user.as_deref(),
        settings.dockerhub_token.as_deref(),
    )
}
