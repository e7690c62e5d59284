pub mod endpoints;
pub mod error;
pub mod settings;

pub use endpoints::Endpoints;
pub use error::*;
pub use settings::{JenkinsContext, PrContext, Settings, host_arch};

use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "mlirci.yaml";

/// mlirci の設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 MLIRCI_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: mlirci.yaml
/// 3. ./.mlirci/ ディレクトリ内: mlirci.yaml
/// 4. ~/.config/mlirci/mlirci.yaml (グローバル設定)
///
/// 設定ファイルは任意なので、見つからなければ None
pub fn find_config_file() -> Option<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("MLIRCI_CONFIG") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("MLIRCI_CONFIG points to a missing file: {}", path.display());
    }

    let current_dir = std::env::current_dir().ok()?;

    // 2. カレントディレクトリ
    let path = current_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Some(path);
    }

    // 3. ./.mlirci/
    let path = current_dir.join(".mlirci").join(CONFIG_FILE_NAME);
    if path.exists() {
        return Some(path);
    }

    // 4. グローバル設定
    dirs::config_dir()
        .map(|dir| dir.join("mlirci").join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("mlirci.yaml"), "jenkins_user: ci\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("MLIRCI_CONFIG", find_config_file);
        assert!(result.unwrap().ends_with("mlirci.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_hidden_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let hidden = temp_dir.path().join(".mlirci");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("mlirci.yaml"), "jenkins_user: ci\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("MLIRCI_CONFIG", find_config_file);
        assert!(result.unwrap().ends_with(".mlirci/mlirci.yaml"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "jenkins_user: ci\n").unwrap();

        let result = temp_env::with_var("MLIRCI_CONFIG", Some(&config_path), find_config_file);
        assert_eq!(result, Some(config_path));
    }

    #[test]
    #[serial]
    fn test_discover_uses_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "jenkins_user: droid\n").unwrap();

        let endpoints = temp_env::with_var("MLIRCI_CONFIG", Some(&config_path), || {
            Endpoints::discover()
        })
        .unwrap();
        assert_eq!(endpoints.jenkins_user, "droid");
    }

    #[test]
    #[serial]
    fn test_settings_from_env() {
        let settings = temp_env::with_vars(
            [
                ("DOCKERHUB_USER_NAME", Some("onnxmlir")),
                ("ONNX_MLIR_PR_NUMBER", Some("1234")),
                ("CPU_ARCH", Some("amd64")),
            ],
            || Settings::from_env(Endpoints::default()),
        )
        .unwrap();

        assert_eq!(settings.require_dockerhub_user().unwrap(), "onnxmlir");
        assert_eq!(settings.require_pr_number().unwrap(), "1234");
        assert_eq!(settings.cpu_arch, "amd64");
    }
}
