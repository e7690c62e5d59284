//! ビルド前のクリーンアップ

use crate::docker;
use colored::Colorize;
use mlirci_build::{ImageCleaner, OnError};
use mlirci_config::Settings;
use mlirci_core::cleanup::{removes_workspace, workspace_pattern};
use mlirci_core::{PrAction, prepare_scope};
use std::path::PathBuf;

pub async fn handle(settings: &Settings) -> anyhow::Result<()> {
    let pr = settings.require_pr_number()?;
    let action = settings
        .pr
        .action
        .clone()
        .unwrap_or_else(|| PrAction::Other(String::new()));
    let scope = prepare_scope(&action);

    println!(
        "{} PR #{} ({}) のイメージを掃除中...",
        "▶".blue(),
        pr,
        action
    );
    tracing::info!("Pre-build cleanup for #{}: action={}, scope={:?}", pr, action, scope);

    let docker = docker::connect(settings)?;
    let cleaner = ImageCleaner::new(docker, OnError::Abort);
    let images = cleaner.pr_images(pr, scope.dangling_only(), true).await?;
    let report = cleaner.remove_all(&images).await?;

    println!(
        "  {} コンテナ {} 件、イメージ {} 件を削除",
        "✓".green(),
        report.containers_removed,
        report.images_removed
    );

    if removes_workspace(&action) {
        let home = settings.require_jenkins_home()?;
        let job = settings.require_job_name()?;
        let removed = remove_workspaces(&workspace_pattern(home, job, pr))?;
        println!("  {} ワークスペース {} 件を削除", "✓".green(), removed.len());
    }

    Ok(())
}

/// glob に一致する Jenkins ワークスペースを削除
pub fn remove_workspaces(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in glob::glob(pattern)? {
        let path = entry?;
        tracing::info!("Removing workspace {}", path.display());
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
        removed.push(path);
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_remove_workspaces() {
        let home = tempdir().unwrap();
        let workspace = home.path().join("workspace");
        for dir in ["onnx-mlir-pr@pr_1234", "onnx-mlir-pr@pr_1234@tmp", "onnx-mlir-pr@pr_999"] {
            fs::create_dir_all(workspace.join(dir).join("build")).unwrap();
        }

        let pattern = workspace_pattern(home.path().to_str().unwrap(), "onnx-mlir-pr", "1234");
        let removed = remove_workspaces(&pattern).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(!workspace.join("onnx-mlir-pr@pr_1234").exists());
        assert!(!workspace.join("onnx-mlir-pr@pr_1234@tmp").exists());
        assert!(workspace.join("onnx-mlir-pr@pr_999").exists());
    }

    #[test]
    fn test_remove_workspaces_no_match() {
        let home = tempdir().unwrap();
        let pattern = workspace_pattern(home.path().to_str().unwrap(), "onnx-mlir-pr", "1");
        assert!(remove_workspaces(&pattern).unwrap().is_empty());
    }
}
