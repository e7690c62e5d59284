//! ビルド後のクリーンアップ

use crate::docker;
use colored::Colorize;
use mlirci_build::{ImageCleaner, OnError};
use mlirci_config::Settings;
use mlirci_core::cleanup::untag_targets;
use mlirci_core::{CleanupScope, PrAction, post_build_scope};

pub async fn handle(settings: &Settings) -> anyhow::Result<()> {
    let pr = settings.require_pr_number()?;
    let result = settings.jenkins.build_result;
    let action = settings
        .pr
        .action
        .clone()
        .unwrap_or_else(|| PrAction::Other(String::new()));
    let merged = settings.pr.merged;
    let scope = post_build_scope(result, &action, merged);

    tracing::info!(
        "Docker cleanup for pull request: #{}, build result: {}, action: {}, merged: {}, scope: {:?}",
        pr,
        result,
        action,
        merged,
        scope
    );

    if scope == CleanupScope::Skip {
        println!("{} ビルド失敗のため掃除しません（デバッグ用に残します）", "-".yellow());
        return Ok(());
    }

    let docker = docker::connect(settings)?;
    let cleaner = ImageCleaner::new(docker, OnError::Ignore);
    let mut images = cleaner.pr_images(pr, scope.dangling_only(), false).await?;

    if scope == CleanupScope::Full {
        // 再タグしただけのツールチェーンイメージは PR ラベルを持たない
        let user = settings.require_dockerhub_user()?;
        images.extend(untag_targets(user, pr));
    }

    let report = cleaner.remove_all(&images).await?;
    println!(
        "{} コンテナ {} 件、イメージ {} 件を削除（失敗 {} 件は無視）",
        "✓".green(),
        report.containers_removed,
        report.images_removed,
        report.failures
    );

    Ok(())
}
