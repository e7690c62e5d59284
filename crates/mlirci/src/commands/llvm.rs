//! llvm-project ツールチェーンイメージの準備

use crate::docker;
use colored::Colorize;
use mlirci_build::recipe::{file_sha1, toolchain_commit};
use mlirci_build::{
    BuildRequest, ContextBuilder, ImageBuilder, ImagePuller, ImageQuery, ImageStore,
};
use mlirci_config::Settings;
use mlirci_core::{
    CoreError, ImageKind, LabelSet, PlanInput, ToolchainPlan, ToolchainProvenance, plan_toolchain,
    repository,
};
use mlirci_remote::{GitHubClient, RegistryClient, comments_url};
use std::path::Path;

pub async fn handle(settings: &Settings, source_root: &Path) -> anyhow::Result<()> {
    let user = settings.require_dockerhub_user()?;
    let pr = settings.require_pr_number()?;
    let arch = settings.cpu_arch.as_str();

    let github = GitHubClient::new(settings.github_token.clone())?;
    let expected = expected_provenance(settings, &github, source_root).await?;

    println!("{}", "ツールチェーンイメージを準備中...".green());
    println!("  commit: {}", expected.commit.cyan());
    println!(
        "  date:   {}",
        if expected.commit_date.is_empty() {
            "(不明)".yellow()
        } else {
            expected.commit_date.cyan()
        }
    );
    println!("  recipe: {}", expected.recipe_hash.cyan());

    let docker = docker::connect(settings)?;
    let store = ImageStore::new(docker.clone());
    let puller = ImagePuller::new(docker.clone(), docker::registry_auth(settings));
    let builder = ImageBuilder::new(docker);
    let endpoints = &settings.endpoints;
    let registry = RegistryClient::new(
        &endpoints.registry_auth_url,
        &endpoints.registry_url,
        &endpoints.registry_service,
    );

    for kind in ImageKind::TOOLCHAIN {
        let repo = repository(user, kind);
        let local_ref = format!("{}:{}", repo, pr);
        println!();
        println!("{} {}", "▶".blue(), local_ref.cyan());

        let query = ImageQuery::reference(&local_ref).with_labels(expected.label_filters());
        let local_match = !store.find(&query).await?.is_empty();

        let remote = if local_match {
            None
        } else {
            match registry.labels(&repo, arch).await {
                Ok(labels) => Some(labels),
                Err(e) => {
                    tracing::info!("remote {}:{} unavailable: {}", repo, arch, e);
                    None
                }
            }
        };

        let plan = decide_plan(&expected, local_match, remote.as_ref(), false);
        let plan = match plan {
            Ok(ToolchainPlan::Pull) => match pull_and_retag(&puller, &store, &repo, arch, pr).await {
                Ok(()) => Ok(ToolchainPlan::Pull),
                Err(e) => {
                    tracing::warn!("Pull of {}:{} failed: {}", repo, arch, e);
                    decide_plan(&expected, local_match, remote.as_ref(), true)
                }
            },
            other => other,
        };

        match plan {
            Ok(ToolchainPlan::Reuse) => {
                let id = store.short_id(&local_ref).await?;
                println!("  {} ローカルイメージを再利用 ({})", "✓".green(), id);
            }
            Ok(ToolchainPlan::Pull) => {
                let id = store.short_id(&local_ref).await?;
                println!(
                    "  {} {}:{} を pull して {} としてタグ付け ({})",
                    "✓".green(),
                    repo,
                    arch,
                    pr,
                    id
                );
            }
            Ok(ToolchainPlan::Build) => {
                build(&builder, &store, source_root, kind, &expected, &local_ref, pr).await?;
            }
            Err(e @ CoreError::SourceOutOfDate) => {
                report_out_of_date(settings, &github).await;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn decide_plan(
    expected: &ToolchainProvenance,
    local_match: bool,
    remote: Option<&LabelSet>,
    pull_failed: bool,
) -> mlirci_core::Result<ToolchainPlan> {
    plan_toolchain(PlanInput {
        expected,
        local_match,
        remote,
        pull_failed,
    })
}

/// ソースツリーと GitHub から期待値を求める
async fn expected_provenance(
    settings: &Settings,
    github: &GitHubClient,
    source_root: &Path,
) -> anyhow::Result<ToolchainProvenance> {
    let commit = toolchain_commit(source_root)?;

    // 日時が取れなくてもビルドは続ける（ラベルが不正になり公開されない）
    let commit_date = match github
        .commit_date(&settings.endpoints.toolchain_repo_api(), &commit)
        .await
    {
        Ok(date) => date,
        Err(e) => {
            tracing::warn!("Failed to get commit date of {}: {}", commit, e);
            String::new()
        }
    };

    let recipe_hash = file_sha1(&source_root.join(ImageKind::Static.dockerfile()))?;

    Ok(ToolchainProvenance {
        commit,
        commit_date,
        recipe_hash,
    })
}

async fn pull_and_retag(
    puller: &ImagePuller,
    store: &ImageStore,
    repo: &str,
    arch: &str,
    pr: &str,
) -> mlirci_build::BuildResult<()> {
    puller.pull(repo, arch).await?;
    store.tag(&format!("{}:{}", repo, arch), repo, pr).await
}

async fn build(
    builder: &ImageBuilder,
    store: &ImageStore,
    source_root: &Path,
    kind: ImageKind,
    expected: &ToolchainProvenance,
    tag: &str,
    pr: &str,
) -> anyhow::Result<()> {
    let request = BuildRequest {
        dockerfile: kind.dockerfile().to_string(),
        tag: tag.to_string(),
        build_args: expected.build_args(kind, pr)?,
    };
    let context = ContextBuilder::create_context(source_root, &request.dockerfile)?;
    builder.build_image(context, &request).await?;

    let id = store.short_id(tag).await?;
    println!("  {} {} をビルドしました ({})", "✓".green(), tag, id);
    Ok(())
}

/// PR にソースが古い旨をコメントする（失敗してもログのみ）
async fn report_out_of_date(settings: &Settings, github: &GitHubClient) {
    let Some(pr_url) = settings.pr.request_url.as_deref() else {
        return;
    };

    let result = match comments_url(pr_url) {
        Ok(url) => github
            .post_comment(&url, "PR source out of date, rebase then rebuild")
            .await
            .map(|_| ()),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::info!("Failed to post PR comment: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlirci_build::RegistryAuth;

    #[tokio::test]
    #[ignore] // Docker接続とレジストリへのアクセスが必要
    async fn test_pull_and_retag_logs_short_id() {
        let docker = mlirci_build::connect(None).unwrap();
        let store = ImageStore::new(docker.clone());
        let puller = ImagePuller::new(docker, RegistryAuth::new());

        pull_and_retag(&puller, &store, "busybox", "latest", "mlirci-test")
            .await
            .unwrap();

        let id = store.short_id("busybox:mlirci-test").await.unwrap();
        assert!(id.starts_with("sha256:"));
        assert_eq!(id.len(), 19);

        store.remove("busybox:mlirci-test").await.unwrap();
    }
}
