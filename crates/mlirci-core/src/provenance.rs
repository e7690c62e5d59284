//! ツールチェーンイメージの準備計画
//!
//! PR ごとに「専用」の llvm-project イメージ（タグ = PR 番号）を用意する。
//! 手元に使えるイメージがあれば再利用し、なければレジストリから pull するか、
//! ローカルでビルドする。レジストリ側が PR の想定より新しい場合は
//! PR のソースが古いのでビルドを失敗させる。

use crate::error::{CoreError, Result};
use crate::model::{ImageFamily, ImageKind, LabelSet, PR_NUMBER_LABEL, parse_commit_date};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// PR のソースから求めた llvm-project の期待値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainProvenance {
    /// utils/clone-mlir.sh が checkout するコミット
    pub commit: String,
    /// そのコミットの author 日時（取得失敗時は空文字列）
    pub commit_date: String,
    /// docker/Dockerfile.llvm-project の SHA-1
    pub recipe_hash: String,
}

impl ToolchainProvenance {
    pub fn commit_date(&self) -> Option<DateTime<Utc>> {
        parse_commit_date(&self.commit_date)
    }

    /// ローカルイメージ検索用のラベルフィルタ（`key=value`）
    pub fn label_filters(&self) -> Vec<String> {
        let keys = ImageFamily::Toolchain.label_keys();
        vec![
            format!("{}={}", keys.commit, self.commit),
            format!("{}={}", keys.recipe_hash, self.recipe_hash),
        ]
    }

    /// ラベルがコミットと Dockerfile の両方で一致するか
    pub fn matches(&self, labels: &LabelSet) -> bool {
        let keys = ImageFamily::Toolchain.label_keys();
        labels.get(keys.commit) == Some(self.commit.as_str())
            && labels.get(keys.recipe_hash) == Some(self.recipe_hash.as_str())
    }

    /// llvm-project イメージのビルド引数
    pub fn build_args(&self, kind: ImageKind, pr_number: &str) -> Result<HashMap<String, String>> {
        let shared_libs = kind.build_shared_libs().ok_or_else(|| {
            CoreError::InvalidConfig(format!("{} はツールチェーンイメージではありません", kind))
        })?;

        Ok(HashMap::from([
            ("BUILD_SHARED_LIBS".to_string(), shared_libs.to_string()),
            ("LLVM_PROJECT_SHA1".to_string(), self.commit.clone()),
            ("LLVM_PROJECT_SHA1_DATE".to_string(), self.commit_date.clone()),
            (
                "LLVM_PROJECT_DOCKERFILE_SHA1".to_string(),
                self.recipe_hash.clone(),
            ),
            ("ONNX_MLIR_PR_NUMBER".to_string(), pr_number.to_string()),
        ]))
    }
}

/// プロダクトイメージ（dev / usr）のビルド引数
pub fn product_build_args(
    kind: ImageKind,
    user: &str,
    pr_number: &str,
) -> Result<HashMap<String, String>> {
    let base = kind.base().ok_or_else(|| {
        CoreError::InvalidConfig(format!("{} はプロダクトイメージではありません", kind))
    })?;

    Ok(HashMap::from([
        (
            "BASE_IMAGE".to_string(),
            crate::model::image_reference(user, base, pr_number),
        ),
        ("ONNX_MLIR_PR_NUMBER".to_string(), pr_number.to_string()),
    ]))
}

/// PR イメージを識別するラベルフィルタ
pub fn pr_label_filter(pr_number: &str) -> String {
    format!("{}={}", PR_NUMBER_LABEL, pr_number)
}

/// ツールチェーンイメージの準備方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainPlan {
    /// 以前のビルドが残したローカルイメージを使う
    Reuse,
    /// レジストリのイメージを pull して PR 番号でタグ付けする
    Pull,
    /// ローカルでビルドする
    Build,
}

/// 計画の入力
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub expected: &'a ToolchainProvenance,
    /// 期待ラベルを持つローカルイメージが見つかったか
    pub local_match: bool,
    /// レジストリ上のラベル（取得失敗時は None）
    pub remote: Option<&'a LabelSet>,
    /// 直前の pull が失敗したか
    pub pull_failed: bool,
}

/// 準備方法を決める
///
/// レジストリのコミット日時が期待値より新しい場合は
/// [`CoreError::SourceOutOfDate`] を返す（Dockerfile の一致に関係なく）。
pub fn plan_toolchain(input: PlanInput<'_>) -> Result<ToolchainPlan> {
    if input.local_match {
        return Ok(ToolchainPlan::Reuse);
    }

    let Some(remote) = input.remote.filter(|labels| !labels.is_empty()) else {
        return Ok(ToolchainPlan::Build);
    };

    if !input.pull_failed && input.expected.matches(remote) {
        return Ok(ToolchainPlan::Pull);
    }

    // pull に失敗した場合はリモートの日時を不正扱いにする
    let remote_date = if input.pull_failed {
        None
    } else {
        remote
            .get(ImageFamily::Toolchain.label_keys().commit_date)
            .and_then(parse_commit_date)
    };

    match (remote_date, input.expected.commit_date()) {
        (Some(remote_date), Some(expected_date)) if remote_date > expected_date => {
            tracing::debug!(
                "Remote toolchain commit date {} is newer than expected {}",
                remote_date,
                expected_date
            );
            Err(CoreError::SourceOutOfDate)
        }
        _ => Ok(ToolchainPlan::Build),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> ToolchainProvenance {
        ToolchainProvenance {
            commit: "a1b2c3".to_string(),
            commit_date: "2024-03-01T00:00:00Z".to_string(),
            recipe_hash: "d0d0".to_string(),
        }
    }

    fn remote(commit: &str, date: &str, hash: &str) -> LabelSet {
        [
            ("llvm_project_sha1", commit),
            ("llvm_project_sha1_date", date),
            ("llvm_project_dockerfile_sha1", hash),
        ]
        .into_iter()
        .collect()
    }

    fn plan(remote: Option<&LabelSet>, pull_failed: bool) -> Result<ToolchainPlan> {
        let exp = expected();
        plan_toolchain(PlanInput {
            expected: &exp,
            local_match: false,
            remote,
            pull_failed,
        })
    }

    #[test]
    fn test_local_match_reuses() {
        let exp = expected();
        let result = plan_toolchain(PlanInput {
            expected: &exp,
            local_match: true,
            remote: None,
            pull_failed: false,
        });
        assert_eq!(result.unwrap(), ToolchainPlan::Reuse);
    }

    #[test]
    fn test_matching_remote_is_pulled() {
        let labels = remote("a1b2c3", "2024-03-01T00:00:00Z", "d0d0");
        assert_eq!(plan(Some(&labels), false).unwrap(), ToolchainPlan::Pull);
    }

    #[test]
    fn test_pull_failure_falls_back_to_build() {
        let labels = remote("a1b2c3", "2024-05-01T00:00:00Z", "d0d0");
        assert_eq!(plan(Some(&labels), true).unwrap(), ToolchainPlan::Build);
    }

    #[test]
    fn test_missing_remote_builds() {
        assert_eq!(plan(None, false).unwrap(), ToolchainPlan::Build);
        assert_eq!(
            plan(Some(&LabelSet::new()), false).unwrap(),
            ToolchainPlan::Build
        );
    }

    #[test]
    fn test_older_remote_builds() {
        let labels = remote("ffff", "2024-02-01T00:00:00Z", "d0d0");
        assert_eq!(plan(Some(&labels), false).unwrap(), ToolchainPlan::Build);

        // 同じ日時で Dockerfile が違う場合もビルド
        let labels = remote("a1b2c3", "2024-03-01T00:00:00Z", "beef");
        assert_eq!(plan(Some(&labels), false).unwrap(), ToolchainPlan::Build);
    }

    #[test]
    fn test_newer_remote_is_out_of_date() {
        let labels = remote("ffff", "2024-04-01T00:00:00Z", "d0d0");
        assert!(matches!(
            plan(Some(&labels), false),
            Err(CoreError::SourceOutOfDate)
        ));
    }

    #[test]
    fn test_invalid_dates_build() {
        let labels = remote("ffff", "not-a-date", "d0d0");
        assert_eq!(plan(Some(&labels), false).unwrap(), ToolchainPlan::Build);

        let mut exp = expected();
        exp.commit_date = String::new();
        let labels = remote("ffff", "2024-04-01T00:00:00Z", "d0d0");
        let result = plan_toolchain(PlanInput {
            expected: &exp,
            local_match: false,
            remote: Some(&labels),
            pull_failed: false,
        });
        assert_eq!(result.unwrap(), ToolchainPlan::Build);
    }

    #[test]
    fn test_build_args() {
        let args = expected().build_args(ImageKind::Shared, "42").unwrap();
        assert_eq!(args["BUILD_SHARED_LIBS"], "on");
        assert_eq!(args["LLVM_PROJECT_SHA1"], "a1b2c3");
        assert_eq!(args["LLVM_PROJECT_DOCKERFILE_SHA1"], "d0d0");
        assert_eq!(args["ONNX_MLIR_PR_NUMBER"], "42");
        assert!(expected().build_args(ImageKind::Dev, "42").is_err());
    }

    #[test]
    fn test_product_build_args() {
        let args = product_build_args(ImageKind::Usr, "onnxmlir", "42").unwrap();
        assert_eq!(args["BASE_IMAGE"], "onnxmlir/onnx-mlir-llvm-shared:42");
        assert_eq!(args.len(), 2);
        assert!(product_build_args(ImageKind::Static, "onnxmlir", "42").is_err());
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            expected().label_filters(),
            vec![
                "llvm_project_sha1=a1b2c3".to_string(),
                "llvm_project_dockerfile_sha1=d0d0".to_string()
            ]
        );
        assert_eq!(pr_label_filter("7"), "onnx_mlir_pr_number=7");
    }
}
