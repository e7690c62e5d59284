//! PR ごとのクリーンアップ方針
//!
//! PR 番号ラベルの付いたイメージと、それを元にしたコンテナを削除する。
//! dangling のみを消すか、タグ付きのものまで消すかはビルドの段階で変わる。

use crate::model::{BuildResult, ImageKind, PrAction, image_reference};

/// クリーンアップ範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupScope {
    /// 何もしない
    Skip,
    /// dangling イメージのみ
    Dangling,
    /// PR のイメージをすべて
    Full,
}

impl CleanupScope {
    pub fn dangling_only(&self) -> bool {
        matches!(self, Self::Dangling)
    }
}

/// ビルド開始前のクリーンアップ範囲
///
/// PR がクローズされた場合のみタグ付きイメージも削除する。
pub fn prepare_scope(action: &PrAction) -> CleanupScope {
    if *action == PrAction::Closed {
        CleanupScope::Full
    } else {
        CleanupScope::Dangling
    }
}

/// ビルド開始前に Jenkins のワークスペースも削除するか
pub fn removes_workspace(action: &PrAction) -> bool {
    *action == PrAction::Closed
}

/// ビルド終了後のクリーンアップ範囲
///
/// - FAILURE: デバッグのため何も消さない
/// - 結果未確定 (UNKNOWN) は起動時なので dangling のみ
/// - マージされずにクローズ、または push イベントなら全削除
/// - マージでクローズされた場合は後続の push ビルドがレイヤーキャッシュを
///   再利用できるよう dangling のみ（push ビルドが公開後に全削除する）
pub fn post_build_scope(result: BuildResult, action: &PrAction, merged: bool) -> CleanupScope {
    if result == BuildResult::Failure {
        return CleanupScope::Skip;
    }

    let closed_unmerged = *action == PrAction::Closed && !merged;
    if result != BuildResult::Unknown && (closed_unmerged || *action == PrAction::Push) {
        CleanupScope::Full
    } else {
        CleanupScope::Dangling
    }
}

/// 全削除時に追加でタグを外すツールチェーンイメージ
///
/// 過去の PR が pull/ビルドしたものを再タグしただけの場合、
/// PR 番号ラベルを持たないのでラベルフィルタでは見つからない。
pub fn untag_targets(user: &str, pr_number: &str) -> Vec<String> {
    ImageKind::TOOLCHAIN
        .iter()
        .map(|kind| image_reference(user, *kind, pr_number))
        .collect()
}

/// Jenkins ワークスペースの glob パターン
pub fn workspace_pattern(jenkins_home: &str, job_name: &str, pr_number: &str) -> String {
    format!("{}/workspace/{}@pr_{}*", jenkins_home, job_name, pr_number)
}
