//! 公開ゲート
//!
//! ビルドしたローカルイメージでレジストリ上のイメージを上書きするかを判定する。
//! 判定自体は副作用を持たず、tag/push は呼び出し側が行う。
//!
//! 判定順（最初に一致したルールを採用）:
//! 1. PR がマージ不可能 → 公開しない
//! 2. リモートのラベルが無い・不正 → 公開
//! 3. トリガーフレーズによる強制 → 公開
//! 4. ローカルのコミット日時が新しい → 公開
//! 5. コミット日時が同じで Dockerfile のハッシュが異なる → 公開
//! 6. それ以外 → 公開しない

use crate::model::{ImageKind, TagStrategy, TriggerPhrase, ValidLabels};
use serde::Serialize;
use std::fmt;

/// 判定理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishReason {
    UnmergeableState,
    NoValidRemote,
    ExplicitOverride,
    NewerSourceCommit,
    ChangedBuildRecipe,
    RemoteSameOrNewer,
}

impl fmt::Display for PublishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnmergeableState => "unmergeable state",
            Self::NoValidRemote => "no valid remote image to compare against",
            Self::ExplicitOverride => "explicit override",
            Self::NewerSourceCommit => "newer source commit",
            Self::ChangedBuildRecipe => "same commit, changed build recipe",
            Self::RemoteSameOrNewer => "remote is same or newer",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishDecision {
    pub publish: bool,
    pub reason: PublishReason,
}

impl PublishDecision {
    fn publish(reason: PublishReason) -> Self {
        Self {
            publish: true,
            reason,
        }
    }

    fn skip(reason: PublishReason) -> Self {
        Self {
            publish: false,
            reason,
        }
    }
}

/// 1 イメージ分の公開オプション
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub kind: ImageKind,
    pub tag: TagStrategy,
    pub trigger: TriggerPhrase,
}

impl PublishOptions {
    pub fn new(kind: ImageKind, trigger: TriggerPhrase, pr_number: &str) -> Self {
        let tag = TagStrategy::from_trigger(&trigger, pr_number);
        Self { kind, tag, trigger }
    }

    pub fn force(&self) -> bool {
        self.trigger.forces_publish()
    }
}

/// 公開可否を判定
///
/// `remote` が `None` の場合はリモートイメージが存在しないか、ラベルが不正。
pub fn decide(
    local: &ValidLabels,
    remote: Option<&ValidLabels>,
    force: bool,
    pr_mergeable: bool,
) -> PublishDecision {
    if !pr_mergeable {
        return PublishDecision::skip(PublishReason::UnmergeableState);
    }

    let Some(remote) = remote else {
        return PublishDecision::publish(PublishReason::NoValidRemote);
    };

    if force {
        return PublishDecision::publish(PublishReason::ExplicitOverride);
    }

    tracing::debug!(
        "Comparing local {} ({}) with remote {} ({})",
        local.commit_date,
        local.recipe_hash,
        remote.commit_date,
        remote.recipe_hash
    );

    if local.commit_date > remote.commit_date {
        return PublishDecision::publish(PublishReason::NewerSourceCommit);
    }

    // コミットは 1 つずつしかマージされないので、日時が同じならコミットも同じ。
    // それでも Dockerfile だけが変わっている場合がある。
    if local.commit_date == remote.commit_date && local.recipe_hash != remote.recipe_hash {
        return PublishDecision::publish(PublishReason::ChangedBuildRecipe);
    }

    PublishDecision::skip(PublishReason::RemoteSameOrNewer)
}
