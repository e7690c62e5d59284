//! トリガーフレーズとタグ戦略

use serde::{Deserialize, Serialize};
use std::fmt;

/// PR に投稿されたトリガーフレーズ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerPhrase {
    /// 無条件で公開する
    Publish,
    /// master への push（マージ）
    Push,
    /// それ以外（通常の条件付きパス）
    Other(String),
}

impl TriggerPhrase {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "publish" => Self::Publish,
            "push" => Self::Push,
            other => Self::Other(other.to_string()),
        }
    }

    /// 無条件公開を要求しているか
    pub fn forces_publish(&self) -> bool {
        matches!(self, Self::Publish)
    }
}

impl fmt::Display for TriggerPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Publish => f.write_str("publish"),
            Self::Push => f.write_str("push"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// ローカルイメージのタグの決め方
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagStrategy {
    /// PR 番号をタグにする
    PullRequest(String),
    /// 固定のブランチタグ（push イベント）
    Branch(&'static str),
}

impl TagStrategy {
    pub const MASTER: &'static str = "master";

    pub fn from_trigger(trigger: &TriggerPhrase, pr_number: &str) -> Self {
        match trigger {
            TriggerPhrase::Push => Self::Branch(Self::MASTER),
            TriggerPhrase::Publish | TriggerPhrase::Other(_) => {
                Self::PullRequest(pr_number.to_string())
            }
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::PullRequest(pr) => pr,
            Self::Branch(branch) => branch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger() {
        assert_eq!(TriggerPhrase::parse("publish"), TriggerPhrase::Publish);
        assert_eq!(TriggerPhrase::parse(" push "), TriggerPhrase::Push);
        assert_eq!(
            TriggerPhrase::parse("test this please"),
            TriggerPhrase::Other("test this please".to_string())
        );
        assert!(TriggerPhrase::Publish.forces_publish());
        assert!(!TriggerPhrase::Push.forces_publish());
    }

    #[test]
    fn test_tag_strategy() {
        let push = TagStrategy::from_trigger(&TriggerPhrase::Push, "1234");
        assert_eq!(push.tag(), "master");

        let publish = TagStrategy::from_trigger(&TriggerPhrase::Publish, "1234");
        assert_eq!(publish.tag(), "1234");

        let other = TagStrategy::from_trigger(&TriggerPhrase::Other(String::new()), "77");
        assert_eq!(other, TagStrategy::PullRequest("77".to_string()));
    }
}
