//! プルリクエストの mergeable state
//!
//! GitHub の `mergeable_state` をマージ可否と説明文付きの列挙型で表す。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableState {
    Behind,
    Blocked,
    Clean,
    Dirty,
    Draft,
    HasHooks,
    Unstable,
    /// 取得失敗や未知の値もここに落とす（serde(other) は最後の variant のみ）
    #[default]
    #[serde(other)]
    Unknown,
}

impl MergeableState {
    pub fn is_mergeable(&self) -> bool {
        matches!(self, Self::Clean | Self::HasHooks | Self::Unstable)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Behind => "the head ref is out of date",
            Self::Blocked => "the merge is blocked",
            Self::Clean => "mergeable and passing commit status",
            Self::Dirty => "the merge commit cannot be cleanly created",
            Self::Draft => "the merge is blocked due to the pull request being a draft",
            Self::HasHooks => "mergeable with passing commit status and pre-receive hooks",
            Self::Unknown => "the state cannot currently be determined",
            Self::Unstable => "mergeable with non-passing commit status",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Behind => "behind",
            Self::Blocked => "blocked",
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Draft => "draft",
            Self::HasHooks => "has_hooks",
            Self::Unknown => "unknown",
            Self::Unstable => "unstable",
        }
    }

    /// 文字列から変換（未知の値は Unknown）
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "behind" => Self::Behind,
            "blocked" => Self::Blocked,
            "clean" => Self::Clean,
            "dirty" => Self::Dirty,
            "draft" => Self::Draft,
            "has_hooks" => Self::HasHooks,
            "unstable" => Self::Unstable,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for MergeableState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for MergeableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mergeable_classification() {
        let mergeable: Vec<_> = [
            MergeableState::Behind,
            MergeableState::Blocked,
            MergeableState::Clean,
            MergeableState::Dirty,
            MergeableState::Draft,
            MergeableState::HasHooks,
            MergeableState::Unknown,
            MergeableState::Unstable,
        ]
        .into_iter()
        .filter(MergeableState::is_mergeable)
        .collect();

        assert_eq!(
            mergeable,
            vec![
                MergeableState::Clean,
                MergeableState::HasHooks,
                MergeableState::Unstable
            ]
        );
    }

    #[test]
    fn test_parse_unknown_values() {
        assert_eq!(MergeableState::parse("has_hooks"), MergeableState::HasHooks);
        assert_eq!(MergeableState::parse("Clean"), MergeableState::Clean);
        assert_eq!(MergeableState::parse("mystery"), MergeableState::Unknown);
        assert_eq!(MergeableState::parse(""), MergeableState::Unknown);
    }

    #[test]
    fn test_deserialize_from_github_json() {
        let state: MergeableState = serde_json::from_str(r#""draft""#).unwrap();
        assert_eq!(state, MergeableState::Draft);
        assert!(!state.is_mergeable());

        let state: MergeableState = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(state, MergeableState::Unknown);
    }

    #[test]
    fn test_deserialize_every_state() {
        for state in [
            MergeableState::Behind,
            MergeableState::Blocked,
            MergeableState::Clean,
            MergeableState::Dirty,
            MergeableState::Draft,
            MergeableState::HasHooks,
            MergeableState::Unstable,
            MergeableState::Unknown,
        ] {
            let json = format!("\"{}\"", state);
            let parsed: MergeableState = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, state);
        }
        assert_eq!(MergeableState::default(), MergeableState::Unknown);
    }

    #[test]
    fn test_description() {
        assert_eq!(
            MergeableState::Unknown.description(),
            "the state cannot currently be determined"
        );
        assert_eq!(MergeableState::HasHooks.to_string(), "has_hooks");
    }
}
