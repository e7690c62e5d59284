//! CI イベント（PR アクションとビルド結果）

use serde::{Deserialize, Serialize};
use std::fmt;

/// Webhook の PR アクション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrAction {
    Opened,
    Reopened,
    Synchronize,
    Closed,
    /// master への push
    Push,
    Other(String),
}

impl PrAction {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "opened" => Self::Opened,
            "reopened" => Self::Reopened,
            "synchronize" => Self::Synchronize,
            "closed" => Self::Closed,
            "push" => Self::Push,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => f.write_str("opened"),
            Self::Reopened => f.write_str("reopened"),
            Self::Synchronize => f.write_str("synchronize"),
            Self::Closed => f.write_str("closed"),
            Self::Push => f.write_str("push"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Jenkins のビルド結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    /// ビルド開始直後（結果未確定）
    #[default]
    #[serde(other)]
    Unknown,
}

impl BuildResult {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            "UNSTABLE" => Self::Unstable,
            "ABORTED" => Self::Aborted,
            "NOT_BUILT" => Self::NotBuilt,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unstable => "UNSTABLE",
            Self::Aborted => "ABORTED",
            Self::NotBuilt => "NOT_BUILT",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}
