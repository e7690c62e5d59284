//! イメージラベル

use super::image::{ImageFamily, LabelKeys};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// イメージに付与されたラベルのスナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(HashMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 値が空でないラベルを持つか
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// 必須ラベルを検証して [`ValidLabels`] に変換
    ///
    /// `image` はエラーメッセージ用のイメージ参照。
    pub fn validate(&self, family: ImageFamily, image: &str) -> Result<ValidLabels> {
        let keys = family.label_keys();
        let missing: Vec<String> = keys
            .all()
            .iter()
            .filter(|key| !self.has_value(key))
            .map(|key| key.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(CoreError::InvalidLabels {
                image: image.to_string(),
                missing,
            });
        }

        // has_value で検証済み
        let raw = |key: &str| self.get(key).unwrap_or_default().to_string();

        let commit_date_raw = raw(keys.commit_date);
        let commit_date =
            parse_commit_date(&commit_date_raw).ok_or_else(|| CoreError::InvalidCommitDate {
                image: image.to_string(),
                value: commit_date_raw.clone(),
            })?;

        Ok(ValidLabels {
            keys,
            commit: raw(keys.commit),
            commit_date,
            recipe_hash: raw(keys.recipe_hash),
        })
    }
}

impl From<HashMap<String, String>> for LabelSet {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// 必須ラベルがすべて揃ったラベルセット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidLabels {
    pub keys: LabelKeys,
    pub commit: String,
    pub commit_date: DateTime<Utc>,
    pub recipe_hash: String,
}

/// コミット日時をパース
///
/// GitHub の commit API が返す `2024-03-01T00:00:00Z` 形式を想定。
/// オフセット付きの RFC 3339 も受け付けて UTC に正規化する。
pub fn parse_commit_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toolchain_labels(date: &str) -> LabelSet {
        [
            ("llvm_project_sha1", "0123abcd"),
            ("llvm_project_sha1_date", date),
            ("llvm_project_dockerfile_sha1", "feedbeef"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_validate_ok() {
        let labels = toolchain_labels("2024-03-01T00:00:00Z");
        let valid = labels
            .validate(ImageFamily::Toolchain, "u/onnx-mlir-llvm-static:1")
            .unwrap();
        assert_eq!(valid.commit, "0123abcd");
        assert_eq!(valid.recipe_hash, "feedbeef");
        assert_eq!(valid.commit_date.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_validate_empty_value_is_missing() {
        let mut labels = toolchain_labels("2024-03-01T00:00:00Z");
        labels.insert("llvm_project_sha1", "");

        match labels.validate(ImageFamily::Toolchain, "img") {
            Err(CoreError::InvalidLabels { missing, .. }) => {
                assert_eq!(missing, vec!["llvm_project_sha1".to_string()]);
            }
            other => panic!("Expected InvalidLabels, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_wrong_family() {
        let labels = toolchain_labels("2024-03-01T00:00:00Z");
        let result = labels.validate(ImageFamily::Product, "img");
        assert!(matches!(result, Err(CoreError::InvalidLabels { missing, .. }) if missing.len() == 3));
    }

    #[test]
    fn test_validate_bad_date() {
        let labels = toolchain_labels("yesterday");
        assert!(matches!(
            labels.validate(ImageFamily::Toolchain, "img"),
            Err(CoreError::InvalidCommitDate { .. })
        ));
    }

    #[test]
    fn test_parse_commit_date_offset() {
        let a = parse_commit_date("2024-03-01T09:00:00+09:00").unwrap();
        let b = parse_commit_date("2024-03-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_commit_date("").is_none());
    }

    #[test]
    fn test_label_set_deserializes_from_map() {
        let labels: LabelSet =
            serde_json::from_str(r#"{"onnx_mlir_pr_number": "42", "maintainer": ""}"#).unwrap();
        assert_eq!(labels.get("onnx_mlir_pr_number"), Some("42"));
        assert!(!labels.has_value("maintainer"));
    }
}
