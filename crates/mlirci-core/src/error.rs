use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("不明なイメージ種別: {0}（static, shared, dev, usr のいずれか）")]
    UnknownImageKind(String),

    #[error("イメージ {image} のラベルが不正です: {}", missing.join(", "))]
    InvalidLabels { image: String, missing: Vec<String> },

    #[error("イメージ {image} のコミット日時が ISO-8601 ではありません: {value}")]
    InvalidCommitDate { image: String, value: String },

    #[error("PR のソースが古くなっています。rebase してから再ビルドしてください (PR source out of date, rebase then rebuild)")]
    SourceOutOfDate,

    #[error("無効な設定: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
