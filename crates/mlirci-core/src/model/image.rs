//! イメージカタログ
//!
//! CI がビルド・公開するイメージの種別と、種別ごとの必須ラベルを定義します。

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PR 番号を記録するラベル（クリーンアップ時のフィルタに使用）
pub const PR_NUMBER_LABEL: &str = "onnx_mlir_pr_number";

/// イメージ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// llvm-project（静的リンク）
    Static,
    /// llvm-project（共有ライブラリ）
    Shared,
    /// onnx-mlir 開発用
    Dev,
    /// onnx-mlir ユーザー向け
    Usr,
}

impl ImageKind {
    /// 公開順
    pub const ALL: [ImageKind; 4] = [Self::Static, Self::Shared, Self::Dev, Self::Usr];

    /// ツールチェーンイメージ
    pub const TOOLCHAIN: [ImageKind; 2] = [Self::Static, Self::Shared];

    /// プロダクトイメージ
    pub const PRODUCT: [ImageKind; 2] = [Self::Dev, Self::Usr];

    /// レジストリ上のイメージ名
    pub fn image_name(&self) -> &'static str {
        match self {
            Self::Static => "onnx-mlir-llvm-static",
            Self::Shared => "onnx-mlir-llvm-shared",
            Self::Dev => "onnx-mlir-dev",
            Self::Usr => "onnx-mlir",
        }
    }

    pub fn family(&self) -> ImageFamily {
        match self {
            Self::Static | Self::Shared => ImageFamily::Toolchain,
            Self::Dev | Self::Usr => ImageFamily::Product,
        }
    }

    /// ビルドに使う Dockerfile（リポジトリルートからの相対パス）
    pub fn dockerfile(&self) -> &'static str {
        match self {
            Self::Static | Self::Shared => "docker/Dockerfile.llvm-project",
            Self::Dev => "docker/Dockerfile.onnx-mlir-dev",
            Self::Usr => "docker/Dockerfile.onnx-mlir",
        }
    }

    /// プロダクトイメージのベースとなるツールチェーンイメージ
    ///
    /// dev は static、usr は shared の上にビルドされる。
    pub fn base(&self) -> Option<ImageKind> {
        match self {
            Self::Dev => Some(Self::Static),
            Self::Usr => Some(Self::Shared),
            Self::Static | Self::Shared => None,
        }
    }

    /// llvm-project ビルド時の BUILD_SHARED_LIBS
    pub fn build_shared_libs(&self) -> Option<&'static str> {
        match self {
            Self::Static => Some("off"),
            Self::Shared => Some("on"),
            Self::Dev | Self::Usr => None,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Static => "static",
            Self::Shared => "shared",
            Self::Dev => "dev",
            Self::Usr => "usr",
        };
        f.write_str(s)
    }
}

impl FromStr for ImageKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "shared" => Ok(Self::Shared),
            "dev" => Ok(Self::Dev),
            "usr" => Ok(Self::Usr),
            _ => Err(CoreError::UnknownImageKind(s.to_string())),
        }
    }
}

/// イメージファミリー
///
/// ファミリーごとに必須ラベルのキーが異なる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageFamily {
    /// llvm-project ツールチェーン
    Toolchain,
    /// onnx-mlir 本体
    Product,
}

impl ImageFamily {
    pub fn label_keys(&self) -> LabelKeys {
        match self {
            Self::Toolchain => LabelKeys {
                commit: "llvm_project_sha1",
                commit_date: "llvm_project_sha1_date",
                recipe_hash: "llvm_project_dockerfile_sha1",
            },
            Self::Product => LabelKeys {
                commit: "onnx_mlir_sha1",
                commit_date: "onnx_mlir_sha1_date",
                recipe_hash: "onnx_mlir_dockerfile_sha1",
            },
        }
    }
}

/// ファミリーの必須ラベルキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelKeys {
    /// ソースコミット SHA-1
    pub commit: &'static str,
    /// コミットの author 日時（ISO-8601）
    pub commit_date: &'static str,
    /// Dockerfile の SHA-1
    pub recipe_hash: &'static str,
}

impl LabelKeys {
    pub fn all(&self) -> [&'static str; 3] {
        [self.commit, self.commit_date, self.recipe_hash]
    }
}

/// `<user>/<name>` 形式のリポジトリ名
pub fn repository(user: &str, kind: ImageKind) -> String {
    format!("{}/{}", user, kind.image_name())
}

/// `<user>/<name>:<tag>` 形式の完全なイメージ参照
pub fn image_reference(user: &str, kind: ImageKind, tag: &str) -> String {
    format!("{}:{}", repository(user, kind), tag)
}
