//! モデル定義
//!
//! CI スクリプト群が扱うイメージ・ラベル・PR 状態のデータモデル。

mod event;
mod image;
mod labels;
mod mergeable;
mod trigger;

// Re-exports
pub use event::*;
pub use image::*;
pub use labels::*;
pub use mergeable::*;
pub use trigger::*;
