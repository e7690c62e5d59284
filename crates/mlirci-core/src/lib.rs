//! mlirci core
//!
//! CI のイメージカタログ、ラベル検証、公開ゲート、
//! ツールチェーンイメージの準備計画、クリーンアップ方針を提供します。
//! ネットワークや Docker へのアクセスは行いません。

pub mod cleanup;
pub mod error;
pub mod gate;
pub mod model;
pub mod provenance;

pub use cleanup::{CleanupScope, post_build_scope, prepare_scope};
pub use error::{CoreError, Result};
pub use gate::{PublishDecision, PublishOptions, PublishReason, decide};
pub use model::*;
pub use provenance::{PlanInput, ToolchainPlan, ToolchainProvenance, plan_toolchain};
