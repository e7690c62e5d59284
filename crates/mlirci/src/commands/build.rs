//! onnx-mlir の dev / usr イメージのビルド

use crate::docker;
use colored::Colorize;
use mlirci_build::{BuildRequest, ContextBuilder, ImageBuilder, ImageStore};
use mlirci_config::Settings;
use mlirci_core::provenance::product_build_args;
use mlirci_core::{ImageKind, image_reference};
use std::path::Path;

pub async fn handle(settings: &Settings, source_root: &Path) -> anyhow::Result<()> {
    let user = settings.require_dockerhub_user()?;
    let pr = settings.require_pr_number()?;

    let docker = docker::connect(settings)?;
    let builder = ImageBuilder::new(docker.clone());
    let store = ImageStore::new(docker);

    println!("{}", "onnx-mlir イメージをビルド中...".green());

    for kind in ImageKind::PRODUCT {
        let request = BuildRequest {
            dockerfile: kind.dockerfile().to_string(),
            tag: image_reference(user, kind, pr),
            build_args: product_build_args(kind, user, pr)?,
        };

        println!();
        println!("{} {} ({})", "▶".blue(), request.tag.cyan(), request.dockerfile);

        let context = ContextBuilder::create_context(source_root, &request.dockerfile)?;
        builder.build_image(context, &request).await?;

        let id = store.short_id(&request.tag).await?;
        tracing::info!("{} built: {}", request.tag, id);
        println!("  {} {} ({})", "✓".green(), request.tag, id);
    }

    Ok(())
}
