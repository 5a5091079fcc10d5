//! Writes the OpenAPI document of the receptionist API.
//!
//! Usage: `openapi [OUTPUT]`, defaulting to `openapi.json`.

use anyhow::Context;
use receptionist_api::router::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to render OpenAPI document")?;
    std::fs::write(&output, document)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("OpenAPI document written to {}", output.display());
    Ok(())
}
