use std::{env, fs, path::PathBuf};

use anyhow::Context;
use deck_render::{Exporter, ExportFormat, DeckRequest, RenderConfig};

// Usage: cargo run --example render_deck -- [deck.json] [pptx|pdf|hifi|all]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up DECK_RENDER_* settings from a local .env when present
    dotenvy::dotenv().ok();
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut args = env::args().skip(1);
    let deck_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demos/sample_deck.json"));
    let formats = match args.next().as_deref() {
        Some("pptx") => vec![ExportFormat::EditableDocument],
        Some("pdf") => vec![ExportFormat::VectorPdf],
        Some("hifi") => vec![ExportFormat::HifiPdf],
        _ => vec![
            ExportFormat::EditableDocument,
            ExportFormat::VectorPdf,
            ExportFormat::HifiPdf,
        ],
    };

    log::info!("Loading deck from {}", deck_path.display());
    let json = fs::read_to_string(&deck_path)
        .with_context(|| format!("reading {}", deck_path.display()))?;
    let request = DeckRequest::from_json(&json)?;
    let exporter = Exporter::new(RenderConfig::from_env()?);

    for format in formats {
        match exporter.render(&request, format).await {
            Ok(artifact) => {
                // Hi-Fi and vector PDFs share an extension
                let output = match format {
                    ExportFormat::HifiPdf => format!("hifi_{}", artifact.filename),
                    _ => artifact.filename.clone(),
                };
                fs::write(&output, &artifact.bytes)
                    .with_context(|| format!("writing {}", output))?;
                log::info!("{}: wrote {} ({} bytes)", format, output, artifact.bytes.len());
            }
            Err(e) if e.is_infrastructure() => {
                log::error!("{}: renderer unavailable: {}", format, e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
