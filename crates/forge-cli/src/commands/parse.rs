//! Parse command - print parser events as JSON lines

use anyhow::{Context, Result};
use forge_core::stream::chunk_text;
use forge_core::{ConfigManager, StreamingParser};
use std::path::Path;
use tracing::info;

pub async fn run(file: &Path, chunk_size: usize, config: Option<&Path>) -> Result<()> {
    let response = super::read_input(file)?;
    let loaded = crate::config::load(config, &std::env::current_dir()?)?;

    ConfigManager::new()
        .ensure_valid(&loaded.config)
        .context("Validation failed")?;

    let mut parser = StreamingParser::from_config(&loaded.config);
    let mut count = 0;
    for chunk in chunk_text(&response, chunk_size) {
        for event in parser.feed(&chunk) {
            println!("{}", serde_json::to_string(&event)?);
            count += 1;
        }
    }
    for event in parser.finish() {
        println!("{}", serde_json::to_string(&event)?);
        count += 1;
    }

    info!("Parsed {} events", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_invalid_tag_vocabulary_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("forge.config.yaml");
        std::fs::write(&config_path, "artifact_tag: step\naction_tag: step\n")?;
        let response = temp_dir.path().join("response.txt");
        std::fs::write(&response, "<step id=\"a\" title=\"A\"></step>")?;

        let err = run(&response, 16, Some(&config_path)).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation failed");
        Ok(())
    }
}
