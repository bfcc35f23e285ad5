//! CLI command implementations

pub mod parse;
pub mod replay;
pub mod validate;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a recorded response from a file, or stdin for `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read response from stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read response from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_input_from_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("response.txt");
        std::fs::write(&path, "<boltArtifact id=\"a\" title=\"A\"></boltArtifact>")?;

        assert!(read_input(&path)?.starts_with("<boltArtifact"));
        assert!(read_input(&temp_dir.path().join("missing.txt")).is_err());
        Ok(())
    }
}
