//! Validate command - Validate configuration

use anyhow::Result;
use colored::Colorize;
use forge_core::ConfigManager;
use std::path::Path;

pub async fn run(config: Option<&Path>) -> Result<()> {
    println!("{}", "🔍 Validating Forge configuration...".cyan().bold());

    let loaded = crate::config::load(config, &std::env::current_dir()?)?;
    match &loaded.path {
        Some(path) => println!("  📁 Config file: {}", path.display().to_string().dimmed()),
        None => println!("  📁 {}", "No config file found, checking defaults".dimmed()),
    }
    println!();

    let result = ConfigManager::new().validate(&loaded.config);

    if result.valid {
        println!("  {} Schema is valid", "✅".green());
    } else {
        println!("  {} Schema validation failed", "❌".red());
        for error in &result.errors {
            println!(
                "      {} {}: {} [{}]",
                "•".red(),
                error.field.red(),
                error.message,
                error.code.dimmed()
            );
        }
    }

    for warning in &result.warnings {
        println!("  {} {}: {}", "⚠️".yellow(), warning.field.yellow(), warning.message);
        if let Some(ref suggestion) = warning.suggestion {
            println!("      💡 {}", suggestion.dimmed());
        }
    }

    println!();

    if !result.valid {
        println!("{}", "❌ Validation failed - please fix the errors above".red().bold());
        return Err(anyhow::anyhow!("Validation failed"));
    }

    println!("{}", "✅ Configuration is valid!".green().bold());
    Ok(())
}
