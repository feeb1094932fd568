// Artifact status display: shows where each artifact is expected, whether
// it exists, its size, and whether the model actually loads.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::denylist::Denylist;

/// Display artifact status to the terminal. Returns whether everything loaded.
pub fn show(config: &Config) -> Result<bool> {
    println!("Policy:    {}", config.policy);
    println!(
        "Sequence:  length {} (pad id {})",
        config.sequence.max_length, config.sequence.pad_id
    );
    println!("Threshold: {}", config.default_threshold);
    println!();

    describe_file("Model", &config.model_path);
    describe_file("Tokenizer", &config.tokenizer_path);
    describe_file("Denylist", &config.denylist_path);
    println!();

    let mut healthy = true;

    match crate::artifacts::load_scorer(config) {
        Ok(_) => println!("Model:     {}", "loads".green()),
        Err(e) => {
            healthy = false;
            println!("Model:     {} ({e:#})", "failed to load".red());
        }
    }

    match Denylist::load(&config.denylist_path) {
        Ok(list) => println!("Denylist:  {} words", list.len()),
        Err(e) => {
            healthy = false;
            println!("Denylist:  {} ({e:#})", "failed to load".red());
        }
    }

    if !crate::artifacts::model_files_present(&config.model_path, &config.tokenizer_path) {
        println!(
            "\nPlace model.onnx and tokenizer.json in {} or set CHATGUARD_MODEL_PATH / CHATGUARD_TOKENIZER_PATH.",
            config.model_dir.display()
        );
    }

    Ok(healthy)
}

fn describe_file(name: &str, path: &Path) {
    match std::fs::metadata(path) {
        Ok(meta) => println!(
            "{:<10} {} ({})",
            format!("{name}:"),
            path.display(),
            format_bytes(meta.len())
        ),
        Err(_) => println!(
            "{:<10} {} {}",
            format!("{name}:"),
            path.display(),
            "(missing)".yellow()
        ),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
