// Terminal display for `chatguard classify`.

use colored::Colorize;

use crate::classifier::policy::Analysis;

use super::truncate_chars;

/// Print one classification result as a single line, plus matched words.
pub fn display_analysis(analysis: &Analysis) {
    let label = if analysis.is_offensive {
        analysis.label.as_str().red().bold().to_string()
    } else {
        analysis.label.as_str().green().to_string()
    };

    println!(
        "  {:<60} -> {}  {}",
        format!("\"{}\"", truncate_chars(&analysis.text, 56)),
        label,
        format!("(p = {:.4})", analysis.probability).dimmed(),
    );

    if !analysis.offensive_words.is_empty() {
        println!(
            "  {:<60}    {} {}",
            "",
            "words:".dimmed(),
            analysis.offensive_words.join(", ").yellow(),
        );
    }
}

/// Print the closing tally for a batch of classifications.
pub fn display_summary(results: &[Analysis], failures: usize) {
    let offensive = results.iter().filter(|a| a.is_offensive).count();
    println!("\n{}", "=== Summary ===".bold());
    println!("  Classified:    {}", results.len());
    println!("  Offensive:     {offensive}");
    println!("  Not offensive: {}", results.len() - offensive);
    if failures > 0 {
        println!("  {}", format!("Failed:        {failures}").red());
    }
}
