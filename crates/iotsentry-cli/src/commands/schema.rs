//! Schema command - show what the loaded model expects.

use std::path::PathBuf;

use colored::Colorize;

use super::load_bundle;

pub fn run(json: bool, model_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = load_bundle(model_dir)?;
    let summary = bundle.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if let Some(source) = &summary.source {
        println!(
            "{} {}",
            "Model bundle".cyan().bold(),
            source.display().to_string().white()
        );
    }
    println!(
        "  Transform: {} ({} features)",
        summary.transform, summary.n_features
    );
    println!(
        "  Classifier: {} ({} classes)",
        summary.classifier,
        summary.classes.len()
    );

    println!();
    match &summary.features {
        Some(features) => {
            println!("{}", "Expected features:".yellow().bold());
            for (i, name) in features.iter().enumerate() {
                println!("  {:>3}. {}", i + 1, name);
            }
        }
        None => {
            println!(
                "{} the transform does not record feature names; uploads are read in column order",
                "Legacy model:".yellow().bold()
            );
        }
    }

    println!();
    println!("{}", "Attack types:".yellow().bold());
    for class in &summary.classes {
        println!("  {}", class);
    }

    Ok(())
}
