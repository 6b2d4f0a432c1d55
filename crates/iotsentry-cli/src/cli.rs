//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use iotsentry::ExportFormat;
use std::path::PathBuf;

/// iotsentry: attack-type classification for IoT network traffic
#[derive(Parser)]
#[command(name = "iotsentry")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding scaler.json and extra_trees_model.json
    /// (default: <executable dir>/model)
    #[arg(long, global = true, env = "IOTSENTRY_MODEL_DIR", value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify every row of a traffic table and write the labelled table
    Predict {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output path (default: predictions.<format> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// Number of rows to show in the input and result previews
        #[arg(long, default_value = "5")]
        preview: usize,

        /// Print the outcome as JSON instead of a formatted summary
        #[arg(long)]
        json: bool,
    },

    /// Show the features and classes the loaded model expects
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the upload server
    Serve {
        /// Port for web server
        #[arg(short, long, default_value = "8501")]
        port: u16,

        /// Don't automatically open browser
        #[arg(long)]
        no_open: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_defaults() {
        let cli = Cli::try_parse_from(["iotsentry", "predict", "traffic.csv"]).unwrap();
        match cli.command {
            Commands::Predict {
                file,
                output,
                format,
                preview,
                json,
            } => {
                assert_eq!(file, PathBuf::from("traffic.csv"));
                assert!(output.is_none());
                assert_eq!(format, ExportFormat::Csv);
                assert_eq!(preview, 5);
                assert!(!json);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "iotsentry",
            "serve",
            "--port",
            "9000",
            "--model-dir",
            "/opt/model",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.model_dir, Some(PathBuf::from("/opt/model")));
        assert!(matches!(cli.command, Commands::Serve { port: 9000, .. }));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["iotsentry", "predict", "a.csv", "-f", "xlsx"]).is_err());
    }
}
