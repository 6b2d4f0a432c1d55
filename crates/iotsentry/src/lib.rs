//! iotsentry: attack-type classification for IoT network traffic tables.
//!
//! A fitted normalization transform and a fitted tree-ensemble classifier
//! are loaded once as a [`ModelBundle`]. Each uploaded table is reconciled
//! against the transform's recorded feature names, normalized, classified
//! row by row, and returned with an appended `Prediction_Attack_type` column
//! and a per-label count.
//!
//! # Core Principles
//!
//! - **Reject fast**: a table missing expected features is refused before
//!   any numeric work
//! - **Name-based alignment**: columns are matched by name, so upload order
//!   and extra columns do not matter
//! - **Row fidelity**: output rows match input rows one to one, in order
//!
//! # Example
//!
//! ```no_run
//! use iotsentry::{BundleLoader, Sentry};
//!
//! let bundle = BundleLoader::from_executable()?.load()?;
//! let sentry = Sentry::new(bundle);
//! let report = sentry.predict_file("traffic.csv")?;
//!
//! for (label, count) in report.distribution.iter() {
//!     println!("{label}: {count}");
//! }
//! # Ok::<(), iotsentry::SentryError>(())
//! ```

pub mod error;
pub mod inference;
pub mod input;
pub mod model;
pub mod output;
pub mod report;
pub mod schema;

mod sentry;

pub use crate::sentry::{Sentry, SentryConfig};
pub use error::{DiagnosticContext, Result, SentryError};
pub use inference::infer;
pub use input::{DataTable, Parser, ParserConfig, SourceMetadata};
pub use model::{
    BundleLoader, BundleSummary, Classifier, FeatureMatrix, FeatureTransform, ModelBundle,
};
pub use output::{AugmentedTable, ExportFormat, LabelDistribution, PREDICTION_COLUMN, assemble};
pub use report::{Notice, PredictionReport, ReconcileMode, ReportView, RunOutcome};
pub use schema::{DEFAULT_INDEX_COLUMN, FeatureSchema, Reconciler, Reconciliation};
