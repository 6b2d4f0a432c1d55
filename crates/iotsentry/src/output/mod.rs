//! Result assembly and export.

mod assembler;
mod export;

pub use assembler::{AugmentedTable, LabelDistribution, PREDICTION_COLUMN, assemble};
pub use export::{DEFAULT_OUTPUT_FILE, ExportFormat, write_csv, write_table, write_table_to_path};
