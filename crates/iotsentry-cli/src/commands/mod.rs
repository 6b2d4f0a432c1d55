//! CLI command implementations.

pub mod predict;
pub mod schema;
pub mod serve;

use std::path::PathBuf;

use iotsentry::{BundleLoader, ModelBundle, Sentry};

/// Load the model bundle from `model_dir`, or from next to the executable.
pub fn load_bundle(model_dir: Option<PathBuf>) -> iotsentry::Result<ModelBundle> {
    let loader = match model_dir {
        Some(dir) => BundleLoader::new(dir),
        None => BundleLoader::from_executable()?,
    };
    loader.load()
}

pub fn load_sentry(model_dir: Option<PathBuf>) -> iotsentry::Result<Sentry> {
    Ok(Sentry::new(load_bundle(model_dir)?))
}
