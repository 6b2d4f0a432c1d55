//! API request handlers.

mod health;
mod predict;
mod schema;

pub use health::*;
pub use predict::*;
pub use schema::*;
