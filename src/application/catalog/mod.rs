mod errors;
pub mod books;
pub mod members;
pub mod reservations;
pub mod stats;

pub use errors::{CatalogError, Result};
pub use stats::LibraryStats;
