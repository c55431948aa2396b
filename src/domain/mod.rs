pub mod book;
pub mod commands;
pub mod errors;
pub mod loan;
pub mod member;
pub mod reservation;
pub mod value_objects;

pub use errors::*;
pub use value_objects::*;
