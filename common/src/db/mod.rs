pub mod core;
pub mod error;
pub mod indices;
pub mod parser;
pub mod records;
