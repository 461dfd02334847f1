pub mod directory;
pub mod markdown;

pub use directory::{Directory, LoadError};
pub use markdown::parse_document;
