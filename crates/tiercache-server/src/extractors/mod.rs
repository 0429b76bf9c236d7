//! Extractores de request.

mod path;

pub use path::ProjectPath;
