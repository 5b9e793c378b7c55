pub mod filesystem;

pub use filesystem::{directory_name, pdf_filename, FileStorage};
