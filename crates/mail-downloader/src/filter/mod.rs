pub mod matcher;

pub use matcher::{matches, FilterRule};
