pub mod catalog;
pub mod directory;
