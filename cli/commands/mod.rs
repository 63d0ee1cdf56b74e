pub mod completion;
pub mod config;
pub mod count;
pub mod generate;
pub mod select;
