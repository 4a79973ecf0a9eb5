pub mod config;
pub mod help;
pub mod result;
pub mod upload;

pub use result::CommandResult;
