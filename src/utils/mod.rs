pub mod config;
pub mod encoding;
pub mod lib;
