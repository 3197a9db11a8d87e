pub mod annotate;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod locate;
pub mod model;
pub mod profile;
pub mod render;
pub mod report;
pub mod testlog;
pub mod tree;
