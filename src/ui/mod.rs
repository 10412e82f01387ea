pub mod command;
pub mod config;
pub mod console;
mod syntax;
