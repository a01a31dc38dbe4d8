pub mod cli;
pub mod commands;
pub mod config;
pub mod duration;
pub mod error;
pub mod job;
pub mod layout;
mod logging;
pub mod naming;
pub mod orchestrator;
pub mod render;
pub mod support;
pub mod timing;

pub use cli::ReelCommands;
pub use commands::handle_reel_command;
