pub mod compiler;
pub mod services;
