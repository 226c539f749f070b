//! Model Context Protocol: stdio server, protocol types, tool registry

pub mod server;
pub mod tools;
pub mod types;
