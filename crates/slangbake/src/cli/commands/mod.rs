//! CLI commands

mod bake;

pub use bake::BakeCommand;
