//! Stage adapter implementations.

pub mod command;
pub mod scripted;

pub use command::CommandStage;
pub use scripted::ScriptedStage;
