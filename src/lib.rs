pub mod error;
pub mod instruction;
pub mod program;
pub mod generator;
pub mod robot;
pub mod world;
pub mod sweep;
