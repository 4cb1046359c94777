pub mod model;
pub mod numeric_integration;
mod trajectory;
pub use trajectory::*;
mod simulation;
mod opts;
pub use opts::*;
mod execs;
pub use execs::*;
