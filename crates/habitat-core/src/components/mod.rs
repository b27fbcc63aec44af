//! ECS Components
//!
//! Agent identity and position, cognitive links, and resource fields.

pub mod agent;
pub mod field;
pub mod links;

pub use agent::*;
pub use field::*;
pub use links::*;
