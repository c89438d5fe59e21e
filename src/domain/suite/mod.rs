pub mod defs;
pub mod node;
mod path;


pub use defs::{Defs, NodeId};
pub use node::{InLimit, Node, NodeKind};
