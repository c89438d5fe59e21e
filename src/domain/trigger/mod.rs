pub mod expr;
mod expr_tests;

pub use expr::{BoolExpr, Comparison, NodeState, Relation, all_complete};
