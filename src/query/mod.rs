// Dependency queries over the committed graph

pub mod engine;

pub use engine::{CalleeRow, CallerRow, DependencyTree, Direction, FileIndexState, QueryEngine, Resolution};
