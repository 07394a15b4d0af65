//! Primary and secondary indexing structures.

mod field;
mod state;

pub use field::FieldIndex;
pub use state::EngineState;
