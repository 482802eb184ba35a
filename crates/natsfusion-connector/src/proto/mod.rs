//! Protobuf schema compilation, type mapping, and payload projection.

mod compiler;
mod decoder;
mod types;

pub use compiler::{ProtoProjection, ResolvedPath};
pub use decoder::ProtoProjector;
pub use types::column_type;
