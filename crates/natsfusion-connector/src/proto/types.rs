//! Mapping from protobuf field kinds to Arrow column types.

use arrow_schema::DataType;
use prost_reflect::{FieldDescriptor, Kind};

/// Returns the Arrow data type for a leaf field's protobuf kind.
///
/// Enums project as their symbolic value name, and message-typed leaves
/// are not supported as columns, so both map to `Utf8`.
#[must_use]
pub fn column_type(field: &FieldDescriptor) -> DataType {
    match field.kind() {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => DataType::Int32,
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => DataType::Int64,
        Kind::Uint32 | Kind::Fixed32 => DataType::UInt32,
        Kind::Uint64 | Kind::Fixed64 => DataType::UInt64,
        Kind::Float => DataType::Float32,
        Kind::Double => DataType::Float64,
        Kind::Bool => DataType::Boolean,
        Kind::Bytes => DataType::Binary,
        Kind::String | Kind::Enum(_) | Kind::Message(_) => DataType::Utf8,
    }
}
