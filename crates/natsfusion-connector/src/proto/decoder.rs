//! Reflective protobuf payload projection.
//!
//! Each payload is parsed into a fresh dynamic message of the bound type,
//! then every pre-resolved path is walked through nested messages to its
//! leaf. Parse failures are not errors: the row keeps its raw payload and
//! every extraction column is nulled.
//!
//! Proto3 presence semantics apply. Scalar leaves always produce a value
//! (the type's default when the field is absent from the wire); message
//! fields produce null whenever they are unset, both mid-path and at the
//! leaf.

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, Value};

use crate::batch::CellValue;
use crate::proto::ProtoProjection;

/// Projects protobuf payloads into typed extraction cells.
#[derive(Debug, Clone)]
pub struct ProtoProjector {
    projection: ProtoProjection,
}

impl ProtoProjector {
    /// Creates a projector over a compiled projection.
    #[must_use]
    pub fn new(projection: ProtoProjection) -> Self {
        Self { projection }
    }

    /// Decodes one payload and extracts every bound path.
    ///
    /// The result always has one entry per path; an undecodable payload
    /// yields all nulls.
    #[must_use]
    pub fn project(&self, payload: &[u8]) -> Vec<Option<CellValue>> {
        let Ok(message) = DynamicMessage::decode(self.projection.message().clone(), payload)
        else {
            return vec![None; self.projection.paths().len()];
        };
        self.projection
            .paths()
            .iter()
            .map(|path| extract(&message, path.segments()))
            .collect()
    }
}

/// Walks one descriptor chain through nested messages to its leaf value.
fn extract(message: &DynamicMessage, segments: &[FieldDescriptor]) -> Option<CellValue> {
    let (field, rest) = segments.split_first()?;
    if rest.is_empty() {
        return leaf_value(message, field);
    }
    if !message.has_field(field) {
        return None;
    }
    let value = message.get_field(field);
    extract(value.as_message()?, rest)
}

/// Reads the leaf field, mapping the protobuf value onto a typed cell.
fn leaf_value(message: &DynamicMessage, field: &FieldDescriptor) -> Option<CellValue> {
    let kind = field.kind();
    if matches!(kind, Kind::Message(_)) {
        // Nested messages are only reachable through dotted leaf paths.
        return None;
    }
    let value = message.get_field(field);
    match (&kind, &*value) {
        (Kind::String, Value::String(v)) => Some(CellValue::Str(v.clone())),
        (Kind::Bytes, Value::Bytes(v)) => Some(CellValue::Bytes(v.to_vec())),
        (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, Value::I32(v)) => Some(CellValue::I32(*v)),
        (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, Value::I64(v)) => Some(CellValue::I64(*v)),
        (Kind::Uint32 | Kind::Fixed32, Value::U32(v)) => Some(CellValue::U32(*v)),
        (Kind::Uint64 | Kind::Fixed64, Value::U64(v)) => Some(CellValue::U64(*v)),
        (Kind::Float, Value::F32(v)) => Some(CellValue::F32(*v)),
        (Kind::Double, Value::F64(v)) => Some(CellValue::F64(*v)),
        (Kind::Bool, Value::Bool(v)) => Some(CellValue::Bool(*v)),
        (Kind::Enum(desc), Value::EnumNumber(number)) => desc
            .get_value(*number)
            .map(|v| CellValue::Str(v.name().to_string())),
        _ => None,
    }
}
