//! Output schema synthesis.
//!
//! Every scan emits the same five metadata columns followed by the
//! extraction columns of the selected mode. The schema is synthesised
//! once when the scan binds, so column types are known before the first
//! message is fetched.

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};

use crate::config::ScanConfig;
use crate::proto::{column_type, ProtoProjection};

/// Number of fixed metadata columns preceding the extraction columns.
pub const FIXED_COLUMNS: usize = 5;

/// Builds the output schema for a scan.
///
/// Columns in order: `stream`, `subject`, `seq`, `ts_nats` (microsecond
/// timestamp), `payload` (raw bytes in protobuf mode, text otherwise),
/// then one nullable column per extraction field. JSON columns are all
/// text; protobuf columns take their type from the leaf field's kind,
/// with dots in the path becoming underscores in the column name.
#[must_use]
pub fn output_schema(config: &ScanConfig, proto: Option<&ProtoProjection>) -> SchemaRef {
    let payload_type = if proto.is_some() {
        DataType::Binary
    } else {
        DataType::Utf8
    };

    let mut fields = Vec::with_capacity(
        FIXED_COLUMNS + config.json_fields.len() + proto.map_or(0, |p| p.paths().len()),
    );
    fields.push(Field::new("stream", DataType::Utf8, false));
    fields.push(Field::new("subject", DataType::Utf8, false));
    fields.push(Field::new("seq", DataType::UInt64, false));
    fields.push(Field::new(
        "ts_nats",
        DataType::Timestamp(TimeUnit::Microsecond, None),
        false,
    ));
    fields.push(Field::new("payload", payload_type, false));

    for name in &config.json_fields {
        fields.push(Field::new(name, DataType::Utf8, true));
    }
    if let Some(projection) = proto {
        for path in projection.paths() {
            fields.push(Field::new(path.column(), column_type(path.leaf()), true));
        }
    }

    Arc::new(Schema::new(fields))
}
