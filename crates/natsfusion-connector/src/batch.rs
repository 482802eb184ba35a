//! Row-oriented assembly of Arrow record batches.
//!
//! The scan driver produces one row at a time; [`RowBatchBuilder`] buffers
//! those rows into per-column Arrow builders and finishes them into a
//! single `RecordBatch`. The first five columns are fixed metadata
//! (stream, subject, seq, ts_nats, payload); everything after is an
//! extraction column fed with [`CellValue`]s from the active projector.

use std::sync::Arc;

use arrow_array::builder::{
    BinaryBuilder, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder, Int64Builder,
    StringBuilder, TimestampMicrosecondBuilder, UInt32Builder, UInt64Builder,
};
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::{DataType, SchemaRef};

use crate::error::{ScanError, ScanResult};
use crate::schema::FIXED_COLUMNS;

/// A single extracted column value, typed per the output schema.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// UTF-8 text.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 64-bit unsigned integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Boolean.
    Bool(bool),
}

/// Typed Arrow builder for one extraction column.
pub(crate) enum ValueBuilder {
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    UInt32(UInt32Builder),
    UInt64(UInt64Builder),
    Float32(Float32Builder),
    Float64(Float64Builder),
    Bool(BooleanBuilder),
}

impl ValueBuilder {
    /// Creates the builder matching an extraction column's data type.
    fn for_type(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Utf8 => Some(Self::Utf8(StringBuilder::new())),
            DataType::Binary => Some(Self::Binary(BinaryBuilder::new())),
            DataType::Int32 => Some(Self::Int32(Int32Builder::new())),
            DataType::Int64 => Some(Self::Int64(Int64Builder::new())),
            DataType::UInt32 => Some(Self::UInt32(UInt32Builder::new())),
            DataType::UInt64 => Some(Self::UInt64(UInt64Builder::new())),
            DataType::Float32 => Some(Self::Float32(Float32Builder::new())),
            DataType::Float64 => Some(Self::Float64(Float64Builder::new())),
            DataType::Boolean => Some(Self::Bool(BooleanBuilder::new())),
            _ => None,
        }
    }

    /// Appends a cell, nulling on a value/builder type mismatch.
    fn append(&mut self, cell: Option<CellValue>) {
        match (self, cell) {
            (Self::Utf8(b), Some(CellValue::Str(v))) => b.append_value(v),
            (Self::Binary(b), Some(CellValue::Bytes(v))) => b.append_value(v),
            (Self::Int32(b), Some(CellValue::I32(v))) => b.append_value(v),
            (Self::Int64(b), Some(CellValue::I64(v))) => b.append_value(v),
            (Self::UInt32(b), Some(CellValue::U32(v))) => b.append_value(v),
            (Self::UInt64(b), Some(CellValue::U64(v))) => b.append_value(v),
            (Self::Float32(b), Some(CellValue::F32(v))) => b.append_value(v),
            (Self::Float64(b), Some(CellValue::F64(v))) => b.append_value(v),
            (Self::Bool(b), Some(CellValue::Bool(v))) => b.append_value(v),
            (other, _) => other.append_null(),
        }
    }

    fn append_null(&mut self) {
        match self {
            Self::Utf8(b) => b.append_null(),
            Self::Binary(b) => b.append_null(),
            Self::Int32(b) => b.append_null(),
            Self::Int64(b) => b.append_null(),
            Self::UInt32(b) => b.append_null(),
            Self::UInt64(b) => b.append_null(),
            Self::Float32(b) => b.append_null(),
            Self::Float64(b) => b.append_null(),
            Self::Bool(b) => b.append_null(),
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Utf8(b) => Arc::new(b.finish()),
            Self::Binary(b) => Arc::new(b.finish()),
            Self::Int32(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::UInt32(b) => Arc::new(b.finish()),
            Self::UInt64(b) => Arc::new(b.finish()),
            Self::Float32(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Bool(b) => Arc::new(b.finish()),
        }
    }
}

/// The payload column carries raw bytes in protobuf mode and text otherwise.
enum PayloadBuilder {
    Text(StringBuilder),
    Binary(BinaryBuilder),
}

/// Buffers scan rows and finishes them into a `RecordBatch`.
pub(crate) struct RowBatchBuilder {
    schema: SchemaRef,
    stream: StringBuilder,
    subject: StringBuilder,
    seq: UInt64Builder,
    ts: TimestampMicrosecondBuilder,
    payload: PayloadBuilder,
    extract: Vec<ValueBuilder>,
    rows: usize,
}

impl RowBatchBuilder {
    /// Creates a builder for the given output schema.
    ///
    /// The schema must have the fixed metadata columns first, which is
    /// guaranteed for schemas produced by [`crate::schema::output_schema`].
    pub(crate) fn new(schema: SchemaRef) -> ScanResult<Self> {
        let payload = match schema.field(FIXED_COLUMNS - 1).data_type() {
            DataType::Binary => PayloadBuilder::Binary(BinaryBuilder::new()),
            _ => PayloadBuilder::Text(StringBuilder::new()),
        };
        let extract = schema.fields()[FIXED_COLUMNS..]
            .iter()
            .map(|field| {
                ValueBuilder::for_type(field.data_type()).ok_or_else(|| {
                    ScanError::Schema(format!(
                        "unsupported extraction column type {} for column '{}'",
                        field.data_type(),
                        field.name()
                    ))
                })
            })
            .collect::<ScanResult<Vec<_>>>()?;

        Ok(Self {
            schema,
            stream: StringBuilder::new(),
            subject: StringBuilder::new(),
            seq: UInt64Builder::new(),
            ts: TimestampMicrosecondBuilder::new(),
            payload,
            extract,
            rows: 0,
        })
    }

    /// Appends one row. `cells` must hold one entry per extraction column.
    pub(crate) fn append_row(
        &mut self,
        stream: &str,
        subject: &str,
        seq: u64,
        ts_us: i64,
        payload: &[u8],
        cells: Vec<Option<CellValue>>,
    ) {
        self.stream.append_value(stream);
        self.subject.append_value(subject);
        self.seq.append_value(seq);
        self.ts.append_value(ts_us);
        match &mut self.payload {
            PayloadBuilder::Binary(b) => b.append_value(payload),
            PayloadBuilder::Text(b) => b.append_value(String::from_utf8_lossy(payload)),
        }
        for (builder, cell) in self.extract.iter_mut().zip(cells) {
            builder.append(cell);
        }
        self.rows += 1;
    }

    /// Returns the number of buffered rows.
    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    /// Finishes the buffered rows into a `RecordBatch`.
    pub(crate) fn finish(mut self) -> ScanResult<RecordBatch> {
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(FIXED_COLUMNS + self.extract.len());
        columns.push(Arc::new(self.stream.finish()));
        columns.push(Arc::new(self.subject.finish()));
        columns.push(Arc::new(self.seq.finish()));
        columns.push(Arc::new(self.ts.finish()));
        columns.push(match &mut self.payload {
            PayloadBuilder::Binary(b) => Arc::new(b.finish()),
            PayloadBuilder::Text(b) => Arc::new(b.finish()),
        });
        for builder in &mut self.extract {
            columns.push(builder.finish());
        }
        Ok(RecordBatch::try_new(self.schema, columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Array, Int64Array, StringArray, UInt64Array};
    use arrow_schema::{Field, Schema, TimeUnit};

    fn test_schema(extra: Vec<Field>) -> SchemaRef {
        let mut fields = vec![
            Field::new("stream", DataType::Utf8, false),
            Field::new("subject", DataType::Utf8, false),
            Field::new("seq", DataType::UInt64, false),
            Field::new(
                "ts_nats",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("payload", DataType::Utf8, false),
        ];
        fields.extend(extra);
        Arc::new(Schema::new(fields))
    }

    #[test]
    fn test_empty_batch() {
        let builder = RowBatchBuilder::new(test_schema(vec![])).unwrap();
        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 5);
    }

    #[test]
    fn test_metadata_columns() {
        let mut builder = RowBatchBuilder::new(test_schema(vec![])).unwrap();
        builder.append_row("events", "a.x", 7, 1_234, b"hello", vec![]);
        assert_eq!(builder.rows(), 1);

        let batch = builder.finish().unwrap();
        let seq = batch
            .column(2)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(seq.value(0), 7);
        let payload = batch
            .column(4)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(payload.value(0), "hello");
    }

    #[test]
    fn test_extraction_cells_and_nulls() {
        let schema = test_schema(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("zone", DataType::Utf8, true),
        ]);
        let mut builder = RowBatchBuilder::new(schema).unwrap();
        builder.append_row(
            "events",
            "a.x",
            1,
            0,
            b"{}",
            vec![Some(CellValue::I64(42)), None],
        );

        let batch = builder.finish().unwrap();
        let id = batch
            .column(5)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(id.value(0), 42);
        assert!(batch.column(6).is_null(0));
    }

    #[test]
    fn test_type_mismatch_becomes_null() {
        let schema = test_schema(vec![Field::new("id", DataType::Int64, true)]);
        let mut builder = RowBatchBuilder::new(schema).unwrap();
        builder.append_row(
            "events",
            "a.x",
            1,
            0,
            b"{}",
            vec![Some(CellValue::Str("not an int".into()))],
        );

        let batch = builder.finish().unwrap();
        assert!(batch.column(5).is_null(0));
    }

    #[test]
    fn test_binary_payload_mode() {
        let mut fields = vec![
            Field::new("stream", DataType::Utf8, false),
            Field::new("subject", DataType::Utf8, false),
            Field::new("seq", DataType::UInt64, false),
            Field::new(
                "ts_nats",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("payload", DataType::Binary, false),
        ];
        fields.push(Field::new("id", DataType::Int64, true));
        let schema = Arc::new(Schema::new(fields));

        let mut builder = RowBatchBuilder::new(schema).unwrap();
        builder.append_row("events", "a.x", 1, 0, &[0x08, 0x07], vec![None]);
        let batch = builder.finish().unwrap();
        let payload = batch
            .column(4)
            .as_any()
            .downcast_ref::<arrow_array::BinaryArray>()
            .unwrap();
        assert_eq!(payload.value(0), &[0x08, 0x07]);
    }
}
