//! Table provider for a bound `nats_scan` call.
//!
//! [`NatsStreamProvider`] is created at bind time and owns everything the
//! scan needs before execution: the immutable configuration, the compiled
//! protobuf projection (whose descriptor pool must outlive every dynamic
//! message the scan parses), and the synthesised output schema.

use std::any::Any;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use datafusion::catalog::Session;
use datafusion::datasource::{TableProvider, TableType};
use datafusion::error::DataFusionError;
use datafusion::logical_expr::Expr;
use datafusion::physical_plan::ExecutionPlan;

use natsfusion_connector::{output_schema, ProtoProjection, ScanConfig, ScanResult};

use crate::exec::NatsScanExec;

/// A `TableProvider` exposing one JetStream stream scan.
pub struct NatsStreamProvider {
    config: Arc<ScanConfig>,
    proto: Option<ProtoProjection>,
    schema: SchemaRef,
}

impl NatsStreamProvider {
    /// Validates the configuration, compiles the protobuf schema when
    /// protobuf extraction is requested, and synthesises the output
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns the configuration's validation error, or a schema error
    /// when the `.proto` file fails to compile or a field path does not
    /// resolve.
    pub fn try_new(config: ScanConfig) -> ScanResult<Self> {
        config.validate()?;
        let proto = if config.has_proto_extraction() {
            Some(ProtoProjection::compile(
                &config.proto_file,
                &config.proto_message,
                &config.proto_fields,
            )?)
        } else {
            None
        };
        let schema = output_schema(&config, proto.as_ref());
        Ok(Self {
            config: Arc::new(config),
            proto,
            schema,
        })
    }

    /// The bound scan configuration.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

#[async_trait]
impl TableProvider for NatsStreamProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        _filters: &[Expr],
        _limit: Option<usize>,
    ) -> Result<Arc<dyn ExecutionPlan>, DataFusionError> {
        let exec = NatsScanExec::try_new(
            Arc::clone(&self.config),
            self.proto.clone(),
            Arc::clone(&self.schema),
            projection.cloned(),
        )?;
        Ok(Arc::new(exec))
    }
}

impl std::fmt::Debug for NatsStreamProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsStreamProvider")
            .field("stream", &self.config.stream_name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::DataType;
    use natsfusion_connector::FIXED_COLUMNS;

    #[test]
    fn test_plain_provider_schema() {
        let provider = NatsStreamProvider::try_new(ScanConfig::new("events")).unwrap();
        assert_eq!(provider.schema().fields().len(), FIXED_COLUMNS);
        assert_eq!(provider.table_type(), TableType::Base);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ScanConfig::new("events");
        config.start_seq = 1;
        config.start_time_ns = 1;
        assert!(NatsStreamProvider::try_new(config).is_err());
    }

    #[test]
    fn test_proto_compilation_happens_at_bind() {
        let mut config = ScanConfig::new("events");
        config.proto_file = "/nonexistent/schema.proto".into();
        config.proto_message = "T".into();
        config.proto_fields = vec!["id".into()];
        let err = NatsStreamProvider::try_new(config).unwrap_err();
        assert!(err.to_string().contains("failed to import"));
    }

    #[tokio::test]
    async fn test_scan_produces_single_partition_plan() {
        use datafusion::physical_plan::ExecutionPlanProperties;
        use datafusion::prelude::SessionContext;

        let provider = NatsStreamProvider::try_new(ScanConfig::new("events")).unwrap();
        let ctx = SessionContext::new();
        let state = ctx.state();
        let plan = provider.scan(&state, None, &[], None).await.unwrap();
        assert_eq!(plan.output_partitioning().partition_count(), 1);
    }

    #[tokio::test]
    async fn test_scan_projection_narrows_schema() {
        use datafusion::prelude::SessionContext;

        let provider = NatsStreamProvider::try_new(ScanConfig::new("events")).unwrap();
        let ctx = SessionContext::new();
        let state = ctx.state();
        let plan = provider
            .scan(&state, Some(&vec![2, 1]), &[], None)
            .await
            .unwrap();
        let schema = plan.schema();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).name(), "seq");
        assert_eq!(schema.field(0).data_type(), &DataType::UInt64);
        assert_eq!(schema.field(1).name(), "subject");
    }

    #[test]
    fn test_debug_output() {
        let provider = NatsStreamProvider::try_new(ScanConfig::new("events")).unwrap();
        let debug = format!("{provider:?}");
        assert!(debug.contains("NatsStreamProvider"));
        assert!(debug.contains("events"));
    }
}
