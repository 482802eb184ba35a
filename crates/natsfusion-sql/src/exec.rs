//! Execution plan for a NATS stream scan.
//!
//! [`NatsScanExec`] is a leaf node: a single bounded partition whose
//! stream adapts the connector's pull-based [`StreamScan`] into
//! DataFusion's `RecordBatchStream` contract. The broker connection is
//! only made when the stream is first polled.

use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use datafusion::execution::{SendableRecordBatchStream, TaskContext};
use datafusion::physical_expr::EquivalenceProperties;
use datafusion::physical_plan::execution_plan::{Boundedness, EmissionType};
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::{
    DisplayAs, DisplayFormatType, ExecutionPlan, Partitioning, PlanProperties,
};
use datafusion_common::DataFusionError;

use natsfusion_connector::{NatsFetcher, ProtoProjection, ScanConfig, StreamScan};

/// A `DataFusion` execution plan that scans one JetStream sequence window.
///
/// # Properties
///
/// - Single partition: rows are emitted in ascending sequence order and
///   the broker is probed one sequence at a time.
/// - Bounded: the window is clamped to the stream's last sequence at open.
/// - Incremental emission, one batch per poll.
pub struct NatsScanExec {
    config: Arc<ScanConfig>,
    proto: Option<ProtoProjection>,
    /// Full output schema, before projection.
    scan_schema: SchemaRef,
    /// Column projection (None = all columns).
    projection: Option<Vec<usize>>,
    /// Output schema after projection.
    projected_schema: SchemaRef,
    /// Cached plan properties.
    properties: PlanProperties,
}

impl NatsScanExec {
    /// Creates the plan, projecting the scan schema when the engine asked
    /// for a column subset.
    ///
    /// # Errors
    ///
    /// Returns an error when a projection index is out of range.
    pub fn try_new(
        config: Arc<ScanConfig>,
        proto: Option<ProtoProjection>,
        scan_schema: SchemaRef,
        projection: Option<Vec<usize>>,
    ) -> Result<Self, DataFusionError> {
        let projected_schema = match &projection {
            Some(indices) => Arc::new(scan_schema.project(indices)?),
            None => Arc::clone(&scan_schema),
        };
        let properties = PlanProperties::new(
            EquivalenceProperties::new(Arc::clone(&projected_schema)),
            Partitioning::UnknownPartitioning(1),
            EmissionType::Incremental,
            Boundedness::Bounded,
        );
        Ok(Self {
            config,
            proto,
            scan_schema,
            projection,
            projected_schema,
            properties,
        })
    }
}

impl Debug for NatsScanExec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsScanExec")
            .field("stream", &self.config.stream_name)
            .field("projection", &self.projection)
            .finish_non_exhaustive()
    }
}

impl DisplayAs for NatsScanExec {
    fn fmt_as(&self, t: DisplayFormatType, f: &mut Formatter<'_>) -> std::fmt::Result {
        match t {
            DisplayFormatType::Default | DisplayFormatType::Verbose => {
                write!(f, "NatsScanExec: stream={}", self.config.stream_name)?;
                if self.config.has_sequence_window() {
                    write!(
                        f,
                        ", seq=[{}, {}]",
                        self.config.start_seq, self.config.end_seq
                    )?;
                }
                if let Some(projection) = &self.projection {
                    write!(f, ", projection={projection:?}")?;
                }
                Ok(())
            }
            DisplayFormatType::TreeRender => write!(f, "NatsScanExec"),
        }
    }
}

impl ExecutionPlan for NatsScanExec {
    fn name(&self) -> &'static str {
        "NatsScanExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.projected_schema)
    }

    fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> Result<Arc<dyn ExecutionPlan>, DataFusionError> {
        if children.is_empty() {
            Ok(self)
        } else {
            Err(DataFusionError::Plan(
                "NatsScanExec cannot have children".to_string(),
            ))
        }
    }

    fn execute(
        &self,
        partition: usize,
        context: Arc<TaskContext>,
    ) -> Result<SendableRecordBatchStream, DataFusionError> {
        if partition != 0 {
            return Err(DataFusionError::Plan(format!(
                "NatsScanExec only supports partition 0, got {partition}"
            )));
        }

        let batch_size = context.session_config().batch_size();
        let fetcher = Box::new(NatsFetcher::new(&self.config));
        let scan = StreamScan::new(
            Arc::clone(&self.config),
            self.proto.clone(),
            Arc::clone(&self.scan_schema),
            fetcher,
            batch_size,
        );
        let projection = self.projection.clone();

        let stream = futures::stream::try_unfold(scan, move |mut scan| {
            let projection = projection.clone();
            async move {
                match scan.next_batch().await {
                    Ok(Some(batch)) => {
                        let batch = match &projection {
                            Some(indices) => {
                                batch.project(indices).map_err(DataFusionError::from)?
                            }
                            None => batch,
                        };
                        Ok(Some((batch, scan)))
                    }
                    Ok(None) => Ok(None),
                    Err(err) => Err(DataFusionError::External(Box::new(err))),
                }
            }
        });

        Ok(Box::pin(RecordBatchStreamAdapter::new(
            Arc::clone(&self.projected_schema),
            stream,
        )))
    }
}
