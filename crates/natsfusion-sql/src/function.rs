//! The `nats_scan` table function and its registration.

use std::sync::Arc;

use datafusion::catalog::{TableFunctionImpl, TableProvider};
use datafusion::prelude::SessionContext;
use datafusion_common::{DataFusionError, Result};
use datafusion_expr::Expr;
use tracing::debug;

use crate::args::parse_scan_args;
use crate::provider::NatsStreamProvider;

/// `nats_scan(stream_name [, 'option=value', ...])` → stream rows.
///
/// Binding parses the arguments, compiles any protobuf schema, and
/// synthesises the output schema; no broker connection is made until the
/// query executes. See [`crate::args`] for the option surface.
#[derive(Debug, Default)]
pub struct NatsScanFunc;

impl TableFunctionImpl for NatsScanFunc {
    fn call(&self, args: &[Expr]) -> Result<Arc<dyn TableProvider>> {
        let config = parse_scan_args(args)?;
        debug!(stream = %config.stream_name, "binding nats_scan");
        let provider = NatsStreamProvider::try_new(config)
            .map_err(|err| DataFusionError::Plan(err.to_string()))?;
        Ok(Arc::new(provider))
    }
}

/// Registers the `nats_scan` table function on a `SessionContext`.
pub fn register_nats_scan(ctx: &SessionContext) {
    ctx.register_udtf("nats_scan", Arc::new(NatsScanFunc));
}
