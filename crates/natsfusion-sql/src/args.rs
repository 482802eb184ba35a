//! Argument binding for the `nats_scan` table function.
//!
//! DataFusion table functions receive positional literal expressions, so
//! the scan's named options ride in as `'name=value'` string literals
//! after the required stream name:
//!
//! ```sql
//! SELECT * FROM nats_scan('telemetry', 'subject=sensors.', 'start_seq=100');
//! ```
//!
//! List-valued options take comma-separated values
//! (`'json_extract=device_id,power_kw'`); time options take RFC 3339 or
//! `YYYY-MM-DD HH:MM:SS[.fff]` timestamps, interpreted as UTC and carried
//! as nanoseconds.

use chrono::{DateTime, NaiveDateTime};
use datafusion_common::{plan_err, DataFusionError, Result, ScalarValue};
use datafusion_expr::Expr;
use natsfusion_connector::ScanConfig;

/// Timestamp patterns accepted for `start_time` / `end_time`, tried after
/// RFC 3339; first match wins.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses the `nats_scan` argument list into a validated [`ScanConfig`].
pub(crate) fn parse_scan_args(args: &[Expr]) -> Result<ScanConfig> {
    let Some(first) = args.first() else {
        return plan_err!("nats_scan requires at least one argument: the stream name");
    };
    let mut config = ScanConfig::new(string_literal(first)?);

    for arg in &args[1..] {
        let option = string_literal(arg)?;
        let Some((key, value)) = option.split_once('=') else {
            return plan_err!(
                "nats_scan options must be 'name=value' strings, got '{option}'"
            );
        };
        apply_option(&mut config, key.trim(), value)?;
    }

    config
        .validate()
        .map_err(|err| DataFusionError::Plan(err.to_string()))?;
    Ok(config)
}

/// Extracts a string literal argument.
fn string_literal(expr: &Expr) -> Result<&str> {
    match expr {
        Expr::Literal(
            ScalarValue::Utf8(Some(s))
            | ScalarValue::LargeUtf8(Some(s))
            | ScalarValue::Utf8View(Some(s)),
            _,
        ) => Ok(s),
        other => plan_err!("nats_scan arguments must be string literals, got {other:?}"),
    }
}

fn apply_option(config: &mut ScanConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "subject" => config.subject_filter = value.to_string(),
        "url" => config.url = value.to_string(),
        "start_seq" => config.start_seq = parse_u64(key, value)?,
        "end_seq" => config.end_seq = parse_u64(key, value)?,
        "start_time" => config.start_time_ns = parse_timestamp_micros(key, value)? * 1000,
        "end_time" => config.end_time_ns = parse_timestamp_micros(key, value)? * 1000,
        "json_extract" => config.json_fields = parse_list(value),
        "proto_file" => config.proto_file = value.trim().to_string(),
        "proto_message" => config.proto_message = value.trim().to_string(),
        "proto_extract" => config.proto_fields = parse_list(value),
        other => return plan_err!("unknown nats_scan option '{other}'"),
    }
    Ok(())
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| DataFusionError::Plan(format!("invalid {key} value '{value}'")))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parses a timestamp option to microseconds since the Unix epoch.
fn parse_timestamp_micros(key: &str, value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.timestamp_micros());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts.and_utc().timestamp_micros());
        }
    }
    plan_err!(
        "invalid {key} timestamp '{value}': expected RFC 3339 or 'YYYY-MM-DD HH:MM:SS[.fff]'"
    )
}
