//! Runtime protobuf schema compilation and field-path resolution.
//!
//! A `.proto` file named in the scan arguments is compiled when the scan
//! binds, well before any message is fetched, so that extraction column
//! types can be declared up front. The containing directory doubles as the
//! lone import root, letting sibling files resolve. Compilation errors
//! carry the compiler's file:line:column diagnostics.

use std::path::Path;

use prost_reflect::{DescriptorPool, FieldDescriptor, Kind, MessageDescriptor};

use crate::error::{ScanError, ScanResult};

/// One dotted field path resolved against the loaded schema.
///
/// `segments` holds the descriptor chain from the root message to the
/// leaf; every non-terminal segment is a message-typed field.
#[derive(Clone)]
pub struct ResolvedPath {
    column: String,
    segments: Vec<FieldDescriptor>,
}

impl ResolvedPath {
    /// The output column name: the dotted path with dots replaced by
    /// underscores.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The descriptor chain from root to leaf.
    #[must_use]
    pub fn segments(&self) -> &[FieldDescriptor] {
        &self.segments
    }

    /// The leaf field descriptor.
    #[must_use]
    pub fn leaf(&self) -> &FieldDescriptor {
        self.segments
            .last()
            .expect("a resolved path has at least one segment")
    }
}

impl std::fmt::Debug for ResolvedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedPath")
            .field("column", &self.column)
            .field("leaf", &self.leaf().full_name())
            .finish_non_exhaustive()
    }
}

/// A compiled protobuf schema plus the pre-resolved extraction paths.
///
/// The descriptor pool is reference-counted, so cloning the projection is
/// cheap and every descriptor handed out stays valid for as long as any
/// clone lives.
#[derive(Clone)]
pub struct ProtoProjection {
    message: MessageDescriptor,
    paths: Vec<ResolvedPath>,
}

impl ProtoProjection {
    /// Compiles `proto_file`, looks up `message_name`, and resolves every
    /// dotted path in `field_paths`.
    ///
    /// The file's directory (defaulting to `.`) is used as the import
    /// root, so the file is compiled under its bare file name and sibling
    /// imports resolve against the same directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Schema`] when the file fails to compile (the
    /// message includes the compiler's accumulated diagnostics), when the
    /// message type is not found, or when a field path names an unknown
    /// field or traverses into a non-message field.
    pub fn compile(
        proto_file: &str,
        message_name: &str,
        field_paths: &[String],
    ) -> ScanResult<Self> {
        let path = Path::new(proto_file);
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ScanError::Argument(format!("invalid proto_file path: {proto_file}"))
            })?;
        let include_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let descriptor_set = protox::compile([file_name], [include_dir]).map_err(|err| {
            ScanError::Schema(format!(
                "failed to import protobuf schema file {proto_file}: {err}"
            ))
        })?;
        let pool = DescriptorPool::from_file_descriptor_set(descriptor_set).map_err(|err| {
            ScanError::Schema(format!(
                "failed to build descriptor pool for {proto_file}: {err}"
            ))
        })?;

        // Top-level short-name lookup on the imported file first, falling
        // back to a fully-qualified lookup across the pool.
        let message = pool
            .files()
            .find(|file| file.name() == file_name)
            .and_then(|file| file.messages().find(|m| m.name() == message_name))
            .or_else(|| pool.get_message_by_name(message_name))
            .ok_or_else(|| {
                ScanError::Schema(format!(
                    "message type '{message_name}' not found in {proto_file}"
                ))
            })?;

        let paths = field_paths
            .iter()
            .map(|path| resolve_path(&message, path))
            .collect::<ScanResult<Vec<_>>>()?;

        Ok(Self { message, paths })
    }

    /// The root message descriptor.
    #[must_use]
    pub fn message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// The resolved extraction paths, in argument order.
    #[must_use]
    pub fn paths(&self) -> &[ResolvedPath] {
        &self.paths
    }
}

impl std::fmt::Debug for ProtoProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtoProjection")
            .field("message", &self.message.full_name())
            .field(
                "paths",
                &self.paths.iter().map(ResolvedPath::column).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Walks a dotted path through nested message types, failing fast on the
/// first unknown field or non-message traversal.
fn resolve_path(root: &MessageDescriptor, field_path: &str) -> ScanResult<ResolvedPath> {
    let parts: Vec<&str> = field_path.split('.').collect();
    let mut current = root.clone();
    let mut segments = Vec::with_capacity(parts.len());

    for (i, part) in parts.iter().enumerate() {
        let field = current.get_field_by_name(part).ok_or_else(|| {
            ScanError::Schema(format!(
                "field '{part}' not found in message type '{}' (field path: {field_path})",
                current.name()
            ))
        })?;
        if i + 1 < parts.len() {
            match field.kind() {
                Kind::Message(next) => current = next,
                _ => {
                    return Err(ScanError::Schema(format!(
                        "field '{part}' is not a message type, cannot navigate to '{}' \
                         (field path: {field_path})",
                        parts[i + 1]
                    )));
                }
            }
        }
        segments.push(field);
    }

    Ok(ResolvedPath {
        column: field_path.replace('.', "_"),
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCHEMA: &str = r#"
syntax = "proto3";
package telemetry;

message Location {
  string zone = 1;
  string rack = 2;
}

message Telemetry {
  string device_id = 1;
  int64 ts = 2;
  Location location = 3;
}
"#;

    fn write_schema(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("telemetry.proto");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SCHEMA.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_compile_and_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir);
        let projection = ProtoProjection::compile(
            &path,
            "Telemetry",
            &["device_id".into(), "location.zone".into()],
        )
        .unwrap();

        assert_eq!(projection.message().name(), "Telemetry");
        assert_eq!(projection.paths().len(), 2);
        assert_eq!(projection.paths()[0].column(), "device_id");
        assert_eq!(projection.paths()[1].column(), "location_zone");
        assert_eq!(projection.paths()[1].segments().len(), 2);
        assert_eq!(projection.paths()[1].leaf().name(), "zone");
    }

    #[test]
    fn test_fully_qualified_message_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir);
        let projection =
            ProtoProjection::compile(&path, "telemetry.Telemetry", &["ts".into()]).unwrap();
        assert_eq!(projection.message().full_name(), "telemetry.Telemetry");
    }

    #[test]
    fn test_missing_file_reports_import_failure() {
        let err = ProtoProjection::compile("/nonexistent/t.proto", "T", &["x".into()])
            .unwrap_err();
        assert!(err.to_string().contains("failed to import"));
    }

    #[test]
    fn test_syntax_error_carries_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.proto");
        std::fs::write(&path, "syntax = \"proto3\";\nmessage Broken {").unwrap();
        let err =
            ProtoProjection::compile(path.to_str().unwrap(), "Broken", &["x".into()]).unwrap_err();
        assert!(err.to_string().contains("broken.proto"));
    }

    #[test]
    fn test_unknown_message_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir);
        let err = ProtoProjection::compile(&path, "Missing", &["x".into()]).unwrap_err();
        assert!(err.to_string().contains("message type 'Missing' not found"));
    }

    #[test]
    fn test_unknown_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir);
        let err = ProtoProjection::compile(&path, "Telemetry", &["nope".into()]).unwrap_err();
        assert!(err.to_string().contains("field 'nope' not found"));
        assert!(err.to_string().contains("Telemetry"));
    }

    #[test]
    fn test_unknown_nested_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir);
        let err =
            ProtoProjection::compile(&path, "Telemetry", &["location.nope".into()]).unwrap_err();
        assert!(err.to_string().contains("field 'nope' not found"));
        assert!(err.to_string().contains("Location"));
    }

    #[test]
    fn test_traversal_through_scalar_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_schema(&dir);
        let err =
            ProtoProjection::compile(&path, "Telemetry", &["device_id.zone".into()]).unwrap_err();
        assert!(err.to_string().contains("is not a message type"));
    }

    #[test]
    fn test_sibling_import_resolves() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("common.proto"),
            "syntax = \"proto3\";\npackage telemetry;\nmessage Tag { string name = 1; }\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("main.proto"),
            "syntax = \"proto3\";\npackage telemetry;\nimport \"common.proto\";\n\
             message Event { Tag tag = 1; }\n",
        )
        .unwrap();
        let path = dir.path().join("main.proto");
        let projection =
            ProtoProjection::compile(path.to_str().unwrap(), "Event", &["tag.name".into()])
                .unwrap();
        assert_eq!(projection.paths()[0].column(), "tag_name");
    }
}
