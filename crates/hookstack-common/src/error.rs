//! Unified error type for the hookstack workspace.
//!
//! Composition errors are raised synchronously at declaration or synthesis
//! time and are surfaced to the caller unmodified.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum HookstackError {
    /// A secret identifier is malformed, or a grant pattern does not cover it.
    #[error("invalid secret reference \"{identifier}\": {reason}")]
    InvalidReference {
        /// The rejected identifier.
        identifier: String,
        /// Why the identifier was rejected.
        reason: String,
    },

    /// A compute unit asked for a memory size outside provider bounds.
    #[error("invalid memory limit for \"{unit}\": {memory_mb} MB is outside {min}..={max} MB")]
    InvalidResourceLimit {
        /// Logical name of the compute unit.
        unit: String,
        /// Requested memory in MB.
        memory_mb: u32,
        /// Smallest accepted value.
        min: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// The compute unit already has an invocation endpoint.
    #[error("compute unit \"{unit}\" already has an invocation endpoint")]
    AlreadyBound {
        /// Logical name of the compute unit.
        unit: String,
    },

    /// A compute unit depends on a secret it has no permission to read.
    #[error("compute unit \"{unit}\" depends on secret \"{secret}\" but has no statement allowing it to be read")]
    IncompleteWiring {
        /// Logical name of the compute unit.
        unit: String,
        /// Identifier of the unreadable secret.
        secret: String,
    },

    /// The build-artifact descriptor is unusable.
    #[error("invalid build artifact for \"{unit}\": {message}")]
    InvalidArtifact {
        /// Logical name of the compute unit.
        unit: String,
        /// Description of the problem.
        message: String,
    },

    /// Two resources of the same kind share a logical name.
    #[error("duplicate {kind} name: \"{name}\"")]
    DuplicateName {
        /// Resource kind.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// The composer has already been synthesized.
    #[error("composition is frozen: cannot {operation} after synthesis")]
    CompositionFrozen {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A referenced resource does not belong to this composition.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// A YAML manifest or config file could not be parsed.
    #[error("manifest error: {source}")]
    Manifest {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// The provisioning engine rejected the deployment.
    #[error("provisioning failed ({engine}): {message}")]
    Provisioning {
        /// Name of the engine that failed.
        engine: String,
        /// Failure reported by the engine.
        message: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HookstackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_limit_message_names_bounds() {
        let err = HookstackError::InvalidResourceLimit {
            unit: "webhook".into(),
            memory_mb: 100_000,
            min: 128,
            max: 10_240,
        };
        let msg = err.to_string();
        assert!(msg.contains("100000 MB"), "got: {msg}");
        assert!(msg.contains("128..=10240"), "got: {msg}");
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: HookstackError = parse.unwrap_err().into();
        assert!(matches!(err, HookstackError::Serialization { .. }));
    }
}
