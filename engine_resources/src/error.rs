//! Recoverable resource errors.
//!
//! Programming faults (refcount underflow, foreign or stale handles, double
//! unregister) are not represented here: they panic at the call site.

use thiserror::Error;

/// Errors reported to the caller of a resource operation.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The document does not match the kind's descriptor schema.
    #[error("malformed {class} document for '{name}'")]
    MalformedData {
        class: &'static str,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The kind's `load` failed (including sub-resource acquisition).
    #[error("failed to load {class} '{name}'")]
    Load {
        class: &'static str,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A resource (transitively) requested itself while loading.
    #[error("cyclic resource dependency: {}", .chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    /// No kind with this class name has been registered.
    #[error("unknown resource class '{0}'")]
    UnknownClass(String),
}

impl ResourceError {
    /// Whether this error was caused by a dependency cycle anywhere in the load chain.
    pub fn is_cyclic(&self) -> bool {
        match self {
            ResourceError::CyclicDependency { .. } => true,
            ResourceError::Load { source, .. } => chain_is_cyclic(source),
            _ => false,
        }
    }
}

pub(crate) fn chain_is_cyclic(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ResourceError>(),
            Some(ResourceError::CyclicDependency { .. })
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_is_found_through_nested_load_errors() {
        let cycle = ResourceError::CyclicDependency {
            chain: vec!["Material 'a'".into(), "Material 'a'".into()],
        };
        let inner = ResourceError::Load {
            class: "Texture",
            name: "b".into(),
            source: anyhow::Error::from(cycle),
        };
        let outer = ResourceError::Load {
            class: "Material",
            name: "a".into(),
            source: anyhow::Error::from(inner),
        };
        assert!(outer.is_cyclic());
        assert_eq!(
            ResourceError::UnknownClass("Foo".into()).to_string(),
            "unknown resource class 'Foo'"
        );
    }

    #[test]
    fn plain_load_failure_is_not_cyclic() {
        let err = ResourceError::Load {
            class: "Mesh",
            name: "quad".into(),
            source: anyhow::anyhow!("index out of range"),
        };
        assert!(!err.is_cyclic());
    }
}
