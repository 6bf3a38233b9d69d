/// The failure kinds of conformance bound computations.
///
/// Functions in this crate return `anyhow::Result`; when one of these kinds applies, the
/// underlying error is a `BoundsError` and can be recovered with `downcast_ref::<BoundsError>()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundsError {
    /// The behavior graph of a trace is malformed, or the trace has no realisations.
    InvalidTraceGraph(String),
    /// The alignment or enumeration collaborator failed, e.g. no final state is reachable.
    OracleFailure(String),
}

impl std::fmt::Display for BoundsError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BoundsError::InvalidTraceGraph(msg) => write!(f, "invalid trace graph: {}", msg),
            BoundsError::OracleFailure(msg) => write!(f, "alignment oracle failed: {}", msg),
        }
    }
}

impl std::error::Error for BoundsError {}

/// Returns the `BoundsError` at the root of `error`, if there is one.
pub fn bounds_error(error: &anyhow::Error) -> Option<&BoundsError> {
    //a BoundsError attached as context is only visible to anyhow's own downcast
    error
        .downcast_ref::<BoundsError>()
        .or_else(|| error.chain().find_map(|cause| cause.downcast_ref::<BoundsError>()))
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, anyhow};

    use super::{BoundsError, bounds_error};

    #[test]
    fn bounds_error_as_root() {
        let err = anyhow::Error::from(BoundsError::InvalidTraceGraph("cycle".to_string()))
            .context("trace 3");
        assert_eq!(
            bounds_error(&err),
            Some(&BoundsError::InvalidTraceGraph("cycle".to_string()))
        );
    }

    #[test]
    fn bounds_error_as_context() {
        let err = anyhow!("transition 2 is not enabled")
            .context(BoundsError::OracleFailure("enumeration".to_string()))
            .context("trace 0");
        assert!(
            err.chain()
                .all(|cause| cause.downcast_ref::<BoundsError>().is_none())
        );
        assert_eq!(
            bounds_error(&err),
            Some(&BoundsError::OracleFailure("enumeration".to_string()))
        );
    }

    #[test]
    fn bounds_error_absent() {
        let err: anyhow::Result<()> = Err(anyhow!("io")).context("reading");
        assert_eq!(bounds_error(&err.unwrap_err()), None);
    }
}
