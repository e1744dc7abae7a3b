use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the resolution engine.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolverError {
    /// The requires graph contains at least one cycle; no partial result
    /// is committed and the graph's availability data is untouched.
    #[error("cyclic dependency system: {cycles}")]
    #[diagnostic(help(
        "break the cycle by removing or re-declaring one of the listed elements, then resolve again"
    ))]
    CyclicSystem { cycles: String },
}

/// Convenience alias for resolver results.
pub type Result<T> = std::result::Result<T, ResolverError>;
