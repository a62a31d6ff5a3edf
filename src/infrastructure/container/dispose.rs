//! Disposal hooks for singleton services

use crate::errors::BoxError;

/// A service that must release resources when its registry is torn down.
///
/// `Drop` still runs once the last handle goes away; `dispose` is for
/// cleanup that can fail and whose failure the application wants to see.
pub trait Disposable: Send + Sync {
    fn dispose(&self) -> Result<(), BoxError>;
}
