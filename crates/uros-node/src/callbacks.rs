//! The application callback surface a node embedder must provide. One
//! method per external-collaborator contract named in the runtime's
//! external-interfaces surface; every method has a default so an app only
//! overrides what it actually uses.

use tracing::error;
use uros_base::{ParamValue, UrosResult};
use uros_registry::Registry;

/// Everything the supervisor calls into during boot (step 6), drain
/// (step 2), and the `paramUpdate` Slave-API path.
pub trait AppCallbacks: Send + Sync {
    /// Diagnostic sink; default routes to structured logging.
    fn user_err_printf(&self, message: &str) {
        error!(%message, "application error");
    }

    /// Reaction to a Master-initiated or locally-initiated shutdown.
    /// Must be idempotent — the supervisor calls this at most once per
    /// drain, but a caller may invoke `shutdown` twice.
    fn user_shutdown(&self, reason: &str) {
        let _ = reason;
    }

    /// Populates the type catalog; called once during boot step 3.
    fn user_register_static_types(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_publish_topics(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_unpublish_topics(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_subscribe_topics(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_unsubscribe_topics(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_publish_services(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_unpublish_services(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_subscribe_params(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    fn user_unsubscribe_params(&self, registry: &Registry) -> UrosResult<()> {
        let _ = registry;
        Ok(())
    }

    /// Rejects with `BadParam` on a type/range error; the Slave dispatch
    /// turns that into RPC failure code 0.
    fn user_param_update(&self, key: &str, value: ParamValue) -> UrosResult<()> {
        let _ = (key, value);
        Ok(())
    }
}
