//! Request-scoped tenant context.
//!
//! Every request task that serves a resolved tenant carries a
//! [`TenantBinding`] in task-local storage. Connection checkout hooks
//! read it to bind the session search path, so a stale or wrong binding
//! here is the worst failure mode of the whole subsystem: it would
//! expose one tenant's data to another.
//!
//! The store is scope-based rather than set/clear-based: [`scope`] runs
//! a future with the binding installed and tears it down when the future
//! completes, errors, panics, or is cancelled. There is no process-wide
//! mutable state; concurrent request tasks each see only their own
//! binding.

use crate::ident::SchemaName;

tokio::task_local! {
    static CURRENT_TENANT: Option<TenantBinding>;
}

/// The per-request tenant binding: the schema to bind connections to and
/// the slug it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantBinding {
    schema: SchemaName,
    slug: String,
}

impl TenantBinding {
    /// Creates a binding from a validated schema name and slug.
    pub fn new(schema: SchemaName, slug: impl Into<String>) -> Self {
        Self {
            schema,
            slug: slug.into(),
        }
    }

    /// Returns the schema to bind connections to.
    pub fn schema(&self) -> &SchemaName {
        &self.schema
    }

    /// Returns the tenant slug.
    pub fn slug(&self) -> &str {
        &self.slug
    }
}

/// Runs `fut` with `binding` installed as the current tenant for the
/// duration of the future.
///
/// The binding is visible from any point reached while polling `fut` on
/// the same task, including connection checkout hooks. Teardown is
/// guaranteed by the task-local scope on every exit path, so a cancelled
/// request can never leave a binding behind for the next user of the
/// task slot.
pub async fn scope<F>(binding: TenantBinding, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(Some(binding), fut).await
}

/// Runs `fut` with no tenant bound, shadowing any outer binding.
///
/// Used for operations that must run against the shared/public area
/// while a request context is active (e.g. registry reads).
pub async fn scope_public<F>(fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(None, fut).await
}

/// Returns the current tenant binding, or `None` when the calling task
/// has no tenant in scope.
pub fn current() -> Option<TenantBinding> {
    CURRENT_TENANT.try_with(|b| b.clone()).ok().flatten()
}

/// Returns the current tenant's schema, if any.
pub fn current_schema() -> Option<SchemaName> {
    current().map(|b| b.schema)
}

/// Returns the current tenant's slug, if any.
pub fn current_slug() -> Option<String> {
    current().map(|b| b.slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(slug: &str) -> TenantBinding {
        let schema = SchemaName::parse(&format!("tenant_{slug}")).unwrap();
        TenantBinding::new(schema, slug)
    }

    #[tokio::test]
    async fn test_no_binding_outside_scope() {
        assert!(current().is_none());
        assert!(current_schema().is_none());
    }

    #[tokio::test]
    async fn test_binding_visible_inside_scope() {
        scope(binding("acme"), async {
            let b = current().expect("binding should be set");
            assert_eq!(b.slug(), "acme");
            assert_eq!(b.schema().as_str(), "tenant_acme");
        })
        .await;

        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_binding_survives_await_points() {
        scope(binding("acme"), async {
            tokio::task::yield_now().await;
            assert_eq!(current_slug().as_deref(), Some("acme"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_nested_scope_shadows_outer() {
        scope(binding("outer"), async {
            scope(binding("inner"), async {
                assert_eq!(current_slug().as_deref(), Some("inner"));
            })
            .await;
            assert_eq!(current_slug().as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_scope_public_shadows_binding() {
        scope(binding("acme"), async {
            scope_public(async {
                assert!(current().is_none());
            })
            .await;
            assert_eq!(current_slug().as_deref(), Some("acme"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_concurrent_tasks_are_isolated() {
        let a = tokio::spawn(scope(binding("alpha"), async {
            tokio::task::yield_now().await;
            current_slug()
        }));
        let b = tokio::spawn(scope(binding("beta"), async {
            tokio::task::yield_now().await;
            current_slug()
        }));

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a.as_deref(), Some("alpha"));
        assert_eq!(b.as_deref(), Some("beta"));
    }

    #[tokio::test]
    async fn test_binding_cleared_after_panic() {
        let result = tokio::spawn(scope(binding("acme"), async {
            panic!("handler blew up");
        }))
        .await;
        assert!(result.is_err());

        // The panicking task's scope is gone; this task never saw it.
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_binding_cleared_after_cancellation() {
        let task = tokio::spawn(scope(binding("acme"), async {
            // Parked until cancelled.
            std::future::pending::<()>().await;
        }));
        task.abort();
        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());

        assert!(current().is_none());
    }
}
