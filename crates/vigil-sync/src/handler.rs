use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;
use vigil_core::VigilResult;

/// The side-effect contract for task handlers.
///
/// The concrete third-party page-management client lives outside this
/// subsystem; the consumer only needs these two operations. Handlers are
/// expected to enforce their own timeouts — a stuck call stalls the current
/// tick.
#[async_trait]
pub trait PageService: Send + Sync {
    /// Append a log entry to an existing target page.
    async fn append_entry(
        &self,
        agent_id: &str,
        target_ref: &str,
        content: &str,
    ) -> VigilResult<()>;

    /// Create a new target page, returning its reference.
    async fn create_page(&self, agent_id: &str, content: &str) -> VigilResult<String>;
}

/// Stand-in handler that logs each would-be write instead of calling a real
/// page backend. Default wiring when no backend is configured.
pub struct LoggingPageService;

#[async_trait]
impl PageService for LoggingPageService {
    async fn append_entry(
        &self,
        agent_id: &str,
        target_ref: &str,
        content: &str,
    ) -> VigilResult<()> {
        info!(
            agent_id = %agent_id,
            target_ref = %target_ref,
            content_len = content.len(),
            "append entry"
        );
        Ok(())
    }

    async fn create_page(&self, agent_id: &str, content: &str) -> VigilResult<String> {
        let page_ref = Uuid::new_v4().to_string();
        info!(
            agent_id = %agent_id,
            page_ref = %page_ref,
            content_len = content.len(),
            "create page"
        );
        Ok(page_ref)
    }
}
