use std::collections::HashMap;

use agent_core::QueryParameters;
use async_trait::async_trait;
use serde_json::Value;

/// The three abstract operations the dialog layer needs from an external
/// completion service. None of these methods return `Result`: per the
/// specification's fallback semantics, a transport or parse failure
/// degrades to the operation's own documented fallback value rather than
/// propagating as an error — only the retry policy inside the
/// implementation distinguishes transient from terminal failures.
#[async_trait]
pub trait LlmBridge: Send + Sync {
    /// Parses a user question into a full parameter record, or
    /// `{task: unknown}` on any parse failure.
    async fn extract_params(&self, question: &str, api_key: &str) -> QueryParameters;

    /// Extracts only the requested slots from a follow-up reply. Returns
    /// `None` if the model produced nothing usable for any requested slot.
    async fn fill_slots(
        &self,
        user_reply: &str,
        slots: &[String],
        api_key: &str,
    ) -> Option<HashMap<String, Value>>;

    /// Picks the best-matching candidate name for `alias`. Always returns
    /// a candidate; confidence is forced to 0 when the model's answer
    /// falls outside the candidate list or the call fails outright.
    async fn choose_alias(&self, alias: &str, candidates: &[String], api_key: &str) -> (String, f64);
}
