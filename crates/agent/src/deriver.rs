//! Best-effort package derivation from a closed session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use conclave_core::domain::crm::CrmSnapshot;
use conclave_core::domain::package::{ResolutionMode, ResolutionPackage};
use conclave_core::domain::session::{AgentProfile, Session, TranscriptMessage};

use crate::llm::{collect_response, GenerationRequest, LlmClient};
use crate::parser::parse_package;
use crate::prompt::build_derivation_prompt;
use crate::DeriveError;

pub struct PackageDeriver {
    llm: Arc<dyn LlmClient>,
    stream_timeout: Duration,
}

impl PackageDeriver {
    pub fn new(llm: Arc<dyn LlmClient>, stream_timeout: Duration) -> Self {
        Self { llm, stream_timeout }
    }

    /// Derives a resolution package from the session transcript.
    ///
    /// Best-effort by contract: any generation or parse failure yields
    /// `None` so session closure is never blocked. Sessions with mode
    /// `none` return `None` without a model call.
    pub async fn derive(
        &self,
        session: &Session,
        transcript: &[TranscriptMessage],
        summary: &str,
        profiles: &[AgentProfile],
        snapshot: &CrmSnapshot,
    ) -> Option<ResolutionPackage> {
        if session.mode == ResolutionMode::None {
            debug!(session_id = %session.id, "resolution mode is none; skipping derivation");
            return None;
        }

        match self.try_derive(session, transcript, summary, profiles, snapshot).await {
            Ok(package) => Some(package),
            Err(error) => {
                warn!(session_id = %session.id, %error, "package derivation failed; no package produced");
                None
            }
        }
    }

    async fn try_derive(
        &self,
        session: &Session,
        transcript: &[TranscriptMessage],
        summary: &str,
        profiles: &[AgentProfile],
        snapshot: &CrmSnapshot,
    ) -> Result<ResolutionPackage, DeriveError> {
        let prompt = build_derivation_prompt(session, transcript, summary, profiles, snapshot);
        let request = GenerationRequest {
            prompt,
            idempotency_key: format!("derive-{}", session.id),
        };

        let events = self.llm.stream_generate(request).await?;
        let candidate = collect_response(events, self.stream_timeout).await?;
        let package = parse_package(&candidate, session)?;
        package.validate()?;
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc;

    use conclave_core::domain::crm::CrmSnapshot;
    use conclave_core::domain::package::{ItemStatus, ResolutionMode};
    use conclave_core::domain::session::{Session, SessionMetadata};

    use crate::llm::{GenerationRequest, LlmClient, StreamEvent};
    use crate::DeriveError;

    use super::PackageDeriver;

    struct ScriptedLlm {
        events: Vec<StreamEvent>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(events: Vec<StreamEvent>) -> Self {
            Self { events, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn stream_generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<mpsc::Receiver<StreamEvent>, DeriveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel(16);
            for event in self.events.clone() {
                tx.send(event).await.expect("scripted send");
            }
            Ok(rx)
        }
    }

    fn session(mode: ResolutionMode) -> Session {
        Session {
            id: "sess-1".to_string(),
            title: "Roadmap review".to_string(),
            description: String::new(),
            mode,
            participant_ids: vec!["agent-a".to_string(), "agent-b".to_string()],
            metadata: SessionMetadata::default(),
            created_at: Utc::now(),
        }
    }

    const RESPONSE: &str = r#"{"items": [{
        "id": "m1",
        "type": "mission",
        "data": {"title": "Draft roadmap doc", "agent_id": "agent-a"},
        "source_excerpt": "let's write the roadmap down"
    }]}"#;

    #[tokio::test]
    async fn mode_none_returns_none_without_a_model_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![StreamEvent::Completed(RESPONSE.to_string())]));
        let deriver = PackageDeriver::new(llm.clone(), Duration::from_secs(5));

        let package = deriver
            .derive(&session(ResolutionMode::None), &[], "summary", &[], &CrmSnapshot::default())
            .await;

        assert!(package.is_none());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_stream_yields_a_pending_package() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            StreamEvent::Delta(RESPONSE[..20].to_string()),
            StreamEvent::Completed(RESPONSE.to_string()),
        ]));
        let deriver = PackageDeriver::new(llm, Duration::from_secs(5));

        let package = deriver
            .derive(&session(ResolutionMode::Propose), &[], "summary", &[], &CrmSnapshot::default())
            .await
            .expect("package");

        assert_eq!(package.session_id, "sess-1");
        assert_eq!(package.mode, ResolutionMode::Propose);
        assert!(package.items.iter().all(|item| item.status == ItemStatus::Pending));
    }

    #[tokio::test]
    async fn stream_error_yields_none_not_a_panic() {
        let llm = Arc::new(ScriptedLlm::new(vec![StreamEvent::Error("model overloaded".to_string())]));
        let deriver = PackageDeriver::new(llm, Duration::from_secs(5));

        let package = deriver
            .derive(&session(ResolutionMode::Auto), &[], "summary", &[], &CrmSnapshot::default())
            .await;
        assert!(package.is_none());
    }

    #[tokio::test]
    async fn unparsable_response_yields_none() {
        let llm = Arc::new(ScriptedLlm::new(vec![StreamEvent::Completed(
            "no structured payload here".to_string(),
        )]));
        let deriver = PackageDeriver::new(llm, Duration::from_secs(5));

        let package = deriver
            .derive(&session(ResolutionMode::Propose), &[], "summary", &[], &CrmSnapshot::default())
            .await;
        assert!(package.is_none());
    }
}
