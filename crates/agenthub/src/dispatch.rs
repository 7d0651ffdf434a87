use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::models::agent::AgentDescriptor;
use crate::models::reply::AgentReply;
use crate::models::request::{AskContext, AskRequest};

pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 20;

/// Calls after the first failure
const RETRIES: usize = 1;

/// Body posted to an agent's `ask` endpoint
#[derive(Debug, Serialize)]
struct AgentPayload<'a> {
    session_id: &'a str,
    model_id: &'a str,
    user: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a AskContext>,
}

/// Sends a request to every selected agent at once and waits for all of them
pub struct Dispatcher {
    client: Client,
    timeout: Duration,
}

impl Dispatcher {
    /// `timeout` bounds each attempt separately; a retried call may take twice as long
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client, timeout })
    }

    /// Returns exactly one reply per entry of `selection`, in selection order.
    ///
    /// An alias appearing twice is called twice.
    pub async fn dispatch(
        &self,
        selection: &[String],
        catalog: &[AgentDescriptor],
        request: &AskRequest,
    ) -> Vec<AgentReply> {
        let calls = selection.iter().map(|alias| async move {
            match catalog.iter().find(|agent| &agent.alias == alias) {
                Some(agent) => self.call_agent(agent, request).await,
                None => AgentReply::failed(alias.as_str(), 0, "agent is not in the catalog"),
            }
        });

        join_all(calls).await
    }

    async fn call_agent(&self, agent: &AgentDescriptor, request: &AskRequest) -> AgentReply {
        let payload = AgentPayload {
            session_id: &request.session_id,
            model_id: agent.preferred_model(&request.model_id),
            user: &request.user,
            prompt: &request.prompt,
            context: request.context.as_ref(),
        };
        let url = agent.endpoint("ask");

        let started = Instant::now();
        let mut attempt = 0;
        let result = loop {
            match self.attempt(&url, &payload).await {
                Ok(data) => break Ok(data),
                Err(err) if attempt < RETRIES => {
                    warn!(agent = %agent.alias, error = %err, "agent call failed, retrying");
                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        };
        let time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(data) => {
                info!(agent = %agent.alias, time_ms, "agent answered");
                AgentReply::answered(agent.alias.as_str(), time_ms, data)
            }
            Err(err) => {
                warn!(agent = %agent.alias, time_ms, error = %err, "agent failed");
                AgentReply::failed(agent.alias.as_str(), time_ms, err)
            }
        }
    }

    async fn attempt(&self, url: &str, payload: &AgentPayload<'_>) -> Result<Value, String> {
        let call = async {
            let response = self
                .client
                .post(url)
                .json(payload)
                .send()
                .await
                .map_err(|err| format!("request failed: {}", err))?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("HTTP {}", status.as_u16()));
            }

            response
                .json::<Value>()
                .await
                .map_err(|err| format!("invalid reply: {}", err))
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {:?}", self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> AskRequest {
        AskRequest::new("s1", "gpt-4o", "alice", "find experts on rice genetics")
    }

    async fn agent_server(alias: &str, response: ResponseTemplate) -> (MockServer, AgentDescriptor) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(response)
            .mount(&server)
            .await;
        let agent = AgentDescriptor::new(alias, alias.to_uppercase(), server.uri());
        (server, agent)
    }

    fn answer(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"content_markdown": text}))
    }

    #[tokio::test]
    async fn test_one_reply_per_alias_in_selection_order() {
        let (_a, papers) = agent_server(
            "papers",
            answer("three papers").set_delay(Duration::from_millis(150)),
        )
        .await;
        let (_b, experts) = agent_server("experts", ResponseTemplate::new(500)).await;

        let dispatcher = Dispatcher::new(Duration::from_secs(5)).unwrap();
        let selection = vec!["papers".to_string(), "experts".to_string(), "ghost".to_string()];
        let replies = dispatcher
            .dispatch(&selection, &[papers, experts], &request())
            .await;

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0].alias, "papers");
        assert_eq!(replies[0].data().unwrap()["content_markdown"], "three papers");
        assert!(replies[0].time_ms >= 150);
        assert_eq!(replies[1].error(), Some("HTTP 500"));
        assert_eq!(replies[2].alias, "ghost");
        assert!(!replies[2].is_ok());
    }

    #[tokio::test]
    async fn test_payload_uses_preferred_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(body_partial_json(json!({
                "session_id": "s1",
                "model_id": "agent-model",
                "user": "alice",
                "prompt": "find experts on rice genetics"
            })))
            .respond_with(answer("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let agent = AgentDescriptor::new("experts", "Experts", format!("{}/", server.uri()))
            .with_supported_models(vec!["agent-model".into()]);
        let dispatcher = Dispatcher::new(Duration::from_secs(5)).unwrap();
        let replies = dispatcher
            .dispatch(&["experts".to_string()], &[agent], &request())
            .await;

        assert!(replies[0].is_ok());
    }

    #[tokio::test]
    async fn test_retries_once_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(answer("second time lucky"))
            .expect(1)
            .mount(&server)
            .await;

        let agent = AgentDescriptor::new("papers", "Papers", server.uri());
        let dispatcher = Dispatcher::new(Duration::from_secs(5)).unwrap();
        let replies = dispatcher
            .dispatch(&["papers".to_string()], &[agent], &request())
            .await;

        assert!(replies[0].is_ok());
    }

    #[tokio::test]
    async fn test_second_failure_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let agent = AgentDescriptor::new("papers", "Papers", server.uri());
        let dispatcher = Dispatcher::new(Duration::from_secs(5)).unwrap();
        let replies = dispatcher
            .dispatch(&["papers".to_string()], &[agent], &request())
            .await;

        assert_eq!(replies[0].error(), Some("HTTP 502"));
    }

    #[tokio::test]
    async fn test_slow_agent_does_not_hold_back_fast_one() {
        let (_fast, fast) = agent_server(
            "fast",
            answer("quick").set_delay(Duration::from_millis(20)),
        )
        .await;
        let (_slow, slow) = agent_server(
            "slow",
            answer("too late").set_delay(Duration::from_millis(2000)),
        )
        .await;

        let dispatcher = Dispatcher::new(Duration::from_millis(200)).unwrap();
        let selection = vec!["fast".to_string(), "slow".to_string()];
        let replies = dispatcher.dispatch(&selection, &[fast, slow], &request()).await;

        assert!(replies[0].is_ok());
        assert!(replies[0].time_ms < 200);
        assert!(replies[1].error().unwrap().starts_with("timed out"));
        // Both attempts timed out
        assert!(replies[1].time_ms >= 400);
    }

    #[tokio::test]
    async fn test_duplicate_aliases_are_dispatched_twice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(answer("hello"))
            .expect(2)
            .mount(&server)
            .await;

        let agent = AgentDescriptor::new("papers", "Papers", server.uri());
        let dispatcher = Dispatcher::new(Duration::from_secs(5)).unwrap();
        let selection = vec!["papers".to_string(), "papers".to_string()];
        let replies = dispatcher.dispatch(&selection, &[agent], &request()).await;

        assert_eq!(replies.len(), 2);
        assert!(replies.iter().all(AgentReply::is_ok));
    }
}
