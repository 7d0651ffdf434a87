use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::error;

use crate::state::AppState;

/// The agents the hub can route to, in catalog order
async fn list_agents(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.orchestrator.agents().await {
        Ok(agents) => {
            let agents: Vec<Value> = agents
                .iter()
                .map(|agent| {
                    json!({
                        "alias": agent.alias,
                        "name": agent.name,
                        "description": agent.description,
                        "icon": agent.icon,
                    })
                })
                .collect();
            (StatusCode::OK, Json(Value::Array(agents)))
        }
        Err(err) => {
            error!(error = %err, "could not list agents");
            let status =
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "status": "error",
                    "error_message": err.to_string(),
                    "error_step": err.error_step(),
                })),
            )
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/agents", get(list_agents))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use agenthub::models::agent::AgentDescriptor;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_lists_agents_without_the_hub_itself() {
        let agents = vec![
            AgentDescriptor::new("hub", "Hub", "http://hub.local"),
            AgentDescriptor::new("papers", "Paper Finder", "http://papers.local")
                .with_description("Finds research papers")
                .with_icon("📄"),
            AgentDescriptor::new("experts", "Expert Finder", "http://experts.local"),
        ];
        let app = routes(test_state(None, agents, Some("hub")));

        let response = app
            .oneshot(Request::builder().uri("/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!([
                {"alias": "papers", "name": "Paper Finder", "description": "Finds research papers", "icon": "📄"},
                {"alias": "experts", "name": "Expert Finder", "description": "", "icon": null}
            ])
        );
    }
}
