use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use maestro::chain::AgentChainStep;
use maestro::engine::{OrchestrationRequest, OrchestrationResponse};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct AutoRequest {
    #[serde(default)]
    instruction: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CombineRequest {
    #[serde(default)]
    original_instruction: String,
    #[serde(default)]
    agent_chain: Vec<AgentChainStep>,
}

#[derive(Debug, Serialize)]
struct ChooseResponse {
    agents: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn orchestration_reply(response: OrchestrationResponse) -> Response {
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response)).into_response()
}

async fn auto_handler(
    State(state): State<AppState>,
    Json(request): Json<AutoRequest>,
) -> Response {
    if request.instruction.trim().is_empty() {
        return bad_request("Instruction is required");
    }
    tracing::info!("Received orchestration request");

    let response = state
        .engine
        .orchestrate(OrchestrationRequest::new(request.instruction))
        .await;
    orchestration_reply(response)
}

async fn combine_handler(
    State(state): State<AppState>,
    Json(request): Json<CombineRequest>,
) -> Response {
    if request.original_instruction.trim().is_empty() {
        return bad_request("Original instruction is required");
    }
    if request.agent_chain.is_empty() {
        return bad_request("Agent chain must contain at least one agent");
    }
    tracing::info!(agents = request.agent_chain.len(), "Received chain request");

    let response = state
        .engine
        .run_chain(&request.original_instruction, &request.agent_chain)
        .await;
    orchestration_reply(response)
}

async fn choose_handler(
    State(state): State<AppState>,
    Json(request): Json<AutoRequest>,
) -> Response {
    if request.instruction.trim().is_empty() {
        return bad_request("Instruction is required");
    }

    match state.engine.select_agents(&request.instruction).await {
        Ok(agents) => Json(ChooseResponse { agents }).into_response(),
        Err(e) => {
            tracing::error!("Agent selection failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/automation/auto", post(auto_handler))
        .route("/automation/combine", post(combine_handler))
        .route("/automation/choose", post(choose_handler))
        .with_state(state)
}
