//! Chat, retrieval and health endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;

use crate::error::Result;
use crate::generation::PromptBuilder;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse, HealthResponse, QueryResponse, RetrieveResponse};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model().to_string(),
    })
}

/// POST /chat - answer with retrieved context unless `use_rag` is false
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;
    request.validate()?;
    let start = Instant::now();

    let (prompt, context_used) = if request.use_rag {
        let matches = state
            .retriever()
            .retrieve(&request.query, request.top_k)
            .await?;
        let context = PromptBuilder::format_context_for_prompt(&matches);
        (
            PromptBuilder::build_rag_prompt(&request.query, &context),
            Some(matches),
        )
    } else {
        (PromptBuilder::build_simple_prompt(&request.query), None)
    };

    let response = state.llm().complete(&prompt).await?;

    tracing::info!(
        use_rag = request.use_rag,
        context_chunks = context_used.as_ref().map_or(0, Vec::len),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Chat answered"
    );

    Ok(Json(ChatResponse {
        query: request.query,
        response,
        context_used,
        model: state.model().to_string(),
    }))
}

/// POST /retrieve - return matching chunks without calling the LLM
pub async fn retrieve(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<RetrieveResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let documents = state
        .retriever()
        .retrieve(&request.query, request.top_k)
        .await?;

    tracing::debug!("Retrieve returned {} documents", documents.len());

    Ok(Json(RetrieveResponse::new(request.query, documents)))
}

/// POST /query-without-rag - plain LLM answer, no retrieval
pub async fn query_without_rag(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let prompt = PromptBuilder::build_simple_prompt(&request.query);
    let response = state.llm().complete(&prompt).await?;

    Ok(Json(QueryResponse {
        query: request.query,
        response,
        model: state.model().to_string(),
    }))
}
