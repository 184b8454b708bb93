//! Participant-facing HTTP portal.
//!
//! Exposes login/logout, the running-experiment list, the participate loop,
//! and owner-gated results as a JSON API. The participate POST answers with
//! a redirect back to the GET route so a page refresh can never double-submit
//! a reaction.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Json, Redirect},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{Experiment, Reaction};
use crate::domain::ports::{
    CatalogRepository, ExperimentRepository, Identity, IdentityProvider, ParticipationRepository,
};
use crate::services::{ExperimentResults, ExperimentService, ParticipationService, StepOutcome};

/// Configuration for the portal HTTP server.
#[derive(Debug, Clone)]
pub struct PortalHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
}

impl Default for PortalHttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8420,
            enable_cors: true,
        }
    }
}

/// Request to start a session.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub participant: String,
}

/// Response carrying a fresh session token.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub participant: String,
}

/// Request body for a reaction submission.
#[derive(Debug, Default, Deserialize)]
pub struct ReactRequest {
    #[serde(default)]
    pub reaction: Option<String>,
}

/// Response with an experiment summary.
#[derive(Debug, Serialize)]
pub struct ExperimentResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub running: bool,
    pub idea_limit: Option<u32>,
    pub starting_expansion_rate: f64,
    pub created_at: String,
}

impl From<Experiment> for ExperimentResponse {
    fn from(e: Experiment) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            running: e.running,
            idea_limit: e.idea_limit,
            starting_expansion_rate: e.starting_expansion_rate,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// The stimulus currently awaiting a reaction.
#[derive(Debug, Serialize)]
pub struct StimulusResponse {
    pub seq: u32,
    pub idea_id: Uuid,
    pub idea: String,
}

/// Response for the participate GET route.
#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub experiment_id: Uuid,
    pub participation_id: Uuid,
    pub finished: bool,
    pub stimulus: Option<StimulusResponse>,
}

/// One logged response in a results view.
#[derive(Debug, Serialize)]
pub struct ResultEntryResponse {
    pub seq: u32,
    pub idea: String,
    pub did_expand: bool,
    pub expansion_rate: f64,
    pub reaction: String,
}

/// One participant's trace in a results view.
#[derive(Debug, Serialize)]
pub struct ParticipationResultsResponse {
    pub participant: String,
    pub finished: bool,
    pub expansion_rate: f64,
    pub responses: Vec<ResultEntryResponse>,
}

/// Response for the results route.
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub experiment: ExperimentResponse,
    pub participations: Vec<ParticipationResultsResponse>,
}

impl From<ExperimentResults> for ResultsResponse {
    fn from(results: ExperimentResults) -> Self {
        Self {
            experiment: results.experiment.into(),
            participations: results
                .participations
                .into_iter()
                .map(|p| ParticipationResultsResponse {
                    participant: p.participation.participant,
                    finished: p.participation.finished,
                    expansion_rate: p.participation.expansion_rate,
                    responses: p
                        .rows
                        .into_iter()
                        .map(|row| ResultEntryResponse {
                            seq: row.entry.seq,
                            idea: row.idea_value,
                            did_expand: row.entry.did_expand,
                            expansion_rate: row.entry.expansion_rate,
                            reaction: row.entry.reaction.as_str().to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, code: &str, error: impl Into<String>) -> HandlerError {
    (status, Json(ErrorResponse { error: error.into(), code: code.to_string() }))
}

fn map_domain_error(err: DomainError) -> HandlerError {
    match err {
        DomainError::ExperimentNotFound(_)
        | DomainError::ExperimentNotRunning(_)
        | DomainError::GroupNotFound(_)
        | DomainError::IdeaNotFound(_)
        | DomainError::ParticipationNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        DomainError::NotAuthorized(_) => {
            error_response(StatusCode::FORBIDDEN, "FORBIDDEN", err.to_string())
        }
        DomainError::ValidationFailed(_) | DomainError::GroupAlreadyAttached { .. } => {
            error_response(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.to_string())
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", err.to_string()),
    }
}

/// Shared state for the portal.
pub struct AppState<E, P, C, I>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    pub participation: ParticipationService<E, P, C>,
    pub experiments: ExperimentService<E, P, C>,
    pub identity: Arc<I>,
}

/// Portal HTTP server.
pub struct PortalHttpServer<E, P, C, I>
where
    E: ExperimentRepository + 'static,
    P: ParticipationRepository + 'static,
    C: CatalogRepository + 'static,
    I: IdentityProvider + 'static,
{
    config: PortalHttpConfig,
    state: Arc<AppState<E, P, C, I>>,
}

impl<E, P, C, I> PortalHttpServer<E, P, C, I>
where
    E: ExperimentRepository + 'static,
    P: ParticipationRepository + 'static,
    C: CatalogRepository + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(state: AppState<E, P, C, I>, config: PortalHttpConfig) -> Self {
        Self { config, state: Arc::new(state) }
    }

    /// Build the router.
    pub fn build_router(&self) -> Router {
        let app = Router::new()
            .route("/api/v1/auth/login", post(login::<E, P, C, I>))
            .route("/api/v1/auth/logout", post(logout::<E, P, C, I>))
            .route("/api/v1/experiments", get(list_experiments::<E, P, C, I>))
            .route(
                "/api/v1/experiments/{id}/participate",
                get(participate::<E, P, C, I>).post(react::<E, P, C, I>),
            )
            .route("/api/v1/experiments/{id}/results", get(results::<E, P, C, I>))
            .route("/health", get(health_check))
            .with_state(self.state.clone());

        if self.config.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    /// Start the server.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.build_router();

        tracing::info!("Portal HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server with a shutdown signal.
    pub async fn serve_with_shutdown<F>(
        self,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let router = self.build_router();

        tracing::info!("Portal HTTP server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authenticate<E, P, C, I>(
    state: &AppState<E, P, C, I>,
    headers: &HeaderMap,
) -> Result<Identity, HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    let Some(token) = bearer_token(headers) else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Missing bearer token",
        ));
    };

    match state.identity.resolve(token).await {
        Ok(Some(identity)) => Ok(identity),
        Ok(None) => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Unknown or revoked session token",
        )),
        Err(e) => Err(map_domain_error(e)),
    }
}

async fn login<E, P, C, I>(
    State(state): State<Arc<AppState<E, P, C, I>>>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    let participant = req.participant.trim();
    if participant.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_REQUEST",
            "Participant name cannot be empty",
        ));
    }

    let token = state.identity.login(participant).await.map_err(map_domain_error)?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse { token, participant: participant.to_string() }),
    ))
}

async fn logout<E, P, C, I>(
    State(state): State<Arc<AppState<E, P, C, I>>>,
    headers: HeaderMap,
) -> Result<StatusCode, HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    if let Some(token) = bearer_token(&headers) {
        state.identity.logout(token).await.map_err(map_domain_error)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_experiments<E, P, C, I>(
    State(state): State<Arc<AppState<E, P, C, I>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExperimentResponse>>, HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    authenticate(&state, &headers).await?;

    let experiments = state.experiments.list_running().await.map_err(map_domain_error)?;
    Ok(Json(experiments.into_iter().map(ExperimentResponse::from).collect()))
}

async fn participate<E, P, C, I>(
    State(state): State<Arc<AppState<E, P, C, I>>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<StepResponse>, HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    let identity = authenticate(&state, &headers).await?;

    let outcome = state
        .participation
        .current_step(&identity, id)
        .await
        .map_err(map_domain_error)?;

    let response = match outcome {
        StepOutcome::Stimulus { participation, entry, idea } => StepResponse {
            experiment_id: id,
            participation_id: participation.id,
            finished: false,
            stimulus: Some(StimulusResponse {
                seq: entry.seq,
                idea_id: idea.id,
                idea: idea.value,
            }),
        },
        StepOutcome::Finished { participation } => StepResponse {
            experiment_id: id,
            participation_id: participation.id,
            finished: true,
            stimulus: None,
        },
    };

    Ok(Json(response))
}

async fn react<E, P, C, I>(
    State(state): State<Arc<AppState<E, P, C, I>>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Redirect, HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    let identity = authenticate(&state, &headers).await?;

    // Missing bodies and unknown reaction strings are treated as "no
    // reaction yet" so the redirect simply re-displays the pending stimulus.
    let reaction = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<ReactRequest>(&body)
            .ok()
            .and_then(|req| req.reaction)
            .and_then(|r| Reaction::from_str(&r))
    };

    state
        .participation
        .submit_reaction(&identity, id, reaction)
        .await
        .map_err(map_domain_error)?;

    Ok(Redirect::to(&format!("/api/v1/experiments/{id}/participate")))
}

async fn results<E, P, C, I>(
    State(state): State<Arc<AppState<E, P, C, I>>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ResultsResponse>, HandlerError>
where
    E: ExperimentRepository,
    P: ParticipationRepository,
    C: CatalogRepository,
    I: IdentityProvider,
{
    let identity = authenticate(&state, &headers).await?;

    let results = state
        .experiments
        .results(id, Some(&identity))
        .await
        .map_err(map_domain_error)?;

    Ok(Json(results.into()))
}
