//! REST API for the stacking service.
//!
//! Provides HTTP endpoints to solve and stream packing runs.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::sync::OnceLock;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, SolverConfig};
use crate::error::PackingError;
use crate::generator::{GenerateParams, generate_request};
use crate::model::{Block, Color, Request};
use crate::optimizer::{
    SceneDescription, SceneVisualizer, SolveEvent, SolveOptions, SolveSummary, Solver, StopReason,
};
use crate::types::Shape;

const DEFAULT_RENDER_SIZE: u32 = 512;
const DEFAULT_RENDER_PADDING: u32 = 16;

#[derive(Clone)]
struct ApiState {
    solver_config: SolverConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>strip_stack API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

fn default_true() -> bool {
    true
}

/// A block in a solve request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
pub struct BlockRequest {
    pub name: String,
    /// Extents (depth, width, height)
    #[schema(value_type = [f64; 3], example = json!([30.0, 40.0, 20.0]))]
    pub shape: (f64, f64, f64),
    /// Whether other blocks may rest on this one. Defaults to `true`.
    #[serde(default = "default_true")]
    pub stackable: bool,
    /// Only allow turns about the vertical axis.
    #[serde(default)]
    pub right_side_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<[u8; 3]>, example = json!([200, 120, 40]))]
    pub color: Option<(u8, u8, u8)>,
}

impl BlockRequest {
    fn into_block(self) -> Result<Block, PackingError> {
        let block = Block::new(self.name, Shape::from(self.shape))?
            .with_stackable(self.stackable)
            .with_right_side_up(self.right_side_up);
        Ok(match self.color {
            Some((r, g, b)) => block.with_color(Color(r, g, b)),
            None => block,
        })
    }

    fn from_block(block: &Block) -> Self {
        let Color(r, g, b) = block.color();
        Self {
            name: block.name().to_string(),
            shape: block.canonical_shape().as_tuple(),
            stackable: block.is_stackable(),
            right_side_up: block.is_right_side_up(),
            color: Some((r, g, b)),
        }
    }
}

/// Request body for `/solve` and `/solve_stream`.
///
/// Omitted solver fields fall back to the service configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, ToSchema)]
#[schema(
    example = json!({
        "container": [200.0, 100.0, 100.0],
        "blocks": [
            { "name": "block0", "shape": [30.0, 40.0, 20.0] },
            { "name": "block1", "shape": [25.0, 25.0, 50.0], "stackable": false }
        ],
        "max_iterations": 500,
        "seed": 42
    })
)]
pub struct SolveRequest {
    #[schema(value_type = [f64; 3], example = json!([200.0, 100.0, 100.0]))]
    pub container: (f64, f64, f64),
    pub blocks: Vec<BlockRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_rotation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Scene size hint for streamed frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_padding: Option<u32>,
}

/// A validated solve request with the effective solver settings.
struct ValidatedSolveRequest {
    request: Request,
    options: SolveOptions,
    seed: Option<u64>,
    render_size: u32,
    render_padding: u32,
}

impl SolveRequest {
    fn into_validated(self, defaults: &SolverConfig) -> Result<ValidatedSolveRequest, PackingError> {
        let blocks = self
            .blocks
            .into_iter()
            .map(BlockRequest::into_block)
            .collect::<Result<Vec<_>, _>>()?;
        let request = Request::new(Shape::from(self.container), blocks)?;

        let base = defaults.solve_options();
        let options = SolveOptions::builder()
            .max_iterations(self.max_iterations.unwrap_or(base.max_iterations))
            .allow_rotation(self.allow_rotation.unwrap_or(base.allow_rotation))
            .temperature(self.temperature.unwrap_or(base.temperature))
            .build();
        options.validate()?;

        Ok(ValidatedSolveRequest {
            request,
            options,
            seed: self.seed.or(defaults.seed()),
            render_size: self.render_size.unwrap_or(DEFAULT_RENDER_SIZE),
            render_padding: self.render_padding.unwrap_or(DEFAULT_RENDER_PADDING),
        })
    }

    fn from_request(request: &Request) -> Self {
        Self {
            container: request.container().as_tuple(),
            blocks: request.blocks().iter().map(BlockRequest::from_block).collect(),
            max_iterations: None,
            allow_rotation: None,
            temperature: None,
            seed: None,
            render_size: None,
            render_padding: None,
        }
    }
}

/// Request body for `/generate`. Omitted fields use the generator defaults.
#[derive(Deserialize, Clone, Debug, Default, ToSchema)]
pub struct GenerateRequest {
    pub block_size: Option<u32>,
    pub n_stackable: Option<usize>,
    pub n_unstackable: Option<usize>,
    #[schema(value_type = Option<[f64; 3]>, example = json!([200.0, 100.0, 100.0]))]
    pub container: Option<(f64, f64, f64)>,
    pub seed: Option<u64>,
}

impl GenerateRequest {
    fn into_params(self) -> GenerateParams {
        let defaults = GenerateParams::default();
        GenerateParams {
            block_size: self.block_size.unwrap_or(defaults.block_size),
            n_stackable: self.n_stackable.unwrap_or(defaults.n_stackable),
            n_unstackable: self.n_unstackable.unwrap_or(defaults.n_unstackable),
            container: self.container.map(Shape::from).unwrap_or(defaults.container),
            seed: self.seed,
        }
    }
}

/// A block of the best packing found.
#[derive(Serialize, Clone, Debug, PartialEq, ToSchema)]
pub struct PlacedBlock {
    pub name: String,
    /// Extents in the final orientation
    #[schema(value_type = [f64; 3], example = json!([40.0, 30.0, 20.0]))]
    pub shape: (f64, f64, f64),
    /// Back-left-bottom corner; `null` if the block could only rest on a
    /// non-stackable block.
    #[schema(value_type = Option<[f64; 3]>, example = json!([0.0, 0.0, 0.0]))]
    pub corner: Option<(f64, f64, f64)>,
    pub stackable: bool,
    #[schema(value_type = [u8; 3], example = json!([200, 120, 40]))]
    pub color: (u8, u8, u8),
}

/// Response of `/solve`.
#[derive(Serialize, Clone, Debug, PartialEq, ToSchema)]
pub struct SolveResponse {
    /// Height of the tallest stack of the best packing
    pub score: f64,
    pub initial_score: f64,
    pub iterations: usize,
    #[schema(value_type = String, example = "target_reached")]
    pub stop_reason: StopReason,
    /// Blocks in request order
    pub placements: Vec<PlacedBlock>,
}

impl SolveResponse {
    fn from_summary(summary: &SolveSummary) -> Self {
        Self {
            score: summary.response.score,
            initial_score: summary.initial_score,
            iterations: summary.iterations,
            stop_reason: summary.reason,
            placements: summary
                .response
                .placements()
                .map(|(block, corner)| {
                    let Color(r, g, b) = block.color();
                    PlacedBlock {
                        name: block.name().to_string(),
                        shape: block.shape().as_tuple(),
                        corner: corner.map(|c| c.as_tuple()),
                        stackable: block.is_stackable(),
                        color: (r, g, b),
                    }
                })
                .collect(),
        }
    }
}

/// Events of `/solve_stream`.
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type")]
enum StreamEvent {
    Frame {
        iteration: usize,
        best_score: f64,
        scene: SceneDescription,
    },
    Finished {
        result: SolveResponse,
    },
    Error {
        error: String,
        details: String,
    },
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn packing_error_response(err: &PackingError) -> Response {
    if err.is_validation() {
        error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input data",
            err.to_string(),
        )
    } else {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Packing failed",
            err.to_string(),
        )
    }
}

fn parse_solve_request(
    payload: Result<Json<SolveRequest>, JsonRejection>,
    defaults: &SolverConfig,
) -> Result<ValidatedSolveRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    payload
        .into_validated(defaults)
        .map_err(|err| packing_error_response(&err))
}

fn log_solve_event(event: &SolveEvent) {
    match event {
        SolveEvent::Started {
            blocks,
            initial_score,
        } => println!("🧮 Annealing {} blocks, initial height {}", blocks, initial_score),
        SolveEvent::Progress {
            iteration,
            elapsed_ms,
            best_score,
        } => println!(
            "⏱️ Iteration {}: best height {} after {} ms",
            iteration, best_score, elapsed_ms
        ),
        SolveEvent::Finished { .. } => {}
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_solve, handle_solve_stream, handle_generate),
    components(
        schemas(
            SolveRequest,
            BlockRequest,
            GenerateRequest,
            SolveResponse,
            PlacedBlock,
            ErrorResponse
        )
    ),
    tags((name = "stacking", description = "Endpoints for stable box stacking"))
)]
struct ApiDoc;

/// Builds the router with all endpoints.
fn router(solver_config: SolverConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { solver_config };

    Router::new()
        // API endpoints
        .route("/solve", post(handle_solve))
        .route("/solve_stream", post(handle_solve_stream))
        .route("/generate", post(handle_generate))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests.
/// Runs until the server is terminated; fails only if the address cannot be bound.
pub async fn start_api_server(config: ApiConfig, solver_config: SolverConfig) -> std::io::Result<()> {
    let app = router(solver_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 API Endpoints:");
    println!("   - POST /solve");
    println!("   - POST /solve_stream");
    println!("   - POST /generate");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
    Ok(())
}

/// Handler for POST /solve endpoint.
///
/// Runs the annealing search to completion on a blocking thread.
///
/// # Parameters
/// * `payload` - JSON payload with container, blocks and optional solver settings
///
/// # Returns
/// JSON response with the best packing found
#[utoipa::path(
    post,
    path = "/solve",
    request_body = SolveRequest,
    responses(
        (status = 200, description = "Best packing found", body = SolveResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid blocks, container or solver settings",
            body = ErrorResponse
        ),
        (status = INTERNAL_SERVER_ERROR, description = "Placement engine failure", body = ErrorResponse)
    ),
    tag = "stacking"
)]
async fn handle_solve(
    State(state): State<ApiState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let validated = match parse_solve_request(payload, &state.solver_config) {
        Ok(validated) => validated,
        Err(response) => return response,
    };
    let ValidatedSolveRequest {
        request,
        options,
        seed,
        ..
    } = validated;

    println!(
        "📥 New solve request: {} blocks, container {:?}, {} iterations",
        request.n_blocks(),
        request.container().as_tuple(),
        options.max_iterations
    );

    let outcome = tokio::task::spawn_blocking(move || {
        let mut solver = Solver::with_seed(request, seed)?;
        solver.solve_with_progress(&options, log_solve_event)
    })
    .await;

    match outcome {
        Ok(Ok(summary)) => {
            println!(
                "📦 Result: height {} (initial {}), {} iterations, {:?}",
                summary.response.score, summary.initial_score, summary.iterations, summary.reason
            );
            (StatusCode::OK, Json(SolveResponse::from_summary(&summary))).into_response()
        }
        Ok(Err(err)) => {
            eprintln!("❌ Solve failed: {err}");
            packing_error_response(&err)
        }
        Err(err) => {
            eprintln!("❌ Solver task failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Solver task failed",
                err.to_string(),
            )
        }
    }
}

/// Handler for POST /solve_stream endpoint (SSE).
///
/// Streams a scene every ten iterations, then the final result.
/// Closing the connection cancels the run.
#[utoipa::path(
    post,
    path = "/solve_stream",
    request_body = SolveRequest,
    responses(
        (
            status = 200,
            description = "Streams frames and the final result",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid blocks, container or solver settings",
            body = ErrorResponse
        )
    ),
    tag = "stacking"
)]
async fn handle_solve_stream(
    State(state): State<ApiState>,
    payload: Result<Json<SolveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let validated = match parse_solve_request(payload, &state.solver_config) {
        Ok(validated) => validated,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || stream_solve(validated, tx));

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Runs one streamed solve on the current (blocking) thread.
fn stream_solve(validated: ValidatedSolveRequest, tx: mpsc::Sender<String>) {
    let send = |event: &StreamEvent| match serde_json::to_string(event) {
        Ok(json) => tx.blocking_send(json).is_ok(),
        Err(_) => false,
    };
    let fail = |err: &PackingError| {
        send(&StreamEvent::Error {
            error: "Packing failed".to_string(),
            details: err.to_string(),
        });
    };

    let ValidatedSolveRequest {
        request,
        options,
        seed,
        render_size,
        render_padding,
    } = validated;

    let mut solver = match Solver::with_seed(request, seed) {
        Ok(solver) => solver,
        Err(err) => return fail(&err),
    };
    let cancel = solver.cancel_handle();
    let initial_score = solver.initial_score();

    let mut frames = solver.frames(options, SceneVisualizer, render_size, render_padding);
    while let Some(frame) = frames.next() {
        match frame {
            Ok(frame) => {
                let delivered = send(&StreamEvent::Frame {
                    iteration: frame.iteration,
                    best_score: frame.best_score,
                    scene: frame.image,
                });
                if !delivered {
                    // Receiver has closed the stream.
                    cancel.store(true, Ordering::Relaxed);
                }
            }
            Err(err) => return fail(&err),
        }
    }
    let iterations = frames.iterations();
    let reason = frames.stop_reason().unwrap_or(StopReason::Cancelled);

    if reason == StopReason::Cancelled {
        return;
    }
    let summary = SolveSummary {
        response: solver.response(),
        initial_score,
        iterations,
        reason,
    };
    send(&StreamEvent::Finished {
        result: SolveResponse::from_summary(&summary),
    });
}

/// Handler for POST /generate endpoint.
///
/// Returns a random request body that can be posted to `/solve` as is.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated solve request", body = SolveRequest),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Generator parameters produce an invalid request",
            body = ErrorResponse
        )
    ),
    tag = "stacking"
)]
async fn handle_generate(payload: Result<Json<GenerateRequest>, JsonRejection>) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    match generate_request(&payload.into_params()) {
        Ok(request) => (StatusCode::OK, Json(SolveRequest::from_request(&request))).into_response(),
        Err(err) => packing_error_response(&err),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
