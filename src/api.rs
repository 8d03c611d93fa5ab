//! REST API for the planning service.
//!
//! Exposes container validation, footprint construction, pack ordering and
//! scene serialization as JSON endpoints. Uses Axum and allows CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use serde_json::Value;
use std::sync::OnceLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, AppConfig, GeometryConfig, OrderingDefaults, SceneConfig};
use crate::dimensions::{Dimensions, RawDimensions, ShapeKind, validate};
use crate::error::GeometryError;
use crate::footprint::{ContainerVolume, build_footprint_from_raw};
use crate::mesh::{Mesh, OutlineEdge};
use crate::model::{Geometry, Material, PhysicsHint, Scene, SceneObject, UserData};
use crate::ordering::{
    OrderingConfig, PlacedItem, ReorderEntry, ReorderRequest, order, reorder_request,
};
use crate::scene::{
    EnvironmentMeta, MaterialRecord, ObjectRecord, PhysicsRecord, SceneConfigPayload,
    get_scene_config, live_scene_snapshot,
};
use crate::types::{BoundingBox, Point2, Vec3};

#[derive(Clone, Default)]
struct ApiState {
    geometry: GeometryConfig,
    scene: SceneConfig,
    ordering: OrderingDefaults,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>pack-planner API Docs</title>
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

/// Request body for container validation.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "shape": "l-shape",
        "dimensions": {
            "width": 120.0,
            "depth": 80.0,
            "height": 60.0,
            "notchWidth": 50.0,
            "notchDepth": 30.0
        }
    })
)]
pub struct ContainerRequest {
    /// One of `box`, `rectangular`, `l-shape`, `u_shape`, `t_shape`.
    pub shape: String,
    #[serde(default)]
    pub dimensions: RawDimensions,
}

impl ContainerRequest {
    fn into_validated(self) -> Result<Dimensions, GeometryError> {
        let shape: ShapeKind = self.shape.parse()?;
        validate(&self.dimensions, shape)
    }
}

/// Request body for footprint construction.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FootprintRequest {
    pub shape: String,
    #[serde(default)]
    pub dimensions: RawDimensions,
    /// Overrides the configured outline threshold in degrees.
    #[serde(default)]
    #[schema(nullable = true)]
    pub edge_threshold_deg: Option<f64>,
}

/// Built container volume plus derived metrics.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FootprintResponse {
    pub container: ContainerVolume,
    pub footprint_area: f64,
    pub volume: f64,
    pub bounding_box: Option<BoundingBox>,
}

impl From<ContainerVolume> for FootprintResponse {
    fn from(container: ContainerVolume) -> Self {
        Self {
            footprint_area: container.footprint_area(),
            volume: container.volume(),
            bounding_box: container.bounding_box(),
            container,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "id": "a", "position": {"x": 0.0, "y": 0.0, "z": 2.0} },
            { "id": "b", "position": {"x": 0.0, "y": 0.0, "z": 5.0}, "packIndex": 1 }
        ],
        "config": { "sortOrder": "x>y>z", "doorDirection": "front", "lifoEnabled": true }
    })
)]
pub struct OrderRequest {
    pub items: Vec<PlacedItem>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub config: Option<OrderingConfig>,
}

/// Ordered items and the matching reorder request body.
#[derive(Serialize, ToSchema)]
pub struct OrderResponse {
    pub items: Vec<PlacedItem>,
    pub reorder: ReorderRequest,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfigRequest {
    /// Objects that cannot be read are skipped.
    #[serde(deserialize_with = "crate::model::deserialize_objects")]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub boundary_size: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshotRequest {
    /// Scene graph with a `children` list; malformed scenes give an empty payload.
    #[serde(default)]
    #[schema(value_type = Object, nullable = true)]
    pub scene: Option<Value>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub boundary_size: Option<f64>,
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

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn geometry_error(err: GeometryError) -> Response {
    let title = match err {
        GeometryError::InvalidDimension { .. } => "Invalid container dimensions",
        GeometryError::UnsupportedShape(_) => "Unsupported container shape",
        GeometryError::Triangulation(_) => "Container geometry could not be built",
    };
    info!(code = err.code(), "rejected container request: {}", err);
    error_response(StatusCode::UNPROCESSABLE_ENTITY, title, err.to_string())
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

fn resolve_boundary_size(requested: Option<f64>, fallback: f64) -> Result<f64, Response> {
    match requested {
        None => Ok(fallback),
        Some(value) if value.is_finite() && value > 0.0 => Ok(value),
        Some(value) => Err(validation_error(format!(
            "boundarySize must be a finite number greater than 0, got {}",
            value
        ))),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_validate,
        handle_footprint,
        handle_order,
        handle_scene_config,
        handle_scene_snapshot
    ),
    components(
        schemas(
            ContainerRequest,
            FootprintRequest,
            FootprintResponse,
            OrderRequest,
            OrderResponse,
            SceneConfigRequest,
            SceneSnapshotRequest,
            ErrorResponse,
            RawDimensions,
            Dimensions,
            ContainerVolume,
            Mesh,
            OutlineEdge,
            BoundingBox,
            Vec3,
            Point2,
            PlacedItem,
            OrderingConfig,
            ReorderRequest,
            ReorderEntry,
            SceneObject,
            Geometry,
            Material,
            PhysicsHint,
            UserData,
            Scene,
            SceneConfigPayload,
            EnvironmentMeta,
            ObjectRecord,
            MaterialRecord,
            PhysicsRecord
        )
    ),
    tags(
        (name = "containers", description = "Container validation and footprint construction"),
        (name = "items", description = "Pack sequence ordering"),
        (name = "scene", description = "Scene configuration payloads")
    )
)]
struct ApiDoc;

fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        // API endpoints
        .route("/api/containers/validate", post(handle_validate))
        .route("/api/containers/footprint", post(handle_footprint))
        .route("/api/items/order", post(handle_order))
        .route("/api/scene/config", post(handle_scene_config))
        .route("/api/scene/snapshot", post(handle_scene_snapshot))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: AppConfig) {
    let AppConfig {
        api,
        geometry,
        scene,
        ordering,
    } = config;

    let app = router(ApiState {
        geometry,
        scene,
        ordering,
    });

    let addr = api.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Could not bind API server to {}: {}", addr, err);
            return;
        }
    };

    log_startup(&api);

    if let Err(err) = axum::serve(listener, app).await {
        error!("API server terminated with an error: {err}");
    }
}

fn log_startup(config: &ApiConfig) {
    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("API endpoints: POST /api/containers/validate, POST /api/containers/footprint");
    info!("API endpoints: POST /api/items/order, POST /api/scene/config, POST /api/scene/snapshot");
    info!("Documentation: GET /docs, GET /docs/openapi.json");
}

/// Handler for POST /api/containers/validate.
///
/// Resolves aliases and returns the normalized dimension record.
#[utoipa::path(
    post,
    path = "/api/containers/validate",
    request_body = ContainerRequest,
    responses(
        (status = 200, description = "Dimensions are valid", body = Dimensions),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid JSON, unsupported shape or invalid dimensions",
            body = ErrorResponse
        )
    ),
    tag = "containers"
)]
async fn handle_validate(payload: Result<Json<ContainerRequest>, JsonRejection>) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match request.into_validated() {
        Ok(dims) => (StatusCode::OK, Json(dims)).into_response(),
        Err(err) => geometry_error(err),
    }
}

/// Handler for POST /api/containers/footprint.
///
/// Validates the dimensions, builds the extruded volume and its outline.
#[utoipa::path(
    post,
    path = "/api/containers/footprint",
    request_body = FootprintRequest,
    responses(
        (status = 200, description = "Container volume", body = FootprintResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid JSON, unsupported shape or invalid dimensions",
            body = ErrorResponse
        )
    ),
    tag = "containers"
)]
async fn handle_footprint(
    State(state): State<ApiState>,
    payload: Result<Json<FootprintRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut options = state.geometry.footprint_options();
    if let Some(threshold) = request.edge_threshold_deg {
        if !(0.0..180.0).contains(&threshold) {
            return validation_error(format!(
                "edgeThresholdDeg must be at least 0 and below 180, got {}",
                threshold
            ));
        }
        options = options.with_edge_threshold(threshold);
    }

    match build_footprint_from_raw(&request.shape, &request.dimensions, &options) {
        Ok(volume) => {
            info!(
                shape = %volume.shape,
                triangles = volume.mesh.triangle_count(),
                "built container footprint"
            );
            (StatusCode::OK, Json(FootprintResponse::from(volume))).into_response()
        }
        Err(err) => geometry_error(err),
    }
}

/// Handler for POST /api/items/order.
///
/// Orders placed items into pack sequence. Uses the configured defaults when
/// the request carries no config.
#[utoipa::path(
    post,
    path = "/api/items/order",
    request_body = OrderRequest,
    responses(
        (status = 200, description = "Items in pack sequence", body = OrderResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid JSON data", body = ErrorResponse)
    ),
    tag = "items"
)]
async fn handle_order(
    State(state): State<ApiState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let config = request
        .config
        .unwrap_or_else(|| state.ordering.ordering_config());
    info!(
        items = request.items.len(),
        sort_order = %config.sort_order,
        door = %config.door_direction,
        lifo = config.lifo_enabled,
        "ordering items"
    );

    let ordered = order(&request.items, &config);
    let reorder = reorder_request(ordered.iter().copied());
    let items = ordered.into_iter().cloned().collect();

    (StatusCode::OK, Json(OrderResponse { items, reorder })).into_response()
}

/// Handler for POST /api/scene/config.
#[utoipa::path(
    post,
    path = "/api/scene/config",
    request_body = SceneConfigRequest,
    responses(
        (status = 200, description = "Scene configuration payload", body = SceneConfigPayload),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid JSON data or boundary size",
            body = ErrorResponse
        )
    ),
    tag = "scene"
)]
async fn handle_scene_config(
    State(state): State<ApiState>,
    payload: Result<Json<SceneConfigRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let boundary_size =
        match resolve_boundary_size(request.boundary_size, state.scene.boundary_size()) {
            Ok(size) => size,
            Err(response) => return response,
        };

    let payload = get_scene_config(&request.objects, boundary_size);
    info!(
        received = request.objects.len(),
        serialized = payload.objects.len(),
        "scene config built"
    );
    (StatusCode::OK, Json(payload)).into_response()
}

/// Handler for POST /api/scene/snapshot.
///
/// Never fails on a missing or malformed scene; the payload is empty instead.
#[utoipa::path(
    post,
    path = "/api/scene/snapshot",
    request_body = SceneSnapshotRequest,
    responses(
        (status = 200, description = "Snapshot of the visible scene", body = SceneConfigPayload),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid JSON data or boundary size",
            body = ErrorResponse
        )
    ),
    tag = "scene"
)]
async fn handle_scene_snapshot(
    State(state): State<ApiState>,
    payload: Result<Json<SceneSnapshotRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let boundary_size =
        match resolve_boundary_size(request.boundary_size, state.scene.boundary_size()) {
            Ok(size) => size,
            Err(response) => return response,
        };

    let scene = request.scene.and_then(Scene::from_value);
    let payload = live_scene_snapshot(scene.as_ref(), boundary_size);
    (StatusCode::OK, Json(payload)).into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
