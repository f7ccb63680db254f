mod aggregate;
mod http;
mod images;
mod llm;
mod metrics;
mod models;
mod normalize;
mod profile;
mod prompt;
mod scrape;
mod security;
mod store;

use axum::{
    Json, Router,
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use llm::{AssistantUnavailable, LlmClient};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{
    ApiError, ChatRequest, ChatResponse, ImagesRequest, ImagesResponse, LoginRequest,
    ProductSummary,
};
use security::{AdminContext, AuthState, require_admin};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Instant};
use store::StoreClient;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "srbot.api", "server crashed: {err}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let auth = AuthState::from_env();
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("prom recorder");

    let store = StoreClient::from_env();
    if store.is_none() {
        info!(
            target = "srbot.api",
            "document store not configured, fallback catalog only"
        );
    }

    let state = AppState {
        store,
        llm: Arc::new(LlmClient::from_env()),
        auth: auth.clone(),
        http: http::build_client(),
        website_url: Arc::from(
            std::env::var("WEBSITE_URL").unwrap_or_else(|_| "http://localhost:5173".into()),
        ),
        openapi: Arc::new(
            serde_yaml::from_str(include_str!("../docs/openapi.yaml"))
                .unwrap_or(json!({"openapi":"3.0.3"})),
        ),
        prometheus_handle: Some(prometheus_handle),
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "srbot.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state, auth).into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    store: Option<StoreClient>,
    llm: Arc<LlmClient>,
    auth: AuthState,
    http: reqwest::Client,
    website_url: Arc<str>,
    openapi: Arc<serde_json::Value>,
    prometheus_handle: Option<PrometheusHandle>,
}

fn app(state: AppState, auth: AuthState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let protected = Router::new()
        .route("/admin/data", get(admin_data))
        .route_layer(middleware::from_fn_with_state(auth, require_admin));

    Router::new()
        .route("/bienvenida", get(bienvenida))
        .route("/chat", post(chat))
        .route("/images", post(images_lookup))
        .route("/productos", get(productos))
        .route("/garantias", get(garantias))
        .route("/tienda", get(tienda))
        .route("/login", post(login))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit_from_env()))
}

/// Static welcome text.
///
/// - Method: `GET`
/// - Path: `/bienvenida`
/// - Auth: none
async fn bienvenida() -> Json<serde_json::Value> {
    Json(json!({ "response": profile::WELCOME_MESSAGE }))
}

/// Run the full chat pipeline: aggregate store data and scrape the public
/// page concurrently, compose the prompt, ask the model, then decide
/// whether to attach images based on the original message.
///
/// - Method: `POST`
/// - Path: `/chat`
/// - Body: `{ "message": string }`
/// - Response: `{ response, images[], showImages, storeInfo }`
async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    metrics::inc_requests("/chat");
    let message = payload
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(AppError::BadRequest("Mensaje requerido"))?;

    let started = Instant::now();
    let (data, web_content) = tokio::join!(
        aggregate::fetch(state.store.as_ref()),
        scrape::fetch_page_text(&state.http, &state.website_url),
    );
    metrics::pipeline_elapsed("gather", started.elapsed().as_millis());

    let prompt = prompt::compose(&data, &web_content, message);
    let response = state.llm.generate(&prompt).await?;

    let selection = images::select(message, &data.products);

    Ok(Json(ChatResponse {
        response,
        images: selection.images,
        show_images: selection.attached,
        store_info: profile::store_location(),
    }))
}

/// Image lookup by product name.
///
/// - Method: `POST`
/// - Path: `/images`
/// - Body: `{ productName?, limit? }`
async fn images_lookup(
    State(state): State<AppState>,
    Json(payload): Json<ImagesRequest>,
) -> Json<ImagesResponse> {
    metrics::inc_requests("/images");
    let data = aggregate::fetch(state.store.as_ref()).await;
    let limit = payload.limit.unwrap_or(images::IMAGES_DEFAULT_LIMIT);
    let images = images::by_product_name(&data.products, payload.product_name.as_deref(), limit);

    let message = if images.is_empty() {
        "Sin imágenes".to_string()
    } else {
        format!("{} imagen(es)", images.len())
    };

    Json(ImagesResponse {
        product: payload.product_name.unwrap_or_else(|| "Todos".to_string()),
        total: images.len(),
        images,
        message,
    })
}

/// Product listing with first image and image count per product.
async fn productos(State(state): State<AppState>) -> Json<serde_json::Value> {
    metrics::inc_requests("/productos");
    let data = aggregate::fetch(state.store.as_ref()).await;
    let list: Vec<ProductSummary> = data
        .products
        .iter()
        .map(|p| ProductSummary {
            id: p.id.clone(),
            nombre: p.nombre.clone(),
            precio: p.precio,
            imagen: p.imagenes.first().cloned(),
            total_imagenes: p.imagenes.len(),
        })
        .collect();
    let total = list.len();
    Json(json!({ "productos": list, "total": total }))
}

async fn garantias() -> Json<serde_json::Value> {
    Json(json!({ "garantias": profile::garantias_json() }))
}

async fn tienda() -> Json<serde_json::Value> {
    Json(profile::tienda_json())
}

/// Admin login with the single configured credential pair.
///
/// - Method: `POST`
/// - Path: `/login`
/// - Response: `{ token }` (JWT, 2 h expiry) or 401
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    metrics::inc_requests("/login");
    if !state
        .auth
        .check_credentials(&payload.username, &payload.password)
    {
        return Err(AppError::Unauthorized("Credenciales inválidas"));
    }
    let token = state
        .auth
        .issue_token(&payload.username)
        .map_err(|err| AppError::Internal(err.to_string()))?;
    Ok(Json(json!({ "token": token })))
}

/// Raw aggregated data plus the static tables and a data-source label, so
/// an operator can tell live data from the fallback catalog.
async fn admin_data(
    State(state): State<AppState>,
    Extension(context): Extension<AdminContext>,
) -> Json<serde_json::Value> {
    metrics::inc_requests("/admin/data");
    info!(
        target = "srbot.api",
        admin = %context.username,
        "admin data requested"
    );
    let data = aggregate::fetch(state.store.as_ref()).await;
    Json(json!({
        "data": {
            "products": data.products,
            "categories": data.categories,
        },
        "storeInfo": {
            "nombre": profile::STORE_NAME,
            "ubicacion": profile::STORE_UBICACION,
            "direccion": profile::STORE_DIRECCION,
            "garantias": profile::garantias_json(),
        },
        "source": data.source.label(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Health and readiness check.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "srbot-api-rs",
        "store_configured": state.store.is_some(),
    }))
}

async fn metrics_endpoint(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> axum::http::Response<String> {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return axum::http::Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body("unauthorized".into())
                .unwrap();
        }
    }
    let body = state
        .prometheus_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    axum::http::Response::builder()
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .unwrap()
}

async fn openapi_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json((*state.openapi).clone())
}

async fn swagger_ui() -> axum::http::Response<String> {
    let html = r#"<!doctype html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>Sr Robot API Docs</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: '/openapi.json', dom_id: '#swagger-ui' });
    };
  </script>
</body>
</html>"#;
    axum::http::Response::builder()
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.to_string())
        .unwrap()
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(256 * 1024)
}

#[derive(Debug)]
enum AppError {
    BadRequest(&'static str),
    Unauthorized(&'static str),
    Assistant(AssistantUnavailable),
    Internal(String),
}

impl From<AssistantUnavailable> for AppError {
    fn from(value: AssistantUnavailable) -> Self {
        Self::Assistant(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.to_string()),
            // Upstream detail is already logged; the wire gets the uniform text.
            AppError::Assistant(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Internal(detail) => {
                error!(target = "srbot.api", detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error en el asistente".to_string(),
                )
            }
        };
        let payload = ApiError {
            error: message,
            detail: None,
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use crate::llm::LlmConfig;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let auth = AuthState::for_tests("router-test-secret");
        let state = AppState {
            store: None,
            llm: Arc::new(LlmClient::new(LlmConfig {
                base_url: "http://127.0.0.1:1".into(),
                api_key: None,
                model: None,
                timeout: Duration::from_secs(1),
            })),
            auth: auth.clone(),
            http: http::build_client(),
            website_url: Arc::from("http://127.0.0.1:1"),
            openapi: Arc::new(json!({"openapi":"3.0.3"})),
            prometheus_handle: None,
        };
        app(state, auth)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_post(path: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn bienvenida_returns_welcome() {
        let response = test_app()
            .oneshot(Request::get("/bienvenida").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Sr. Robot"));
    }

    #[tokio::test]
    async fn chat_without_message_is_bad_request() {
        let response = test_app()
            .oneshot(json_post("/chat", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("Mensaje requerido"));
    }

    #[tokio::test]
    async fn chat_blank_message_is_bad_request() {
        let response = test_app()
            .oneshot(json_post("/chat", json!({ "message": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_issues_token_for_exact_credentials() {
        let response = test_app()
            .oneshot(json_post(
                "/login",
                json!({ "username": "admin", "password": "pass" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[tokio::test]
    async fn login_rejects_other_credentials() {
        let response = test_app()
            .oneshot(json_post(
                "/login",
                json!({ "username": "admin", "password": "wrong" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_data_requires_token() {
        let response = test_app()
            .oneshot(Request::get("/admin/data").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = test_app()
            .oneshot(
                Request::get("/admin/data")
                    .header("Authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_data_reports_fallback_source() {
        let auth = AuthState::for_tests("router-test-secret");
        let token = auth.issue_token("admin").unwrap();
        let response = test_app()
            .oneshot(
                Request::get("/admin/data")
                    .header("Authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["source"], "Fallback");
        assert_eq!(body["data"]["categories"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn productos_serves_empty_list_without_store() {
        let response = test_app()
            .oneshot(Request::get("/productos").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn garantias_and_tienda_serve_static_tables() {
        let response = test_app()
            .oneshot(Request::get("/garantias").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Laptops"));

        let response = test_app()
            .oneshot(Request::get("/tienda").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["nombre"], "Sr Robot");
        assert!(body["horario"].as_str().is_some());
    }
}
