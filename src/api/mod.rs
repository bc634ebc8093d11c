pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    bus::LiveFeed, motor::MotorTracker, predictions::PredictionClient, sensors::TelemetryStore,
};
use handlers::{live, motors, predictions, sensors, ApiDoc};

/// Shared handles every handler works against.
#[derive(Clone)]
pub struct AppState {
    pub store: TelemetryStore,
    pub motor: MotorTracker,
    pub predictions: PredictionClient,
    pub live: LiveFeed,
}

pub fn router(state: AppState) -> Router {
    let (api, doc) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/sensors", post(sensors::create_reading))
        .route("/sensors/latest", get(sensors::get_latest_reading))
        .route("/sensors/historical", get(sensors::get_historical_readings))
        .route("/sensors/leaks", get(sensors::get_leaks))
        .route("/sensors/efficiency", get(sensors::get_efficiency))
        .route("/motors/status", get(motors::get_status))
        .route("/motors/start", post(motors::start_motor))
        .route("/motors/stop", post(motors::stop_motor))
        .route("/motors/speed", post(motors::set_speed))
        .route("/motors/faults", get(motors::get_faults))
        .route("/predictions/predict", post(predictions::predict))
        .route("/ml/predict-usage", post(predictions::predict_usage))
        .route("/ml/predict-load", post(predictions::predict_load))
        .route("/ml/predict-speed", post(predictions::predict_speed))
        .route("/ml/analyze-start-stop", post(predictions::analyze_start_stop))
        .route("/events", get(live::sensor_events))
        .with_state(state)
        .split_for_parts();

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(doc) }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        net::TcpListener as StdListener,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tokio::{
        net::TcpListener,
        sync::{mpsc, Mutex},
    };

    use super::{router, AppState};
    use crate::{
        bus::LiveFeed,
        motor::{MotorCommand, MotorTracker},
        predictions::PredictionClient,
        sensors::TelemetryStore,
    };

    pub fn test_server(state: AppState) -> TestServer {
        TestServer::new(router(state)).unwrap()
    }

    /// Memory-backed state whose ML client points nowhere useful.
    pub fn state() -> AppState {
        state_with_commands().0
    }

    pub fn state_with_commands() -> (AppState, mpsc::UnboundedReceiver<MotorCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = AppState {
            store: TelemetryStore::memory(),
            motor: MotorTracker::new(tx),
            predictions: client(&unreachable_base_url()),
            live: LiveFeed::new(16),
        };
        (state, rx)
    }

    pub fn state_with_ml(base_url: &str) -> AppState {
        AppState {
            predictions: client(base_url),
            ..state()
        }
    }

    fn client(base_url: &str) -> PredictionClient {
        PredictionClient::with_base_urls(base_url, base_url, Duration::from_secs(5)).unwrap()
    }

    /// A local address nothing listens on.
    pub fn unreachable_base_url() -> String {
        let listener = StdListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    // -----------------------------------------------------------------------
    // Stub ML service
    // -----------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct StubState {
        requests: Arc<Mutex<Vec<(String, Value)>>>,
        fail: Arc<AtomicBool>,
    }

    /// Answers every ML and prediction operation with a canned body and records
    /// what it was sent.
    pub struct StubMl {
        pub base_url: String,
        state: StubState,
    }

    impl StubMl {
        pub async fn spawn() -> Self {
            let state = StubState::default();
            let app = Router::new()
                .route("/{op}", post(answer))
                .with_state(state.clone());

            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                base_url: format!("http://{addr}"),
                state,
            }
        }

        pub async fn last_request(&self) -> (String, Value) {
            self.state.requests.lock().await.last().cloned().unwrap()
        }

        pub async fn request_count(&self) -> usize {
            self.state.requests.lock().await.len()
        }

        /// The next request is answered with a 500.
        pub async fn fail_next(&self) {
            self.state.fail.store(true, Ordering::SeqCst);
        }
    }

    async fn answer(
        State(state): State<StubState>,
        Path(op): Path<String>,
        Json(body): Json<Value>,
    ) -> Response {
        state.requests.lock().await.push((format!("/{op}"), body.clone()));

        if state.fail.swap(false, Ordering::SeqCst) {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" })))
                .into_response();
        }

        let reply = match op.as_str() {
            "predict" => json!({ "status": "Normal", "vibration": body["vibration"] }),
            "predict_usage" => json!({ "Usage_Pattern": "High Usage", "Confidence": 0.9 }),
            "predict_load" => json!({ "Load_Type": "Heavy", "Confidence": 0.8 }),
            "predict_speed" => json!({ "Optimal_Speed": 1450.0, "Unit": "RPM" }),
            "analyze_start_stop" => json!({
                "Start_Stop_Status": "Normal",
                "Recommendation": "Normal operation"
            }),
            _ => return StatusCode::NOT_FOUND.into_response(),
        };
        Json(reply).into_response()
    }
}
