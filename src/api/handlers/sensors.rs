use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    api::{
        dto::{HistoricalResponse, HistoryParams, SensorReadingDto},
        errors::AppError,
        AppState,
    },
    sensors::{
        models::SensorReadingPayload, store::DEFAULT_ANOMALY_LIMIT, EfficiencySnapshot,
        HistoryQuery,
    },
};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 100;

/// Fetch the most recent sensor reading, or `null` when nothing is stored.
#[utoipa::path(
    get,
    path = "/api/sensors/latest",
    responses(
        (status = 200, description = "Latest sensor reading", body = Option<SensorReadingDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensors"
)]
pub async fn get_latest_reading(
    State(state): State<AppState>,
) -> Result<Json<Option<SensorReadingDto>>, AppError> {
    let latest = state.store.latest().await?;
    Ok(Json(latest.map(Into::into)))
}

/// Page through stored readings, newest first, optionally within a time range.
#[utoipa::path(
    get,
    path = "/api/sensors/historical",
    params(HistoryParams),
    responses(
        (status = 200, description = "One page of readings", body = HistoricalResponse),
        (status = 400, description = "Malformed query parameters"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensors"
)]
pub async fn get_historical_readings(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoricalResponse>, AppError> {
    let Query(params) = params?;
    let query = history_query(params)?;
    let page = state.store.query(&query).await?;
    Ok(Json(page.into()))
}

fn history_query(params: HistoryParams) -> Result<HistoryQuery, AppError> {
    let page = params.page.unwrap_or(DEFAULT_PAGE);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    if page == 0 {
        return Err(AppError::Validation("page must be at least 1".into()));
    }
    if limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".into()));
    }

    Ok(HistoryQuery {
        start: params.start_date,
        end: params.end_date,
        page,
        limit,
    })
}

/// The ten most recent readings that flagged a leak.
#[utoipa::path(
    get,
    path = "/api/sensors/leaks",
    responses(
        (status = 200, description = "Leak readings, newest first", body = Vec<SensorReadingDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensors"
)]
pub async fn get_leaks(
    State(state): State<AppState>,
) -> Result<Json<Vec<SensorReadingDto>>, AppError> {
    let leaks = state.store.find_anomalies(DEFAULT_ANOMALY_LIMIT).await?;
    Ok(Json(leaks.into_iter().map(Into::into).collect()))
}

/// Flow-per-watt efficiency of the latest reading.
#[utoipa::path(
    get,
    path = "/api/sensors/efficiency",
    responses(
        (status = 200, description = "Efficiency snapshot", body = EfficiencySnapshot),
        (status = 404, description = "No sensor data available"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensors"
)]
pub async fn get_efficiency(
    State(state): State<AppState>,
) -> Result<Json<EfficiencySnapshot>, AppError> {
    state
        .store
        .efficiency_snapshot()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No sensor data available".into()))
}

/// Store one sensor snapshot. Missing fields take their defaults.
#[utoipa::path(
    post,
    path = "/api/sensors",
    request_body = SensorReadingPayload,
    responses(
        (status = 201, description = "Stored reading", body = SensorReadingDto),
        (status = 400, description = "Malformed reading"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "sensors"
)]
pub async fn create_reading(
    State(state): State<AppState>,
    payload: Result<Json<SensorReadingPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SensorReadingDto>), AppError> {
    let Json(payload) = payload?;
    let reading = state.store.ingest(payload).await?;
    Ok((StatusCode::CREATED, Json(reading.into())))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::api::test_support::{state, test_server};

    async fn post_reading(server: &axum_test::TestServer, body: Value) -> Value {
        let resp = server.post("/api/sensors").json(&body).await;
        resp.assert_status(axum::http::StatusCode::CREATED);
        resp.json()
    }

    fn reading_at(minute: u32, outlet: f64, power: f64, leak: bool) -> Value {
        json!({
            "timestamp": format!("2024-06-01T10:{minute:02}:00Z"),
            "flowRate": { "inlet": outlet + 0.5, "outlet": outlet },
            "voltage": { "value": 220.0 },
            "current": { "value": 16.0 },
            "power": { "value": power },
            "temperature": { "value": 35.0 },
            "leakDetected": leak,
            "motorStatus": "running"
        })
    }

    // -----------------------------------------------------------------------
    // GET /api/sensors/latest
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn latest_is_null_when_empty() {
        let server = test_server(state());
        let resp = server.get("/api/sensors/latest").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn latest_returns_newest_by_timestamp() {
        let server = test_server(state());
        post_reading(&server, reading_at(30, 7.0, 2.0, false)).await;
        post_reading(&server, reading_at(10, 3.0, 2.0, false)).await;

        let body: Value = server.get("/api/sensors/latest").await.json();
        assert_eq!(body["flowRate"]["outlet"], 7.0);
        assert_eq!(body["voltage"]["unit"], "V");
        assert_eq!(body["motorStatus"], "running");
    }

    // -----------------------------------------------------------------------
    // POST /api/sensors
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_fills_defaults() {
        let server = test_server(state());
        let body = post_reading(&server, json!({})).await;
        assert!(body["id"].is_string());
        assert!(body["timestamp"].is_string());
        assert_eq!(body["leakDetected"], false);
        assert_eq!(body["motorStatus"], "stopped");
        assert_eq!(body["power"]["unit"], "W");
    }

    #[tokio::test]
    async fn create_rejects_unknown_motor_status() {
        let server = test_server(state());
        let resp = server
            .post("/api/sensors")
            .json(&json!({ "motorStatus": "exploded" }))
            .await;
        resp.assert_status_bad_request();
        let body: Value = resp.json();
        assert!(body["error"].is_string());
    }

    // -----------------------------------------------------------------------
    // GET /api/sensors/historical
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn historical_defaults_to_first_page_of_100() {
        let server = test_server(state());
        for minute in 0..3 {
            post_reading(&server, reading_at(minute, minute as f64, 1.0, false)).await;
        }

        let body: Value = server.get("/api/sensors/historical").await.json();
        assert_eq!(body["total"], 3);
        assert_eq!(body["pages"], 1);
        assert_eq!(body["currentPage"], 1);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"][0]["flowRate"]["outlet"], 2.0);
    }

    #[tokio::test]
    async fn historical_pages_newest_first() {
        let server = test_server(state());
        for minute in 0..23 {
            post_reading(&server, reading_at(minute, minute as f64, 1.0, false)).await;
        }

        let resp = server
            .get("/api/sensors/historical")
            .add_query_param("page", 2)
            .add_query_param("limit", 10)
            .await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(data[0]["flowRate"]["outlet"], 12.0);
        assert_eq!(body["total"], 23);
        assert_eq!(body["pages"], 3);
        assert_eq!(body["currentPage"], 2);
    }

    #[tokio::test]
    async fn historical_filters_by_range() {
        let server = test_server(state());
        for minute in 0..10 {
            post_reading(&server, reading_at(minute, minute as f64, 1.0, false)).await;
        }

        let resp = server
            .get("/api/sensors/historical")
            .add_query_param("startDate", "2024-06-01T10:02:00Z")
            .add_query_param("endDate", "2024-06-01T10:04:00Z")
            .await;
        let body: Value = resp.json();
        assert_eq!(body["total"], 3);
        let outlets: Vec<f64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["flowRate"]["outlet"].as_f64().unwrap())
            .collect();
        assert_eq!(outlets, vec![4.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn historical_rejects_malformed_params() {
        let server = test_server(state());

        for (key, value) in [
            ("page", "0"),
            ("limit", "0"),
            ("limit", "ten"),
            ("page", "-1"),
            ("startDate", "yesterday"),
        ] {
            let resp = server
                .get("/api/sensors/historical")
                .add_query_param(key, value)
                .await;
            resp.assert_status_bad_request();
        }
    }

    // -----------------------------------------------------------------------
    // GET /api/sensors/leaks
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn leaks_returns_at_most_ten_flagged() {
        let server = test_server(state());
        for minute in 0..14 {
            post_reading(&server, reading_at(minute, minute as f64, 1.0, true)).await;
        }
        post_reading(&server, reading_at(59, 99.0, 1.0, false)).await;

        let body: Vec<Value> = server.get("/api/sensors/leaks").await.json();
        assert_eq!(body.len(), 10);
        assert!(body.iter().all(|r| r["leakDetected"] == true));
        assert_eq!(body[0]["flowRate"]["outlet"], 13.0);
    }

    // -----------------------------------------------------------------------
    // GET /api/sensors/efficiency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn efficiency_is_404_without_data() {
        let server = test_server(state());
        let resp = server.get("/api/sensors/efficiency").await;
        resp.assert_status_not_found();
        let body: Value = resp.json();
        assert_eq!(body["error"], "No sensor data available");
    }

    #[tokio::test]
    async fn efficiency_uses_latest_reading() {
        let server = test_server(state());
        post_reading(&server, reading_at(1, 100.0, 1.0, false)).await;
        post_reading(&server, reading_at(2, 10.0, 4.0, false)).await;

        let body: Value = server.get("/api/sensors/efficiency").await.json();
        assert_eq!(body["powerConsumption"], 4.0);
        assert_eq!(body["flowRate"], 10.0);
        assert_eq!(body["efficiency"], 2.5);
    }

    #[tokio::test]
    async fn efficiency_with_zero_power_is_null() {
        let server = test_server(state());
        post_reading(&server, reading_at(1, 10.0, 0.0, false)).await;

        let resp = server.get("/api/sensors/efficiency").await;
        resp.assert_status_ok();
        let body: Value = resp.json();
        assert!(body["efficiency"].is_null());
    }
}
