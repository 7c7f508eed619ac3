use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{debug, info, warn};

use thermobit_common::{
    HeaterService, ServerConfig, StateStore, StoreError, TempView, UnitReport,
};

use crate::{store::FileStore, templog::TempLog};

pub struct AppState<S> {
    service: Arc<Mutex<HeaterService<S>>>,
    log: Arc<TempLog>,
    timezone: Tz,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            log: Arc::clone(&self.log),
            timezone: self.timezone,
        }
    }
}

impl<S> AppState<S> {
    pub fn new(service: HeaterService<S>, log: TempLog, timezone: Tz) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            log: Arc::new(log),
            timezone,
        }
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }
}

impl<S: StateStore + Send + 'static> AppState<S> {
    /// Runs one read-modify-write on the blocking pool, holding the service
    /// lock for its whole duration.
    async fn with_service<T, F>(&self, op: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut HeaterService<S>) -> Result<T, StoreError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let result = tokio::task::spawn_blocking(move || {
            let mut service = service.blocking_lock();
            op(&mut *service)
        })
        .await
        .context("state store task failed")?;
        Ok(result?)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = std::env::var("THERMOBIT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.thermobit"));
    let config = load_config(&data_dir);
    let timezone = parse_timezone(&config.timezone);

    let store = FileStore::new(&data_dir);
    info!(
        "control state at {}, timezone {}",
        store.path().display(),
        timezone.name()
    );

    let service = HeaterService::new(store, &config);
    let log = TempLog::new(data_dir.join("temp_log.txt"));
    let app = router(AppState::new(service, log, timezone));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind heater server at {addr}"))?;

    info!("heater server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("heater server stopped");
    Ok(())
}

pub fn router<S>(state: AppState<S>) -> Router
where
    S: StateStore + Send + 'static,
{
    Router::new()
        .route("/", get(handle_index))
        .route(
            "/home/espcreate/",
            get(handle_unit_report::<S>).post(handle_unit_report::<S>),
        )
        .route("/home/updated", get(handle_poll::<S>))
        .route("/get_temp", get(handle_get_temp::<S>))
        .route("/set_temp", get(handle_set_temp::<S>))
        .route("/set_timer", get(handle_set_timer::<S>))
        .route("/history", get(handle_history::<S>))
        .route("/version/IsAlive", get(handle_is_alive))
        .with_state(state)
}

async fn handle_unit_report<S>(State(state): State<AppState<S>>, body: Bytes) -> StatusCode
where
    S: StateStore + Send + 'static,
{
    let report = UnitReport::from_slice(&body);
    debug!("unit report: {report:?}");

    let temp = report.current_temp();
    let now = state.now();
    if let Err(err) = state
        .with_service(move |service| service.ingest_reading(temp))
        .await
    {
        warn!("failed to store reading {temp}: {err:#}");
    }

    if let Err(err) = state.log.append(&now, temp).await {
        warn!("failed to append temperature log: {err:#}");
    }

    StatusCode::OK
}

async fn handle_poll<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    S: StateStore + Send + 'static,
{
    let user_number = query_param::<i64>(&params, "UserNumber").unwrap_or(0);
    let now = state.now();

    let result = state
        .with_service(move |service| service.poll(user_number, &now))
        .await;

    match result {
        Ok(signed) => Json(signed).into_response(),
        Err(err) => {
            warn!("directive poll failed: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "control state unavailable")
        }
    }
}

async fn handle_get_temp<S>(State(state): State<AppState<S>>) -> Json<TempView>
where
    S: StateStore + Send + 'static,
{
    let result = state.with_service(|service| service.temp_view()).await;

    Json(result.unwrap_or_else(|err| {
        warn!("failed to read control state: {err:#}");
        TempView::unavailable()
    }))
}

async fn handle_set_temp<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    S: StateStore + Send + 'static,
{
    let requested = query_param::<i64>(&params, "set_temp").unwrap_or(-1);

    let result = state
        .with_service(move |service| service.set_target(requested, Utc::now()))
        .await;

    match result {
        Ok(Some(set_temp)) => format!("temp_set:{set_temp}").into_response(),
        Ok(None) => handle_get_temp(State(state)).await.into_response(),
        Err(err) => {
            warn!("failed to persist set temperature {requested}: {err:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist set temperature",
            )
        }
    }
}

async fn handle_set_timer<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    S: StateStore + Send + 'static,
{
    let clear = params.contains_key("clear");
    let start = query_param::<u32>(&params, "hour").zip(query_param::<u32>(&params, "min"));
    let timer_temp = query_param::<i32>(&params, "temp");

    let result = state
        .with_service(move |service| match (clear, start) {
            (true, _) => service.clear_timer(),
            (false, Some((hour, minute))) => service.configure_timer(hour, minute, timer_temp),
            (false, None) => service.timer_view(),
        })
        .await;

    match result {
        Ok(view) => Json(view).into_response(),
        Err(err) => {
            warn!("failed to update daily timer: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to persist timer")
        }
    }
}

async fn handle_history<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: StateStore + Send + 'static,
{
    let samples = state.log.samples().await.unwrap_or_else(|err| {
        warn!("failed to read temperature log: {err:#}");
        Vec::new()
    });
    Json(samples)
}

async fn handle_is_alive() -> &'static str {
    "Thermobit"
}

async fn handle_index() -> Html<&'static str> {
    Html("<p>Thermobit heater server</p>")
}

fn load_config(data_dir: &Path) -> ServerConfig {
    let path = data_dir.join("config.json");
    let mut config = match std::fs::read(&path) {
        Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
            warn!("ignoring malformed {}: {err}", path.display());
            ServerConfig::default()
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => ServerConfig::default(),
        Err(err) => {
            warn!("failed to read {}: {err}", path.display());
            ServerConfig::default()
        }
    };

    if let Some(port) = std::env::var("THERMOBIT_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.http_port = port;
    }
    if let Ok(timezone) = std::env::var("THERMOBIT_TIMEZONE") {
        config.timezone = timezone;
    }

    config.sanitize();
    config
}

fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        warn!("unknown timezone '{name}', falling back to UTC");
        Tz::UTC
    })
}

fn query_param<T: FromStr>(params: &HashMap<String, String>, name: &str) -> Option<T> {
    params.get(name).and_then(|value| value.trim().parse().ok())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
