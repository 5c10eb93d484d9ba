//! Axum demo of the route response cache.
//!
//! Run:
//!   cargo run -p routecache-demos --bin axum-demo
//!
//! Set `REDIS_URL` (e.g. `redis://127.0.0.1/`) to keep entries in Redis
//! instead of the in-process store.
//!
//! Endpoints:
//!   - http://localhost:3000/tasks           - Task list (min 5s, max 60s)
//!   - http://localhost:3000/tasks?page=2    - Another page, another entry
//!   - http://localhost:3000/tasks/3         - One task, one entry per id (max 30s)
//!   - http://localhost:3000/clock           - Current time (max 10s)
//!   - http://localhost:3000/health          - Health check (caching disabled)
//!
//! Try it:
//!   curl -i http://localhost:3000/tasks                                 # MISS, then HIT
//!   curl -i -H 'Cache-Control: max-age=1' http://localhost:3000/tasks   # HIT/STALE until 5s old
//!   curl -i -H 'Cache-Control: no-cache' http://localhost:3000/clock    # always fresh
//!   curl -i -H 'Cache-Control: only-if-cached' 'http://localhost:3000/tasks?page=9'  # REJECT

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use routecache::{CacheConfig, RouteCache, RouteConfig};
use routecache_backend::Store;
use routecache_moka::MokaStore;
use routecache_redis::RedisStore;
use routecache_tower::RouteCacheLayer;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
routes:
  - route: /tasks
    policy:
      min: 5s
      max: 1m
    store_timeout: 50ms
  - route: /tasks/{id}
    policy:
      max: 30s
    store_timeout: 50ms
  - route: /clock
    policy:
      max: 10s
    store_timeout: 50ms
  - route: /health
"#;

#[derive(Debug, Clone, Serialize)]
struct Task {
    id: u32,
    title: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_page")]
    page: u32,
}

fn default_page() -> u32 {
    1
}

const TASKS: [&str; 6] = [
    "Set up project structure",
    "Implement authentication",
    "Write unit tests",
    "Add pagination",
    "Set up CI/CD",
    "Add caching layer",
];

const PAGE_SIZE: usize = 3;

async fn list_tasks(Query(params): Query<ListParams>) -> Json<Vec<Task>> {
    tracing::info!(page = params.page, "Fetching task list");
    // Pretend the listing is expensive.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let start = (params.page.saturating_sub(1) as usize) * PAGE_SIZE;
    Json(
        TASKS
            .iter()
            .enumerate()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|(i, title)| Task {
                id: i as u32 + 1,
                title,
            })
            .collect(),
    )
}

async fn get_task(Path(id): Path<u32>) -> Result<Json<Task>, StatusCode> {
    tracing::info!(id, "Fetching task");
    let title = id
        .checked_sub(1)
        .and_then(|index| TASKS.get(index as usize))
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(Task { id, title }))
}

async fn clock() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    format!("{now}\n")
}

async fn health() -> &'static str {
    "OK"
}

fn route(config: &CacheConfig, pattern: &str) -> Result<RouteConfig, Box<dyn Error>> {
    config
        .route(pattern)
        .cloned()
        .ok_or_else(|| format!("route {pattern} is not configured").into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,routecache=debug,routecache_tower=trace")),
        )
        .init();

    let config = CacheConfig::from_yaml(CONFIG)?;

    let moka = MokaStore::builder(10_000).build();
    let store: Arc<dyn Store> = match std::env::var("REDIS_URL") {
        Ok(url) => {
            tracing::info!(%url, "Using Redis store");
            Arc::new(RedisStore::builder().server(url).build()?)
        }
        Err(_) => {
            tracing::info!("Using in-process store");
            Arc::new(moka.clone())
        }
    };
    let sweeper = moka.spawn_sweeper(Duration::from_secs(1));

    let tasks = RouteCache::new(route(&config, "/tasks")?, store.clone())?;
    let task = RouteCache::new(route(&config, "/tasks/{id}")?, store.clone())?;
    let clock_cache = RouteCache::new(route(&config, "/clock")?, store.clone())?;
    let health_cache = RouteCache::new(route(&config, "/health")?, store)?;
    tasks.observe(&moka);
    task.observe(&moka);
    clock_cache.observe(&moka);

    let app = Router::new()
        .route("/tasks", get(list_tasks).layer(RouteCacheLayer::new(tasks)))
        .route("/tasks/{id}", get(get_task).layer(RouteCacheLayer::new(task)))
        .route("/clock", get(clock).layer(RouteCacheLayer::new(clock_cache)))
        .route("/health", get(health).layer(RouteCacheLayer::new(health_cache)));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}
