//! End-to-end tests for the cinecache HTTP server
//!
//! Starts a real Axum server on a random port, with a wiremock server
//! standing in for TMDb, and drives it over real HTTP.

use cinecache::config::{Config, RecordStoreType};
use cinecache::server::build_router;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test server helpers ───────────────────────────────────────────────────────

/// Spin up a server whose upstream is `tmdb` and whose records live for
/// `ttl_secs`.
async fn start_server(tmdb: &MockServer, ttl_secs: u64) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().unwrap();

    let config = Config {
        port: 0,
        is_dev: true,
        tmdb_api_key: "e2e-key".to_string(),
        tmdb_base_url: tmdb.uri(),
        tmdb_language: "en-US".to_string(),
        cache_ttl_secs: ttl_secs,
        list_size_cap: 20,
        upstream_timeout_secs: 2,
        record_store: RecordStoreType::Memory,
        valkey_url: None,
    };

    let app = build_router(config).await.expect("router should build");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

fn fight_club() -> Value {
    json!({
        "id": 550,
        "title": "Fight Club",
        "release_date": "1999-10-15",
        "overview": "An insomniac office worker crosses paths with a soap maker.",
        "poster_path": "/fight.jpg",
        "genres": [{"id": 18, "name": "Drama"}],
        "popularity": 61.4
    })
}

// ── Movies ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_concurrent_requests_share_one_upstream_call() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/550"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fight_club())
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&tmdb)
        .await;
    let addr = start_server(&tmdb, 86400).await;

    let client = reqwest::Client::new();
    let url = format!("http://{}/movies/550", addr);
    let requests = (0..8).map(|_| {
        let client = client.clone();
        let url = url.clone();
        tokio::spawn(async move { client.get(url).send().await.unwrap() })
    });

    let mut bodies = Vec::new();
    for handle in requests {
        let resp = handle.await.unwrap();
        assert_eq!(resp.status(), 200);
        bodies.push(resp.json::<Value>().await.unwrap());
    }

    assert!(bodies.iter().all(|b| b == &bodies[0]));
    assert_eq!(bodies[0]["title"], "Fight Club");
    assert_eq!(bodies[0]["release_year"], 1999);
}

#[tokio::test]
async fn e2e_zero_ttl_refetches_every_time() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/550"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fight_club()))
        .expect(2)
        .mount(&tmdb)
        .await;
    let addr = start_server(&tmdb, 0).await;

    let url = format!("http://{}/movies/550", addr);
    for _ in 0..2 {
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
    }
}

#[tokio::test]
async fn e2e_upstream_down_returns_503_json() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&tmdb)
        .await;
    let addr = start_server(&tmdb, 86400).await;

    let resp = reqwest::get(format!("http://{}/movies/550", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    assert!(resp.headers().contains_key("x-cinecache-version"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "upstream_unavailable");
    let message = body["message"].as_str().unwrap();
    assert!(
        !message.contains("e2e-key"),
        "API key leaked into error message: {}",
        message
    );
}

// ── Lists ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_trending_members_are_served_as_movies() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/trending/movie/day"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 550, "title": "Fight Club", "genre_ids": [18], "release_date": "1999-10-15"},
                {"id": 13, "title": "Forrest Gump", "genre_ids": [35, 18]}
            ]
        })))
        .expect(1)
        .mount(&tmdb)
        .await;
    // Movie records written by the list refresh are fresh, so no detail fetch.
    Mock::given(method("GET"))
        .and(path("/movie/550"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fight_club()))
        .expect(0)
        .mount(&tmdb)
        .await;
    let addr = start_server(&tmdb, 86400).await;

    let list: Value = reqwest::get(format!("http://{}/trending/day", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Fight Club", "Forrest Gump"]);
    assert_eq!(list[1]["genres"], json!(["Comedy", "Drama"]));

    let movie: Value = reqwest::get(format!("http://{}/movies/550", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(movie["release_year"], 1999);
}

// ── Health ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_health_over_real_socket() {
    let tmdb = MockServer::start().await;
    let addr = start_server(&tmdb, 86400).await;

    let resp = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["x-cinecache-version"].to_str().unwrap(),
        env!("CARGO_PKG_VERSION")
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
