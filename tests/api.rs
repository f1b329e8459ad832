use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, EntityTrait, PaginatorTrait};
use serde_json::{Value, json};

use cinevault::{
    AppState,
    auth::TokenKeys,
    catalog::Catalog,
    config::Config,
    entities::{actor, genre, movie},
};

async fn make_server() -> (TestServer, Catalog) {
    // One pooled connection, or each pool member would open its own
    // private in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let catalog = Catalog::new(db);

    let config = Arc::new(Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_secs: 900,
        db_connect_attempts: 1,
        db_connect_retry_ms: 0,
    });
    let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl_secs);
    let state = Arc::new(AppState { config, catalog: catalog.clone(), tokens });

    (TestServer::new(cinevault::router(state)).unwrap(), catalog)
}

async fn login_token(server: &TestServer) -> String {
    server
        .post("/auth/register")
        .json(&json!({ "username": "alice", "password": "s3cret" }))
        .await
        .assert_status(StatusCode::CREATED);

    let res = server
        .post("/auth/login")
        .json(&json!({ "username": "alice", "password": "s3cret" }))
        .await;
    res.assert_status_ok();
    res.json::<Value>()["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check() {
    let (server, _) = make_server().await;
    let res = server.get("/healthz").await;
    res.assert_status_ok();
    res.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (server, _) = make_server().await;
    let body = json!({ "username": "bob", "password": "pw" });

    server.post("/auth/register").json(&body).await.assert_status(StatusCode::CREATED);

    let res = server.post("/auth/register").json(&body).await;
    res.assert_status(StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>()["error"], "username exists");
}

#[tokio::test]
async fn registration_requires_both_fields() {
    let (server, _) = make_server().await;

    let res = server.post("/auth/register").json(&json!({ "username": "bob" })).await;
    res.assert_status(StatusCode::BAD_REQUEST);

    let res = server
        .post("/auth/register")
        .json(&json!({ "username": "", "password": "pw" }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (server, _) = make_server().await;
    server
        .post("/auth/register")
        .json(&json!({ "username": "bob", "password": "right" }))
        .await
        .assert_status(StatusCode::CREATED);

    // Wrong password and unknown user read the same from outside.
    let wrong = server
        .post("/auth/login")
        .json(&json!({ "username": "bob", "password": "wrong" }))
        .await;
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.json::<Value>()["error"], "invalid credentials");

    let unknown = server
        .post("/auth/login")
        .json(&json!({ "username": "nobody", "password": "wrong" }))
        .await;
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json::<Value>()["error"], "invalid credentials");
}

#[tokio::test]
async fn protected_endpoints_require_a_valid_token() {
    let (server, _) = make_server().await;

    server
        .post("/api/movies")
        .json(&json!({ "title": "Dune" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .post("/api/movies")
        .authorization_bearer("not-a-token")
        .json(&json!({ "title": "Dune" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server.delete("/api/movies/1").await.assert_status(StatusCode::UNAUTHORIZED);
    server.post("/admin/seed").await.assert_status(StatusCode::UNAUTHORIZED);

    let token = login_token(&server).await;
    server
        .post("/api/movies")
        .authorization_bearer(&token)
        .json(&json!({ "title": "Dune" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn created_movie_is_retrievable_and_searchable() {
    let (server, _) = make_server().await;
    let token = login_token(&server).await;

    let res = server
        .post("/api/movies")
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Dune",
            "duration": 155,
            "year": 2021,
            "genres": ["Science Fiction"],
            "actors": ["Timothee Chalamet", "Zendaya"],
            "directors": ["Denis Villeneuve"],
            "languages": ["English"]
        }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let id = res.json::<Value>()["id"].as_i64().unwrap();

    let detail = server.get(&format!("/api/movies/{id}")).await;
    detail.assert_status_ok();
    let body = detail.json::<Value>();
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["year"], 2021);
    assert_eq!(body["genres"], json!(["Science Fiction"]));
    assert_eq!(body["actors"], json!(["Timothee Chalamet", "Zendaya"]));
    assert_eq!(body["directors"], json!(["Denis Villeneuve"]));
    // Single-token name round-trips without a trailing space.
    assert_eq!(body["actors"][1], "Zendaya");

    for q in ["Dun", "dun"] {
        let list = server.get("/api/movies").add_query_param("q", q).await;
        list.assert_status_ok();
        let page = list.json::<Value>();
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["title"], "Dune");
    }

    let miss = server.get("/api/movies").add_query_param("q", "Alien").await;
    assert_eq!(miss.json::<Value>()["total"], 0);
}

#[tokio::test]
async fn missing_title_and_duplicate_title_are_rejected() {
    let (server, _) = make_server().await;
    let token = login_token(&server).await;

    let res = server
        .post("/api/movies")
        .authorization_bearer(&token)
        .json(&json!({ "year": 2021 }))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"], "title required");

    server
        .post("/api/movies")
        .authorization_bearer(&token)
        .json(&json!({ "title": "Dune" }))
        .await
        .assert_status(StatusCode::CREATED);

    let dup = server
        .post("/api/movies")
        .authorization_bearer(&token)
        .json(&json!({ "title": "Dune" }))
        .await;
    dup.assert_status(StatusCode::CONFLICT);
    assert_eq!(dup.json::<Value>()["error"], "movie already exists");
}

#[tokio::test]
async fn listing_pages_past_the_end_are_empty_not_errors() {
    let (server, _) = make_server().await;
    let token = login_token(&server).await;

    for title in ["Alien", "Blade Runner", "Casablanca"] {
        server
            .post("/api/movies")
            .authorization_bearer(&token)
            .json(&json!({ "title": title }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let res = server
        .get("/api/movies")
        .add_query_param("page", "5")
        .add_query_param("per_page", "10")
        .await;
    res.assert_status_ok();
    let page = res.json::<Value>();
    assert_eq!(page["total"], 3);
    assert_eq!(page["pages"], 1);
    assert_eq!(page["page"], 5);
    assert_eq!(page["items"], json!([]));
}

#[tokio::test]
async fn listing_is_ordered_by_title() {
    let (server, _) = make_server().await;
    let token = login_token(&server).await;

    for title in ["Casablanca", "Alien", "Blade Runner"] {
        server
            .post("/api/movies")
            .authorization_bearer(&token)
            .json(&json!({ "title": title }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let page = server.get("/api/movies").await.json::<Value>();
    let titles: Vec<&str> =
        page["items"].as_array().unwrap().iter().map(|i| i["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Alien", "Blade Runner", "Casablanca"]);
}

#[tokio::test]
async fn shared_genre_names_resolve_to_one_row() {
    let (server, catalog) = make_server().await;
    let token = login_token(&server).await;

    for title in ["Dune", "Arrival"] {
        server
            .post("/api/movies")
            .authorization_bearer(&token)
            .json(&json!({ "title": title, "genres": ["Drama"] }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let drama_rows = genre::Entity::find().count(catalog.db()).await.unwrap();
    assert_eq!(drama_rows, 1);
}

#[tokio::test]
async fn deleting_a_movie_keeps_its_reference_rows() {
    let (server, catalog) = make_server().await;
    let token = login_token(&server).await;

    let res = server
        .post("/api/movies")
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Dune",
            "genres": ["Science Fiction"],
            "actors": ["Zendaya"]
        }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let id = res.json::<Value>()["id"].as_i64().unwrap();

    server
        .delete(&format!("/api/movies/{id}"))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    server.get(&format!("/api/movies/{id}")).await.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(server.get("/api/movies").await.json::<Value>()["total"], 0);

    // The movie is gone but its genre and actor survive.
    assert_eq!(movie::Entity::find().count(catalog.db()).await.unwrap(), 0);
    assert_eq!(genre::Entity::find().count(catalog.db()).await.unwrap(), 1);
    assert_eq!(actor::Entity::find().count(catalog.db()).await.unwrap(), 1);

    let missing = server
        .delete(&format!("/api/movies/{id}"))
        .authorization_bearer(&token)
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let (server, _) = make_server().await;
    let token = login_token(&server).await;

    let first = server.post("/admin/seed").authorization_bearer(&token).await;
    first.assert_status_ok();
    assert_eq!(first.json::<Value>()["status"], "seeded");
    assert_eq!(server.get("/api/movies").await.json::<Value>()["total"], 3);

    let second = server.post("/admin/seed").authorization_bearer(&token).await;
    second.assert_status_ok();
    assert_eq!(second.json::<Value>()["status"], "already seeded");
    assert_eq!(server.get("/api/movies").await.json::<Value>()["total"], 3);
}

#[tokio::test]
async fn unknown_movie_returns_not_found() {
    let (server, _) = make_server().await;
    let res = server.get("/api/movies/9999").await;
    res.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>()["error"], "not found");
}
