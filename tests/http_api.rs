use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use companion_hub::db::enums::CompanionTheme;
use companion_hub::db::models::CompanionDraft;
use companion_hub::db::schema::ensure_schema;
use companion_hub::routing::RouteTable;
use companion_hub::server::config::ServerConfig;
use companion_hub::services::LocalAuthProvider;
use companion_hub::services::mailer::OutboxMailer;
use companion_hub::store::{CatalogStore, SeaOrmCatalogStore};
use companion_hub::web::{AppState, create_axum_router};

struct TestApp {
    router: Router,
    store: Arc<SeaOrmCatalogStore>,
}

async fn app() -> TestApp {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    ensure_schema(&db).await.unwrap();

    let mut config = ServerConfig::new("sqlite::memory:", "integration-secret");
    config.admin_emails = vec!["admin@example.com".to_string()];
    config.catalog.show_more_delay_ms = 0;
    let config = Arc::new(config);

    let auth = LocalAuthProvider::new(db.clone(), config.clone(), Arc::new(OutboxMailer::new()))
        .with_hash_cost(4 /* bcrypt minimum cost; bcrypt::MIN_COST is private */);
    let store = Arc::new(SeaOrmCatalogStore::new(db));
    let router = create_axum_router(AppState {
        store: store.clone(),
        auth: Arc::new(auth),
        routes: Arc::new(RouteTable::standard()),
        config,
    });
    TestApp { router, store }
}

fn draft(name: &str, featured: bool) -> CompanionDraft {
    CompanionDraft {
        name: name.to_string(),
        avatar: "https://cdn.example.com/a.png".to_string(),
        description: "Helps with things".to_string(),
        companion_link: "https://chat.example.com/c".to_string(),
        theme: CompanionTheme::Professional,
        featured,
        tags: Vec::new(),
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookie, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn sign_up(router: &Router, email: &str) -> String {
    let (status, _, body) = send(
        router,
        post_json("/api/auth/signup", None, json!({ "email": email, "password": "long enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_is_public() {
    let app = app().await;
    let response = app.router.clone().oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_viewers_browse_the_catalog() {
    let app = app().await;
    for i in 0..12 {
        app.store.insert_companion(&draft(&format!("Companion {i:02}"), i < 2)).await.unwrap();
    }

    let (status, _, body) = send(&app.router, get("/api/catalog", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 9);
    assert_eq!(body["total_matches"], 12);
    assert_eq!(body["has_more"], true);
    let key = body["query_key"].as_str().unwrap().to_string();

    let uri = format!("/api/catalog?shown=9&key={}&more=true", urlencoding::encode(&key));
    let (_, _, body) = send(&app.router, get(&uri, None)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 12);
    assert_eq!(body["has_more"], false);

    let (_, _, body) = send(&app.router, get("/api/catalog?q=nobody", None)).await;
    assert_eq!(body["no_results"], true);

    let (_, _, body) = send(&app.router, get("/api/catalog/featured", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, _, body) = send(&app.router, get("/api/catalog/newest", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, _, _) = send(&app.router, get("/api/catalog?sort=random", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn changing_the_query_starts_over_at_one_page() {
    let app = app().await;
    for i in 0..30 {
        app.store.insert_companion(&draft(&format!("Companion {i:02}"), false)).await.unwrap();
    }

    let mut shown = 9;
    let (_, _, body) = send(&app.router, get("/api/catalog", None)).await;
    let mut key = body["query_key"].as_str().unwrap().to_string();
    for _ in 0..2 {
        let uri = format!("/api/catalog?shown={shown}&key={}&more=true", urlencoding::encode(&key));
        let (_, _, body) = send(&app.router, get(&uri, None)).await;
        shown = body["shown"].as_u64().unwrap();
        key = body["query_key"].as_str().unwrap().to_string();
    }
    assert_eq!(shown, 27);

    // Same inputs keep the counter.
    let uri = format!("/api/catalog?shown=27&key={}", urlencoding::encode(&key));
    let (_, _, body) = send(&app.router, get(&uri, None)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 27);

    // A new search text with the old key goes back to one page.
    let uri = format!("/api/catalog?q=companion&shown=27&key={}", urlencoding::encode(&key));
    let (_, _, body) = send(&app.router, get(&uri, None)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 9);
    assert_eq!(body["total_matches"], 30);
    assert_ne!(body["query_key"], key.as_str());

    let (_, _, body) = send(&app.router, get("/api/catalog?sort=rating&shown=27", None)).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn oversized_counter_is_clamped_not_fatal() {
    let app = app().await;
    for i in 0..3 {
        app.store.insert_companion(&draft(&format!("Companion {i:02}"), false)).await.unwrap();
    }
    let (_, _, body) = send(&app.router, get("/api/catalog", None)).await;
    let key = body["query_key"].as_str().unwrap().to_string();

    let uri = format!(
        "/api/catalog?shown={}&key={}&more=true",
        usize::MAX,
        urlencoding::encode(&key)
    );
    let (status, _, body) = send(&app.router, get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["has_more"], false);
}

#[tokio::test]
async fn signup_sets_session_cookie_and_login_checks_password() {
    let app = app().await;
    let (status, cookie, body) = send(
        &app.router,
        post_json("/api/auth/signup", None, json!({ "email": "ada@example.com", "password": "long enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(cookie.unwrap().starts_with("token="));
    assert_eq!(body["landing_path"], "/dashboard");

    let (status, _, _) = send(
        &app.router,
        post_json("/api/auth/login", None, json!({ "email": "ada@example.com", "password": "wrong one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = send(
        &app.router,
        post_json("/api/auth/login", None, json!({ "email": "ADA@example.com", "password": "long enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::get("/api/me")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn logout_ends_the_session_and_expires_the_cookie() {
    let app = app().await;
    let token = sign_up(&app.router, "ada@example.com").await;

    let (status, cookie, _) = send(&app.router, post_json("/api/auth/logout", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let cookie = cookie.unwrap();
    assert!(cookie.starts_with("token=;"), "{cookie}");
    assert!(cookie.contains("Max-Age=0"), "{cookie}");

    let (status, _, _) = send(&app.router, post_json("/api/auth/logout", None, json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_area_is_gated_by_role() {
    let app = app().await;
    let user = sign_up(&app.router, "ada@example.com").await;
    let admin = sign_up(&app.router, "admin@example.com").await;

    let (status, _, _) = send(&app.router, get("/api/admin/companions", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&app.router, get("/api/admin/companions", Some(&user))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&app.router, get("/api/admin/companions", Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(
        &app.router,
        post_json("/api/admin/companions", Some(&admin), serde_json::to_value(draft("Guru", true)).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Guru");
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn page_paths_redirect_to_login() {
    let app = app().await;
    let response = app.router.clone().oneshot(get("/dashboard/starred", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/login?next=%2Fdashboard%2Fstarred"
    );

    let (status, _, body) = send(&app.router, get("/api/route-access?path=/admin", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["decision"], "redirect_to_login");
    assert_eq!(body["location"], "/login?next=%2Fadmin");

    let user = sign_up(&app.router, "ada@example.com").await;
    let (_, _, body) = send(&app.router, get("/api/route-access?path=/admin", Some(&user))).await;
    assert_eq!(body["decision"], "redirect_to");
    assert_eq!(body["location"], "/dashboard");
}

#[tokio::test]
async fn toggling_interactions_keeps_like_and_dislike_exclusive() {
    let app = app().await;
    let companion = app.store.insert_companion(&draft("Guru", false)).await.unwrap();
    let uri = |kind: &str| format!("/api/me/interactions/{}/{kind}", companion.id());

    let (status, _, body) = send(&app.router, post_json(&uri("like"), None, json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("error").is_some());

    let token = sign_up(&app.router, "ada@example.com").await;
    let (status, _, body) = send(&app.router, post_json(&uri("like"), Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["interaction"], json!({ "liked": true, "disliked": false, "starred": false }));
    assert_eq!(body["counts"]["likes"], 1);

    let (_, _, body) = send(&app.router, post_json(&uri("dislike"), Some(&token), json!({}))).await;
    assert_eq!(body["interaction"], json!({ "liked": false, "disliked": true, "starred": false }));
    assert_eq!(body["counts"], json!({ "likes": 0, "dislikes": 1, "stars": 0 }));

    let flags_uri = format!("/api/me/interactions/{}", companion.id());
    let (_, _, body) = send(&app.router, get(&flags_uri, Some(&token))).await;
    assert_eq!(body["disliked"], true);

    let (status, _, _) = send(&app.router, post_json(&uri("wave"), Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
