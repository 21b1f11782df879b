// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use eduassess::{
    catalog::Catalog,
    config::Config,
    recommend::{
        DisabledGateway, GatewayError, RecommendationGateway, RecommendationRequest,
    },
    routes,
    scroll::FrameCache,
    session::SessionRegistry,
    state::AppState,
    store::{KvStore, Repository, SqliteStore},
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub config: Config,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a fresh user and logs in. Returns `(token, user_id)`.
    pub async fn new_user(&self, name: &str) -> (String, String) {
        let email = format!("{}-{}@example.com", name, uuid::Uuid::new_v4().simple());
        let response = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": "password123",
                "confirmPassword": "password123",
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body = self.login(&email, "password123").await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["userId"].as_str().unwrap().to_string(),
        )
    }

    pub async fn login(&self, email: &str, password: &str) -> Value {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }

    pub async fn admin_token(&self) -> String {
        let body = self
            .login(&self.config.admin_email, &self.config.admin_password)
            .await;
        body["token"].as_str().unwrap().to_string()
    }

    /// Starts a session, answers every question with its first option and
    /// submits. Returns the submit response body.
    pub async fn complete_assessment(&self, token: &str, assessment_id: &str) -> Value {
        let view: Value = self
            .client
            .post(self.url(&format!("/api/assessments/{}/sessions", assessment_id)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let session_id = view["sessionId"].as_str().unwrap().to_string();
        let total = view["totalQuestions"].as_u64().unwrap();

        for i in 0..total {
            let view: Value = self
                .client
                .get(self.url(&format!("/api/sessions/{}", session_id)))
                .bearer_auth(token)
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let option = view["currentQuestion"]["options"][0].as_str().unwrap().to_string();

            self.client
                .put(self.url(&format!("/api/sessions/{}/answer", session_id)))
                .bearer_auth(token)
                .json(&json!({ "option": option }))
                .send()
                .await
                .unwrap();

            if i + 1 < total {
                self.client
                    .post(self.url(&format!("/api/sessions/{}/next", session_id)))
                    .bearer_auth(token)
                    .send()
                    .await
                    .unwrap();
            }
        }

        let response = self
            .client
            .post(self.url(&format!("/api/sessions/{}/submit", session_id)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }
}

/// Gateway returning a fixed list of titles.
pub struct FixedGateway(pub Vec<String>);

#[async_trait]
impl RecommendationGateway for FixedGateway {
    async fn recommend(&self, _: &RecommendationRequest) -> Result<Vec<String>, GatewayError> {
        Ok(self.0.clone())
    }
}

/// Spawns the app backed by an in-memory SQLite store and no recommendation service.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Config::for_tests(JWT_SECRET), None, Arc::new(DisabledGateway)).await
}

/// Spawns the app on a random port.
/// `store` defaults to a fresh in-memory SQLite database.
pub async fn spawn_app_with(
    config: Config,
    store: Option<Arc<dyn KvStore>>,
    gateway: Arc<dyn RecommendationGateway>,
) -> TestApp {
    let store = match store {
        Some(store) => store,
        None => {
            // One connection: every connection to sqlite::memory: is its own database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect(&config.database_url)
                .await
                .expect("Failed to open in-memory SQLite");
            let store = SqliteStore::new(pool);
            store.migrate().await.expect("Failed to migrate database");
            Arc::new(store) as Arc<dyn KvStore>
        }
    };

    let state = AppState {
        repo: Repository::new(store),
        catalog: Arc::new(Catalog::predefined().expect("catalog loads")),
        sessions: Arc::new(SessionRegistry::new(
            config.session_ttl,
            config.max_sessions_per_user,
        )),
        gateway,
        frames: Arc::new(FrameCache::new(&config.frames_dir, config.total_frames)),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        config,
    }
}
