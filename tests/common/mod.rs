#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use tenant_users::auth::jwt::{encode_token, Claims};
use tenant_users::config::{Config, LogFormat, PasswordConfig};
use tenant_users::models::{Role, TenantId};
use tenant_users::repository::{InMemoryUserRepository, PgUserRepository, UserRepository};

pub const JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough";

pub enum Backend {
    Memory(Arc<InMemoryUserRepository>),
    Postgres { pool: PgPool, db_name: String },
}

/// A running test server instance.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub backend: Backend,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Access token for `user_id`, scoped to `tenant` through the `tid` claim.
    pub fn token(&self, user_id: Uuid, tenant: Option<&str>) -> String {
        let claims = Claims::new(user_id, tenant.map(str::to_string), Duration::minutes(15));
        encode_token(&claims, JWT_SECRET).expect("encode token")
    }

    /// Token for an arbitrary operator in the default tenant.
    pub fn admin_token(&self) -> String {
        self.token(Uuid::now_v7(), None)
    }

    pub fn tenant_token(&self, tenant: &str) -> String {
        self.token(Uuid::now_v7(), Some(tenant))
    }

    /// Make a role available to `tenant` and return it.
    pub async fn seed_role(&self, tenant: &str, name: &str) -> Role {
        let role = Role {
            id: Uuid::now_v7(),
            name: name.to_string(),
            permissions: json!({ "users": ["read"] }),
        };

        match &self.backend {
            Backend::Memory(repo) => repo.seed_role(&TenantId::from(tenant), role.clone()).await,
            Backend::Postgres { pool, .. } => {
                sqlx::query(
                    "INSERT INTO roles (id, tenant_id, name, permissions) VALUES ($1, $2, $3, $4)",
                )
                .bind(role.id)
                .bind(tenant)
                .bind(&role.name)
                .bind(&role.permissions)
                .execute(pool)
                .await
                .expect("seed role");
            }
        }

        role
    }

    /// Create a user through the API and return its `data` object.
    pub async fn create_user(&self, token: &str, email: &str, first_name: &str) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/users",
                token,
                &json!({
                    "email": email,
                    "first_name": first_name,
                    "last_name": "Tester",
                    "password": "securepassword123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {body}");
        body["data"].clone()
    }

    /// Make an unauthenticated GET request.
    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request with JSON body.
    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated PUT request with JSON body.
    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated DELETE request.
    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        jwt_secret: JWT_SECRET.to_string(),
        service_name: "tenant-users".to_string(),
        environment: "test".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        db_max_connections: 5,
        log_level: "warn".to_string(),
        log_format: LogFormat::Pretty,
        // Cheap hashing keeps the suite fast
        password: PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
        },
    }
}

async fn serve(config: Config, repository: Arc<dyn UserRepository>, backend: Backend) -> TestApp {
    let app = tenant_users::build_app(config, repository).expect("build app");

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        backend,
    }
}

/// Spawn a test app over the in-memory store.
pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryUserRepository::new());
    serve(
        test_config("postgres://unused".to_string()),
        repo.clone(),
        Backend::Memory(repo),
    )
    .await
}

fn database_url_with(base_url: &str, db_name: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary Postgres database. Returns `None`
/// when `DATABASE_URL` is not set, so the SQL suite runs wherever a database
/// is configured and is skipped elsewhere.
pub async fn spawn_pg_app() -> Option<TestApp> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres-backed test");
        return None;
    };
    let db_name = format!("tenant_users_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url_with(&base_url, "postgres"))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = database_url_with(&base_url, &db_name);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let repo = Arc::new(PgUserRepository::new(pool.clone()));
    Some(serve(test_config(test_url), repo, Backend::Postgres { pool, db_name }).await)
}

/// Drop the temporary database, if the app has one.
pub async fn cleanup(app: TestApp) {
    let Backend::Postgres { pool, db_name } = app.backend else {
        return;
    };
    pool.close().await;

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url_with(&base_url, "postgres"))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
