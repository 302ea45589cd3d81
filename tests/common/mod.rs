#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::Value;
use time::Date;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use corkboard::app::notifier::{NotificationChannels, Notifier};
use corkboard::config::AppConfig;
use corkboard::infra::{db::Db, queue::JobQueue};
use corkboard::jobs::worker;
use corkboard::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// 32 bytes base64-encoded (test-only key — NOT used in production)
// "0123456789abcdef0123456789abcdef"
pub const TEST_PASETO_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const DEFAULT_PASSWORD: &str = "testpassword123";

// ---------------------------------------------------------------------------
// TestApp — shared, lazily initialized once per test binary
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    /// The one self-registered admin this app's database will ever hold.
    pub admin: TestUser,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub access_token: String,
}

static TEST_APP: OnceCell<TestApp> = OnceCell::const_new();

/// Get (or lazily create) the shared TestApp instance.
pub async fn app() -> &'static TestApp {
    TEST_APP
        .get_or_init(|| async { TestApp::setup(true).await })
        .await
}

pub fn test_config(make_admin_enabled: bool) -> AppConfig {
    let db_path = std::env::temp_dir().join(format!("corkboard_test_{}.db", Uuid::new_v4()));
    let mut paseto_key = [0u8; 32];
    paseto_key.copy_from_slice(&STANDARD.decode(TEST_PASETO_KEY).expect("invalid test key"));

    AppConfig {
        http_addr: "127.0.0.1:0".to_string(),
        database_url: format!("sqlite:{}", db_path.display()),
        db_max_connections: 5,
        db_connect_timeout_seconds: 30,
        // Each #[tokio::test] creates a separate tokio runtime, but the pool
        // is shared via OnceCell.  Connections created in one runtime become
        // stale when that runtime is dropped.  A zero idle timeout forces the
        // pool to discard idle connections on acquire and open fresh ones in
        // the current runtime.
        db_idle_timeout_seconds: 0,
        db_max_lifetime_seconds: 1800,
        paseto_key,
        token_ttl_minutes: 60,
        make_admin_enabled,
        sweep_interval_seconds: 86400,
        sweep_retry_seconds: 3600,
        smtp_host: None,
        smtp_username: None,
        smtp_password: None,
        mail_from: None,
        twilio_account_sid: None,
        twilio_auth_token: None,
        twilio_from_number: None,
    }
}

impl TestApp {
    /// Build a private app against a virgin database. Needed by tests that
    /// exercise the admin bootstrap (the shared app has already consumed it)
    /// or that depend on the background worker living in the current
    /// runtime.
    pub async fn isolated(make_admin_enabled: bool) -> Self {
        Self::setup(make_admin_enabled).await
    }

    async fn setup(make_admin_enabled: bool) -> Self {
        let config = test_config(make_admin_enabled);
        let db = Db::connect(&config).await.expect("Db::connect failed");

        let (jobs, job_rx) = JobQueue::new();
        let notifier = Notifier::new(db.clone(), NotificationChannels::none());
        tokio::spawn(worker::run(db.clone(), notifier, job_rx));

        let state = AppState {
            db,
            jobs,
            paseto_key: config.paseto_key,
            token_ttl_minutes: config.token_ttl_minutes,
            make_admin_enabled: config.make_admin_enabled,
        };
        let router = corkboard::http::router(state.clone());

        let mut app = TestApp {
            router,
            state,
            admin: TestUser {
                id: Uuid::nil(),
                email: String::new(),
                access_token: String::new(),
            },
        };
        // Consume the admin bootstrap up front so every later registration
        // sees a deterministic "admin slot taken" world.
        app.admin = app.register_and_login("bootstrap_admin", true).await;
        app
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, None, token).await
    }

    pub async fn put_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PUT, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    /// Register a fresh user (unique email and mobile) and log them in.
    pub async fn create_user(&self, prefix: &str) -> TestUser {
        self.register_and_login(prefix, false).await
    }

    async fn register_and_login(&self, prefix: &str, admin: bool) -> TestUser {
        let tag = Uuid::new_v4().simple().to_string();
        let email = format!("{}_{}@example.com", prefix, &tag[..8]);
        let mobile = format!("07{}", &tag[..10]);

        let resp = self
            .post_json(
                "/auth/register",
                serde_json::json!({
                    "email": email,
                    "first_name": "Test",
                    "last_name": "Resident",
                    "mobile_no": mobile,
                    "password": DEFAULT_PASSWORD,
                    "admin": admin,
                }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "registration failed: {}", resp.error_message());
        let id = resp.json()["user_id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .expect("registration returned no user_id");

        let resp = self
            .post_json(
                "/auth/login",
                serde_json::json!({ "email": email, "password": DEFAULT_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.error_message());
        let access_token = resp.json()["access_token"]
            .as_str()
            .expect("login returned no access_token")
            .to_string();

        TestUser {
            id,
            email,
            access_token,
        }
    }

    /// Insert a notice row directly, bypassing the admin gate, so tests can
    /// stage expired rows the API would never accept silently.
    pub async fn insert_notice(&self, title: &str, event_date: Option<Date>) -> Uuid {
        insert_notice(&self.state.db, title, event_date).await
    }
}

pub async fn insert_notice(db: &Db, title: &str, event_date: Option<Date>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO notices (id, title, description, category, post_date, event_date, event_start_time, event_end_time) \
         VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL)",
    )
    .bind(id)
    .bind(title)
    .bind("inserted directly by the test harness")
    .bind("General Announcement")
    .bind(time::OffsetDateTime::now_utc().date())
    .bind(event_date)
    .execute(db.pool())
    .await
    .expect("failed to insert notice");
    id
}

pub fn yesterday() -> Date {
    (time::OffsetDateTime::now_utc() - time::Duration::days(1)).date()
}

pub fn tomorrow() -> Date {
    (time::OffsetDateTime::now_utc() + time::Duration::days(1)).date()
}
