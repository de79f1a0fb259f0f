#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use voting_platform::{
    api::create_router,
    app_state::AppState,
    config::Config,
    database::Database,
    infrastructure::{
        billing::{BillingError, BillingProvider, CheckoutRequest, ProviderSubscription},
        media::{MediaError, MediaStore, UploadFile},
        sms::{OtpChannel, OtpVerifier, SmsError},
    },
    models::{current_time_millis, MediaAsset},
};

pub const PASSWORD: &str = "secret123!";
pub const OTP_CODE: &str = "123456";

/// Media store that keeps everything in memory and remembers deletions.
#[derive(Default)]
pub struct MemoryMediaStore {
    counter: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
}

impl MemoryMediaStore {
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, file: UploadFile) -> Result<MediaAsset, MediaError> {
        let resource_type = file.resource_type()?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(MediaAsset {
            url: format!("https://media.test/{}/{}", n, file.file_name),
            public_id: format!("asset-{}", n),
            resource_type: resource_type.to_string(),
        })
    }

    async fn delete(&self, asset: &MediaAsset) -> Result<(), MediaError> {
        self.deleted.lock().unwrap().push(asset.public_id.clone());
        Ok(())
    }
}

/// Approves exactly one code.
pub struct FixedCodeVerifier;

#[async_trait]
impl OtpVerifier for FixedCodeVerifier {
    async fn send_code(&self, _phone: &str, _channel: OtpChannel) -> Result<String, SmsError> {
        Ok("pending".to_string())
    }

    async fn check_code(&self, _phone: &str, code: &str) -> Result<bool, SmsError> {
        Ok(code == OTP_CODE)
    }
}

/// Billing provider answering every call with canned data.
pub struct CannedBilling;

#[async_trait]
impl BillingProvider for CannedBilling {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<String, BillingError> {
        Ok(format!("https://billing.test/checkout/{}", request.user_id))
    }

    async fn create_portal_session(&self, customer_id: &str, _return_url: &str) -> Result<String, BillingError> {
        Ok(format!("https://billing.test/portal/{}", customer_id))
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> Result<ProviderSubscription, BillingError> {
        Ok(ProviderSubscription {
            id: subscription_id.to_string(),
            customer_id: "cus_test".to_string(),
            price_id: "price_test".to_string(),
            current_period_end: current_time_millis() / 1000 + 30 * 86_400,
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub media: Arc<MemoryMediaStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

pub async fn spawn_app() -> TestApp {
    let db = Database::new_in_memory().await.unwrap();
    let media = Arc::new(MemoryMediaStore::default());
    let state = AppState::with_services(
        Config::for_testing(),
        db,
        media.clone(),
        Arc::new(FixedCodeVerifier),
        Arc::new(CannedBilling),
    );
    let router = create_router(state.clone());
    TestApp { state, router, media }
}

/// Body of a multipart request: text fields then files, each file as
/// (field, file name, content type, bytes).
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "----voting-platform-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.json(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        self.json(Method::POST, uri, token, body).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &str, &[u8])],
    ) -> TestResponse {
        let (content_type, body) = multipart_body(fields, files);
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn register(&self, username: &str, contestant: bool) -> TestResponse {
        let mut body = json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": PASSWORD,
            "firstName": "Test",
            "lastName": username,
            "phone": "+14165550100",
            "dateOfBirth": "1998-04-12",
            "country": "Canada",
            "state": "Ontario",
            "city": "Toronto",
        });
        let path = if contestant {
            body["height"] = json!(172.0);
            body["weight"] = json!(58.5);
            body["eyeColor"] = json!("Brown");
            body["hairColor"] = json!("Black");
            "/api/v1/users/register-contestant"
        } else {
            "/api/v1/users/register-voter"
        };
        self.post(path, None, Some(body)).await
    }

    /// Register and log in; returns (user id, access token).
    pub async fn sign_up(&self, username: &str, contestant: bool) -> (i64, String) {
        let registered = self.register(username, contestant).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);
        let login = self
            .post(
                "/api/v1/users/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        let id = login.data()["user"]["id"].as_i64().unwrap();
        let token = login.data()["accessToken"].as_str().unwrap().to_string();
        (id, token)
    }

    /// Bootstrap the admins and log in as the first one.
    pub async fn admin_token(&self) -> String {
        let created = self.post("/api/v1/admin/create-admins", None, None).await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        let login = self
            .post(
                "/api/v1/admin/login",
                None,
                Some(json!({ "username": "admin1", "password": "admin123$" })),
            )
            .await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        login.data()["accessToken"].as_str().unwrap().to_string()
    }

    /// Create a post with one image; returns the post id.
    pub async fn create_post(&self, token: &str, caption: &str) -> i64 {
        let res = self
            .multipart(
                Method::POST,
                "/api/v1/posts/create",
                token,
                &[("caption", caption)],
                &[("media", "shot.jpg", "image/jpeg", b"jpeg-bytes")],
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.data()["id"].as_i64().unwrap()
    }
}
