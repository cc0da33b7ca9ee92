use crate::{key_selection::KeySelection, types::CompanyInfo};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_CANDIDATE: &str = "Candidate";
const KEY_NOT_FOUND: &str = "Requested entity was not found";

#[derive(Debug, thiserror::Error)]
pub enum GreetingError {
    #[error("No API key is configured")]
    MissingApiKey,

    #[error("The API key is not accepted anymore, select a key again")]
    KeySelectionRequired,

    #[error("Text generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Text generation failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Text generation returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Clone + Send + Sync + 'static {
    async fn generate_text(&self, api_key: &str, prompt: &str) -> Result<String, GreetingError>;
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    thinking_budget: u32,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.8,
            thinking_budget: 0,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, api_key: &str, prompt: &str) -> Result<String, GreetingError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "thinkingConfig": { "thinkingBudget": self.thinking_budget },
            },
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND || message.contains(KEY_NOT_FOUND) {
                return Err(GreetingError::KeySelectionRequired);
            }
            return Err(GreetingError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await?
            .text()
            .ok_or(GreetingError::EmptyResponse)
    }
}

/// Template used whenever no generated text is available.
pub fn fallback_greeting(company: &CompanyInfo) -> String {
    format!(
        "Hello! This is {}. Thank you for applying for the {} position. Please choose an interview time below.",
        company.name, company.job_title
    )
}

fn candidate_prompt(company: &CompanyInfo, candidate_name: &str) -> String {
    format!(
        "You are the recruiter at {}. Write a warm and professional welcome message of at most three sentences for {}, who applied for the {} position, to guide them through booking an interview.",
        company.name, candidate_name, company.job_title
    )
}

fn posting_prompt(company: &CompanyInfo) -> String {
    format!(
        "You are the recruiter at {}. Write a warm and professional welcome message of two to three sentences for everyone applying for the {} position. Encourage them to pick a specific interview time.",
        company.name, company.job_title
    )
}

#[derive(Clone)]
pub struct Greeter<G> {
    generator: G,
    api_key: Option<String>,
    key_selection: Option<Arc<dyn KeySelection>>,
}

impl<G: TextGenerator> Greeter<G> {
    pub fn new(generator: G, api_key: Option<String>) -> Self {
        Self {
            generator,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            key_selection: None,
        }
    }

    pub fn with_key_selection(mut self, key_selection: Arc<dyn KeySelection>) -> Self {
        self.key_selection = Some(key_selection);
        self
    }

    pub fn key_selection(&self) -> Option<&Arc<dyn KeySelection>> {
        self.key_selection.as_ref()
    }

    /// The configured key wins over a key selected at runtime.
    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.key_selection
                .as_ref()
                .and_then(|selection| selection.selected_key())
        })
    }

    /// Welcome text for the posting as a whole. Unlike [`Greeter::greeting`]
    /// this reports why no text could be generated.
    pub async fn generate(&self, company: &CompanyInfo) -> Result<String, GreetingError> {
        let api_key = self.api_key().ok_or(GreetingError::MissingApiKey)?;
        self.generator
            .generate_text(&api_key, &posting_prompt(company))
            .await
    }

    /// Always returns displayable text, generated when possible.
    pub async fn greeting(&self, company: &CompanyInfo, candidate_name: Option<&str>) -> String {
        let Some(api_key) = self.api_key() else {
            info!("No API key configured, using template greeting");
            return fallback_greeting(company);
        };

        let candidate_name = candidate_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CANDIDATE);
        let prompt = candidate_prompt(company, candidate_name);

        match self.generator.generate_text(&api_key, &prompt).await {
            Ok(text) => text,
            Err(GreetingError::KeySelectionRequired) => {
                warn!("API key was rejected, a new key has to be selected");
                fallback_greeting(company)
            }
            Err(err) => {
                error!(?err, "Failed to generate greeting");
                fallback_greeting(company)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        key_selection::MockKeySelection,
        testutils::{spawn_app, MockTextGenerator},
    };
    use axum::{
        extract::{Path, State},
        http::HeaderMap,
        routing::post,
        Json, Router,
    };
    use serde_json::Value;
    use std::sync::{atomic::Ordering, Mutex};

    fn company() -> CompanyInfo {
        CompanyInfo {
            name: "Acme".into(),
            job_title: "Backend Engineer".into(),
            description: String::new(),
            guidelines: vec![],
        }
    }

    #[tokio::test]
    async fn test_no_key_uses_template() {
        let generator = MockTextGenerator::new();
        let greeter = Greeter::new(generator.clone(), None);

        let greeting = greeter.greeting(&company(), Some("Jane")).await;
        assert_eq!(greeting, fallback_greeting(&company()));
        assert!(greeting.contains("Acme"));
        assert!(greeting.contains("Backend Engineer"));
        assert_eq!(generator.0.calls_to_generate_text.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_key_counts_as_missing() {
        let generator = MockTextGenerator::new();
        let greeter = Greeter::new(generator.clone(), Some("  ".into()));
        assert!(greeter.api_key().is_none());
        assert!(matches!(
            greeter.generate(&company()).await,
            Err(GreetingError::MissingApiKey)
        ));
        assert_eq!(generator.0.calls_to_generate_text.load(Ordering::SeqCst), 0);
    }

    #[test_case::test_case(Some("Jane"), "Jane" ; "named candidate")]
    #[test_case::test_case(None, "Candidate" ; "anonymous candidate")]
    #[test_case::test_case(Some(" "), "Candidate" ; "blank candidate")]
    #[tokio::test]
    async fn test_generated_greeting(candidate_name: Option<&str>, expected_name: &str) {
        let generator = MockTextGenerator::new();
        *generator.0.response.lock().unwrap() = "Welcome aboard!".into();
        let greeter = Greeter::new(generator.clone(), Some("secret".into()));

        let greeting = greeter.greeting(&company(), candidate_name).await;
        assert_eq!(greeting, "Welcome aboard!");

        assert_eq!(generator.0.calls_to_generate_text.load(Ordering::SeqCst), 1);
        assert_eq!(generator.0.api_keys.lock().unwrap()[0], "secret");
        let prompt = generator.0.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains(expected_name));
    }

    #[tokio::test]
    async fn test_failed_generation_falls_back() {
        let generator = MockTextGenerator::new();
        generator.0.success.store(false, Ordering::SeqCst);
        let greeter = Greeter::new(generator.clone(), Some("secret".into()));

        let greeting = greeter.greeting(&company(), None).await;
        assert!(!greeting.is_empty());
        assert_eq!(greeting, fallback_greeting(&company()));
        assert_eq!(generator.0.calls_to_generate_text.load(Ordering::SeqCst), 1);

        assert!(greeter.generate(&company()).await.is_err());
    }

    #[tokio::test]
    async fn test_selected_key_is_used() {
        let mut selection = MockKeySelection::new();
        selection
            .expect_selected_key()
            .returning(|| Some("selected".into()));

        let generator = MockTextGenerator::new();
        let greeter = Greeter::new(generator.clone(), None).with_key_selection(Arc::new(selection));

        greeter.generate(&company()).await.unwrap();
        assert_eq!(generator.0.api_keys.lock().unwrap()[0], "selected");
    }

    #[tokio::test]
    async fn test_configured_key_wins() {
        let mut selection = MockKeySelection::new();
        selection.expect_selected_key().never();

        let greeter = Greeter::new(MockTextGenerator::new(), Some("configured".into()))
            .with_key_selection(Arc::new(selection));
        assert_eq!(greeter.api_key().as_deref(), Some("configured"));
    }

    #[derive(Clone, Default)]
    struct FakeGemini {
        status: u16,
        body: Value,
        requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    async fn fake_generate_content(
        State(fake): State<FakeGemini>,
        Path(call): Path<String>,
        headers: HeaderMap,
        Json(request): Json<Value>,
    ) -> (axum::http::StatusCode, Json<Value>) {
        let api_key = headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        fake.requests.lock().unwrap().push((call, api_key, request));
        (
            axum::http::StatusCode::from_u16(fake.status).unwrap(),
            Json(fake.body.clone()),
        )
    }

    async fn gemini_against(fake: FakeGemini) -> (tokio::task::JoinHandle<()>, GeminiClient) {
        let app = Router::new()
            .route("/v1beta/models/:call", post(fake_generate_content))
            .with_state(fake);
        let (server, address) = spawn_app(app).await;
        (server, GeminiClient::new(format!("{address}/"), "test-model"))
    }

    #[tokio::test]
    async fn test_gemini_request_and_response() {
        let fake = FakeGemini {
            status: 200,
            body: json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "  Hello " }, { "text": "there!\n" }] }
                }]
            }),
            ..FakeGemini::default()
        };
        let (server, client) = gemini_against(fake.clone()).await;

        let text = client.generate_text("secret", "Say hi").await.unwrap();
        assert_eq!(text, "Hello there!");

        let requests = fake.requests.lock().unwrap();
        let (call, api_key, request) = &requests[0];
        assert_eq!(call, "test-model:generateContent");
        assert_eq!(api_key.as_deref(), Some("secret"));
        assert_eq!(request["contents"][0]["parts"][0]["text"], "Say hi");
        assert_eq!(
            request["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            0
        );
        server.abort();
    }

    #[test_case::test_case(404, json!({ "error": { "message": "Requested entity was not found." } }) ; "not found")]
    #[test_case::test_case(400, json!({ "error": { "message": "Requested entity was not found." } }) ; "not found message")]
    #[tokio::test]
    async fn test_gemini_stale_key(status: u16, body: Value) {
        let fake = FakeGemini {
            status,
            body,
            ..FakeGemini::default()
        };
        let (server, client) = gemini_against(fake).await;

        let err = client.generate_text("stale", "Say hi").await.unwrap_err();
        assert!(matches!(err, GreetingError::KeySelectionRequired));
        server.abort();
    }

    #[tokio::test]
    async fn test_gemini_error_status() {
        let fake = FakeGemini {
            status: 429,
            body: json!({ "error": { "message": "Quota exceeded" } }),
            ..FakeGemini::default()
        };
        let (server, client) = gemini_against(fake).await;

        let err = client.generate_text("secret", "Say hi").await.unwrap_err();
        assert!(matches!(err, GreetingError::Status { status: 429, .. }));
        server.abort();
    }

    #[test_case::test_case(json!({ "candidates": [] }) ; "no candidates")]
    #[test_case::test_case(json!({ "candidates": [{ "content": { "parts": [{ "text": "   " }] } }] }) ; "blank text")]
    #[test_case::test_case(json!({ "promptFeedback": { "blockReason": "SAFETY" } }) ; "blocked")]
    #[tokio::test]
    async fn test_gemini_empty_response(body: Value) {
        let fake = FakeGemini {
            status: 200,
            body,
            ..FakeGemini::default()
        };
        let (server, client) = gemini_against(fake).await;

        let err = client.generate_text("secret", "Say hi").await.unwrap_err();
        assert!(matches!(err, GreetingError::EmptyResponse));
        server.abort();
    }

    #[tokio::test]
    async fn test_unreachable_provider_falls_back() {
        // Bind and drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let greeter = Greeter::new(
            GeminiClient::new(format!("http://{address}"), DEFAULT_MODEL),
            Some("secret".into()),
        );
        let greeting = greeter.greeting(&company(), Some("Jane")).await;
        assert_eq!(greeting, fallback_greeting(&company()));
    }
}
