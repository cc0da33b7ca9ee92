use crate::{
    configuration::Configuration,
    greeting::{GreetingError, TextGenerator},
};
use async_trait::async_trait;
use axum::Router;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEST_PASSWORD: &str = "123";

pub struct MockTextGeneratorInner {
    pub success: AtomicBool,
    pub calls_to_generate_text: AtomicU64,
    pub response: Mutex<String>,
    pub prompts: Mutex<Vec<String>>,
    pub api_keys: Mutex<Vec<String>>,
}

#[derive(Clone)]
pub struct MockTextGenerator(pub Arc<MockTextGeneratorInner>);

impl MockTextGeneratorInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            calls_to_generate_text: AtomicU64::default(),
            response: Mutex::new("Hello from the mock!".into()),
            prompts: Mutex::default(),
            api_keys: Mutex::default(),
        }
    }
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self(Arc::new(MockTextGeneratorInner::new()))
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate_text(&self, api_key: &str, prompt: &str) -> Result<String, GreetingError> {
        self.0.calls_to_generate_text.fetch_add(1, Ordering::SeqCst);
        self.0.api_keys.lock().unwrap().push(api_key.into());
        self.0.prompts.lock().unwrap().push(prompt.into());
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(self.0.response.lock().unwrap().clone()),
            false => Err(GreetingError::Status {
                status: 500,
                message: "Supposed to fail".into(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct TestConfiguration;

impl Configuration for TestConfiguration {
    fn admin_password(&self) -> String {
        TEST_PASSWORD.into()
    }

    fn port(&self) -> String {
        "0".into()
    }

    fn data_dir(&self) -> Option<PathBuf> {
        None
    }

    fn memory_quota(&self) -> Option<usize> {
        None
    }

    fn api_key(&self) -> Option<String> {
        None
    }

    fn model(&self) -> String {
        "test-model".into()
    }

    fn gemini_url(&self) -> String {
        "http://localhost".into()
    }
}

/// Serves `app` on an ephemeral port and returns its base URL.
pub async fn spawn_app(app: Router) -> (JoinHandle<()>, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (server, address)
}
