use crate::{
    configuration::Configuration,
    greeting::{DEFAULT_GEMINI_URL, DEFAULT_MODEL},
};
use clap::{builder::NonEmptyStringValueParser, Parser};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Interview slot booking service")]
pub struct ConfigurationHandler {
    /// Port the HTTP API listens on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: String,

    /// Password expected in the `x-admin-password` header
    #[arg(long, env = "ADMIN_PASSWORD", value_parser = NonEmptyStringValueParser::new())]
    admin_password: String,

    /// Directory for persisted slots and config. Omit to keep them in memory
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Byte limit for the in-memory store, like a browser storage quota
    #[arg(long, env = "MEMORY_QUOTA", conflicts_with = "data_dir")]
    memory_quota: Option<usize>,

    /// Key for the text generation API. Without it greetings use a template
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "GEMINI_URL", default_value = DEFAULT_GEMINI_URL)]
    gemini_url: String,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        // A missing .env file is fine.
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn admin_password(&self) -> String {
        self.admin_password.clone()
    }

    fn port(&self) -> String {
        self.port.clone()
    }

    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone()
    }

    fn memory_quota(&self) -> Option<usize> {
        self.memory_quota
    }

    fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn gemini_url(&self) -> String {
        self.gemini_url.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_explicit_arguments() {
        let configuration = ConfigurationHandler::try_parse_from([
            "interview_booking",
            "--port",
            "8080",
            "--admin-password",
            "hunter2",
            "--data-dir",
            "/var/lib/interview_booking",
            "--api-key",
            "secret",
            "--model",
            "other-model",
            "--gemini-url",
            "http://localhost:9000",
        ])
        .unwrap();

        assert_eq!(configuration.port(), "8080");
        assert_eq!(configuration.admin_password(), "hunter2");
        assert_eq!(
            configuration.data_dir(),
            Some(PathBuf::from("/var/lib/interview_booking"))
        );
        assert_eq!(configuration.api_key().as_deref(), Some("secret"));
        assert_eq!(configuration.model(), "other-model");
        assert_eq!(configuration.gemini_url(), "http://localhost:9000");
    }

    #[test]
    fn test_empty_admin_password_is_rejected() {
        ConfigurationHandler::try_parse_from(["interview_booking", "--admin-password", ""])
            .unwrap_err();
    }

    #[test]
    fn test_memory_quota_conflicts_with_data_dir() {
        let configuration = ConfigurationHandler::try_parse_from([
            "interview_booking",
            "--admin-password",
            "hunter2",
            "--memory-quota",
            "5242880",
        ])
        .unwrap();
        assert_eq!(configuration.memory_quota(), Some(5_242_880));

        ConfigurationHandler::try_parse_from([
            "interview_booking",
            "--admin-password",
            "hunter2",
            "--memory-quota",
            "1024",
            "--data-dir",
            "/tmp/booking",
        ])
        .unwrap_err();
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        ConfigurationHandler::command().debug_assert();
    }
}
