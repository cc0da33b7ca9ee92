use std::path::PathBuf;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn admin_password(&self) -> String;
    fn port(&self) -> String;
    /// `None` keeps everything in memory.
    fn data_dir(&self) -> Option<PathBuf>;
    /// Byte limit for the in-memory store.
    fn memory_quota(&self) -> Option<usize>;
    fn api_key(&self) -> Option<String>;
    fn model(&self) -> String;
    fn gemini_url(&self) -> String;
}
