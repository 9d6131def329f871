use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".flowbridge"))
            .unwrap_or_else(|| PathBuf::from(".flowbridge"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn flows_db(&self) -> PathBuf {
        self.base.join("flows.db")
    }

    /// Expand a leading "~/" against the home directory.
    pub fn expand(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
