use claim_land::SettingsProvider;

/// Settings read from `CLAIM_*` environment variables.
pub struct EnvSettings {
    prefix: &'static str,
}

impl EnvSettings {
    pub const fn new() -> Self {
        Self { prefix: "CLAIM_" }
    }
}

impl SettingsProvider for EnvSettings {
    fn setting(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{key}", self.prefix)).ok()
    }
}
