use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Longest accepted token window: one year.
pub const MAX_TOKEN_WINDOW: i64 = 365 * 24 * 3600;

/// Token signing and session cookie settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_expiry")]
    pub access_token_expiry: i64, // seconds (300 = 5 minutes)
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry: i64, // seconds (259200 = 72 hours)
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

impl AuthSettings {
    /// Settings with defaults for everything except the secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: default_issuer(),
            access_token_expiry: default_access_expiry(),
            refresh_token_expiry: default_refresh_expiry(),
            hash_cost: default_hash_cost(),
            login_path: default_login_path(),
            secure_cookies: default_secure_cookies(),
        }
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.issuer".to_string()));
        }
        if !(1..=MAX_TOKEN_WINDOW).contains(&self.access_token_expiry) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.access_token_expiry must be between 1 and {} seconds",
                MAX_TOKEN_WINDOW
            )));
        }
        if !(1..=MAX_TOKEN_WINDOW).contains(&self.refresh_token_expiry) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.refresh_token_expiry must be between 1 and {} seconds",
                MAX_TOKEN_WINDOW
            )));
        }
        if !(4..=31).contains(&self.hash_cost) {
            return Err(ConfigError::InvalidValue(
                "auth.hash_cost must be between 4 and 31".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("hash_cost", &self.hash_cost)
            .field("login_path", &self.login_path)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_issuer() -> String {
    "journal-lite".to_string()
}

fn default_access_expiry() -> i64 {
    5 * 60
}

fn default_refresh_expiry() -> i64 {
    72 * 60 * 60
}

fn default_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_login_path() -> String {
    "/".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

/// Load settings from `configuration.{yaml,toml,json}` and `APP_*` variables.
///
/// Environment variables override the file, e.g. `APP_AUTH__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}
