use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Credential for the WhatsApp gateway; absence disables the channel.
    pub whatsapp_api_token: Option<String>,
    /// Credential for the transactional email provider; absence disables it.
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub upload_dir: String,
    pub public_upload_base: String,
    pub dispatch_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let whatsapp_api_token = env::var("WHATSAPP_API_TOKEN").ok().filter(|t| !t.is_empty());
        let email_api_key = env::var("EMAIL_API_KEY").ok().filter(|k| !k.is_empty());
        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "no-reply@artisan-shop.example".to_string());
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let public_upload_base =
            env::var("PUBLIC_UPLOAD_BASE").unwrap_or_else(|_| "/uploads".to_string());
        let dispatch_timeout = env::var("DISPATCH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        Ok(Self {
            database_url,
            host,
            port,
            whatsapp_api_token,
            email_api_key,
            email_from,
            upload_dir,
            public_upload_base,
            dispatch_timeout,
        })
    }
}
