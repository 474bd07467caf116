/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the WeatherXM-compatible station API.
    pub wxm_api_url: String,
    /// API key sent in the X-API-KEY header.
    pub wxm_api_key: String,
    pub port: u16,
    /// Directory containing policy JSON files for seeding at startup.
    pub data_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            wxm_api_url: std::env::var("WXM_API_URL")
                .unwrap_or_else(|_| "https://pro.weatherxm.com/api/v1".to_string()),
            wxm_api_key: std::env::var("WXM_API_KEY").expect("WXM_API_KEY must be set"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
        }
    }
}
