//! Environment configuration for the checkout surface.

use store::Address;

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `BASE_URL` — public site origin used in email links
///   (default: `"http://localhost:3000"`)
/// - `SHIP_FROM_NAME` / `SHIP_FROM_LINE1` / `SHIP_FROM_CITY` /
///   `SHIP_FROM_REGION` / `SHIP_FROM_POSTAL` / `SHIP_FROM_COUNTRY` —
///   the warehouse origin used for shipping quotes.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub ship_from: Address,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("BASE_URL", "http://localhost:3000"),
            ship_from: Address::new(
                env_or("SHIP_FROM_NAME", "Warehouse"),
                env_or("SHIP_FROM_LINE1", "400 Broad St"),
                env_or("SHIP_FROM_CITY", "Seattle"),
                env_or("SHIP_FROM_REGION", "WA"),
                env_or("SHIP_FROM_POSTAL", "98109"),
                env_or("SHIP_FROM_COUNTRY", "US"),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            ship_from: Address::new("Warehouse", "400 Broad St", "Seattle", "WA", "98109", "US"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.ship_from.city, "Seattle");
        assert_eq!(config.ship_from.postal_code, "98109");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var("BASE_URL", "https://shop.example.com");
            std::env::set_var("SHIP_FROM_CITY", "Tacoma");
        }
        let config = Config::from_env();
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.ship_from.city, "Tacoma");
        unsafe {
            std::env::remove_var("BASE_URL");
            std::env::remove_var("SHIP_FROM_CITY");
        }
    }
}
