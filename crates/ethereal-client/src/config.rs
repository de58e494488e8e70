use std::time::Duration;

use ethereal_crypto::PBKDF2_ITERATIONS;

/// Client settings. Every field has a default except the endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL. A trailing `/` is added when missing.
    pub endpoint: String,
    /// Keep the session secret in memory after the first fetch (default: false).
    /// Saves a round trip per local operation, but a secret rotated on the
    /// server goes unnoticed for the lifetime of the client.
    pub cache_key: bool,
    /// PBKDF2 rounds; must match whoever sealed the envelopes (default: 100000)
    pub kdf_iterations: u32,
    /// Per-request timeout (default: 30s)
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cache_key: false,
            kdf_iterations: PBKDF2_ITERATIONS,
            timeout: Duration::from_secs(30),
        }
    }

    /// Endpoint with exactly one trailing slash appended if none is present.
    pub fn normalized_endpoint(&self) -> String {
        if self.endpoint.ends_with('/') {
            self.endpoint.clone()
        } else {
            format!("{}/", self.endpoint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:8080");
        assert!(!config.cache_key);
        assert_eq!(config.kdf_iterations, 100_000);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_normalization() {
        assert_eq!(
            ClientConfig::new("http://localhost:8080").normalized_endpoint(),
            "http://localhost:8080/"
        );
        assert_eq!(
            ClientConfig::new("http://localhost:8080/api/").normalized_endpoint(),
            "http://localhost:8080/api/"
        );
    }
}
