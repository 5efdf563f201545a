use anyhow::{anyhow, Result};

use bazaar_common::{optional_env_var, required_env_var, EnvVars};

pub struct ApiServerEnv {
    pub secret_salt: String,
    pub port: u16,
    pub app_env: String,
    pub request_timeout_secs: u64,
}

impl ApiServerEnv {
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

impl EnvVars for ApiServerEnv {
    fn load() -> Result<Self> {
        let port = optional_env_var("PORT", "3033")
            .parse()
            .map_err(|e| anyhow!("PORT is not a valid port number: {}", e))?;
        let request_timeout_secs = optional_env_var("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .map_err(|e| anyhow!("REQUEST_TIMEOUT_SECS is not a number: {}", e))?;

        Ok(Self {
            secret_salt: required_env_var("SECRET_SALT")?,
            port,
            app_env: optional_env_var("APP_ENV", "production"),
            request_timeout_secs,
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "SECRET_SALT" => Some(self.secret_salt.clone()),
            "PORT" => Some(self.port.to_string()),
            "APP_ENV" => Some(self.app_env.clone()),
            "REQUEST_TIMEOUT_SECS" => Some(self.request_timeout_secs.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(app_env: &str) -> ApiServerEnv {
        ApiServerEnv {
            secret_salt: "salt".into(),
            port: 3033,
            app_env: app_env.into(),
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn only_development_exposes_detail() {
        assert!(env_with("development").is_development());
        assert!(!env_with("production").is_development());
        assert_eq!(env_with("staging").get_env_var("APP_ENV").as_deref(), Some("staging"));
    }
}
