use anyhow::{anyhow, Result};

pub trait EnvVars: Sized {
    fn load() -> Result<Self>;
    fn get_env_var(&self, key: &str) -> Option<String>;
}

pub fn required_env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("{} is not set", key))
}

pub fn optional_env_var(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
