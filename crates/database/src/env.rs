use anyhow::Result;

use bazaar_common::{optional_env_var, required_env_var, EnvVars};

pub struct MongoDbEnv {
    pub mongodb_uri: String,
    pub mongodb_database: String,
}

impl EnvVars for MongoDbEnv {
    fn load() -> Result<Self> {
        Ok(Self {
            mongodb_uri: required_env_var("MONGODB_URI")?,
            mongodb_database: optional_env_var("MONGODB_DATABASE", "bazaar"),
        })
    }

    fn get_env_var(&self, key: &str) -> Option<String> {
        match key {
            "MONGODB_URI" => Some(self.mongodb_uri.clone()),
            "MONGODB_DATABASE" => Some(self.mongodb_database.clone()),
            _ => None,
        }
    }
}
