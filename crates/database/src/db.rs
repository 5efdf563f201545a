use std::time::Duration;

use anyhow::Result;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

use bazaar_common::{define_module_client, EnvVars};

use crate::env::MongoDbEnv;

const DUPLICATE_KEY_CODE: i32 = 11000;

pub async fn connect(env: &MongoDbEnv) -> Result<Database> {
    let mut options = ClientOptions::parse(&env.mongodb_uri).await?;
    options.app_name = Some("bazaar".to_string());
    options.connect_timeout = Some(Duration::from_secs(10));
    options.server_selection_timeout = Some(Duration::from_secs(10));

    let client = Client::with_options(options)?;
    Ok(client.database(&env.mongodb_database))
}

define_module_client! {
    (struct MongoDbClient, "mongodb")
    client_type: Database,
    env: ["MONGODB_URI"],
    setup: async {
        let env = MongoDbEnv::load()?;
        connect(&env).await
    }
}

/// True when the error is a unique index violation, either from a plain
/// write or from a findAndModify upsert.
pub fn is_duplicate_key_error(err: &anyhow::Error) -> bool {
    let Some(err) = err.downcast_ref::<mongodb::error::Error>() else {
        return false;
    };

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
