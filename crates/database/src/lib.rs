mod db;
mod db_object;
mod env;

pub use db::{connect, is_duplicate_key_error, MongoDbClient};
pub use db_object::MongoDbObject;
pub use env::MongoDbEnv;

pub use mongodb;
pub use mongodb::bson;
