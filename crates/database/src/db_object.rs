use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument, UpdateModifications};
use mongodb::{Collection, Database, IndexModel};
use serde::{de::DeserializeOwned, Serialize};

/// A document type persisted in its own MongoDB collection, keyed by an
/// `ObjectId` the server assigns on insert.
#[async_trait]
pub trait MongoDbObject:
    Sized + Serialize + DeserializeOwned + Sync + Unpin + Send + Clone
{
    const COLLECTION_NAME: &'static str;

    fn get_id(&self) -> Option<ObjectId>;
    fn set_id(&mut self, id: ObjectId);

    fn collection(db: &Database) -> Collection<Self> {
        db.collection::<Self>(Self::COLLECTION_NAME)
    }

    async fn ensure_index(db: &Database, keys: Document, unique: bool) -> Result<()> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        Self::collection(db).create_index(index, None).await?;
        Ok(())
    }

    async fn insert(mut self, db: &Database) -> Result<Self> {
        let result = Self::collection(db).insert_one(&self, None).await?;
        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow!("[{}] inserted id is not an ObjectId", Self::COLLECTION_NAME))?;
        self.set_id(id);
        Ok(self)
    }

    async fn find_by_id(db: &Database, id: &ObjectId) -> Result<Option<Self>> {
        Self::find_one_by_filter(db, doc! { "_id": id }).await
    }

    async fn find_one_by_filter(db: &Database, filter: Document) -> Result<Option<Self>> {
        Ok(Self::collection(db).find_one(filter, None).await?)
    }

    async fn find_many(
        db: &Database,
        filter: Document,
        sort: Option<Document>,
        skip: Option<u64>,
        limit: Option<i64>,
    ) -> Result<Vec<Self>> {
        let options = FindOptions::builder()
            .sort(sort)
            .skip(skip)
            .limit(limit)
            .build();

        let cursor = Self::collection(db).find(filter, Some(options)).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Applies `update` to the first document matching `filter` in one
    /// server-side operation and returns the document after the update.
    async fn find_one_and_update<U>(
        db: &Database,
        filter: Document,
        update: U,
        upsert: bool,
    ) -> Result<Option<Self>>
    where
        U: Into<UpdateModifications> + Send,
    {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(upsert)
            .return_document(ReturnDocument::After)
            .build();

        Ok(Self::collection(db)
            .find_one_and_update(filter, update, Some(options))
            .await?)
    }

    async fn delete_by_id(db: &Database, id: &ObjectId) -> Result<bool> {
        let result = Self::collection(db)
            .delete_one(doc! { "_id": id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    fn to_document(&self) -> Result<Document> {
        Ok(bson::to_document(self)?)
    }
}
