use crate::query::{to_query, FilterTree};
use crate::services::store::{DocumentStore, UpdateSpec};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for catalog-service");

        self.create_index("users", doc! { "name": 1 }, "user_name_unique", true)
            .await?;
        self.create_index("sources", doc! { "name": 1 }, "source_name_unique", true)
            .await?;
        self.create_index("streams", doc! { "name": 1 }, "stream_name_unique", true)
            .await?;
        self.create_index("streams", doc! { "sourceId": 1 }, "stream_source_lookup", false)
            .await?;
        self.create_index(
            "streams",
            doc! { "enabled": 1, "deleted": 1, "state": 1, "scannedAt": 1 },
            "stream_staleness_lookup",
            false,
        )
        .await?;
        self.create_index(
            "content_items",
            doc! { "streamId": 1 },
            "content_item_stream_lookup",
            false,
        )
        .await?;

        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        name: &str,
        unique: bool,
    ) -> Result<(), AppError> {
        let index = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(name.to_string())
                    .unique(unique)
                    .build(),
            )
            .build();

        self.collection(collection)
            .create_index(index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create {} index on {} collection: {}",
                    name,
                    collection,
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index {} on {}", name, collection);
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoDb {
    async fn find_many(
        &self,
        collection: &str,
        filter: Option<&FilterTree>,
    ) -> Result<Vec<Document>, AppError> {
        let cursor = self
            .collection(collection)
            .find(to_query(filter), None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &FilterTree,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .collection(collection)
            .find_one(filter.to_document(), None)
            .await?)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &FilterTree,
        update: &UpdateSpec,
    ) -> Result<Option<Document>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection(collection)
            .find_one_and_update(filter.to_document(), update.to_document(), options)
            .await?)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), AppError> {
        self.collection(collection)
            .insert_one(document, None)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }
}
