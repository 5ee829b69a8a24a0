//! Qdrant-backed knowledge store.
//!
//! The collection is created on first use and seeded with the given documents;
//! an existing collection is searched as-is.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, vectors_config::Config as VectorsConfigEnum, CreateCollectionBuilder, Distance,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder, VectorsConfig,
};
use qdrant_client::Qdrant;

use doc_agent_core::{
    config::KnowledgeConfig,
    traits::{KnowledgeStore, LlmClient},
    Error, KnowledgeDoc, KnowledgeHit, Result,
};

/// Knowledge search over a Qdrant collection.
pub struct QdrantKnowledgeStore {
    client: Qdrant,
    collection_name: String,
    vector_size: u64,
    embedder: Arc<dyn LlmClient>,
}

impl QdrantKnowledgeStore {
    /// Connect and make sure the collection exists, seeding it with `seed` when created.
    pub async fn connect(
        config: &KnowledgeConfig,
        url: &str,
        embedder: Arc<dyn LlmClient>,
        seed: &[KnowledgeDoc],
    ) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| Error::knowledge(format!("Failed to connect to Qdrant: {}", e)))?;

        let store = Self {
            client,
            collection_name: config.collection.clone(),
            vector_size: config.vector_size,
            embedder,
        };

        if store.ensure_collection().await? {
            store.upsert(seed).await?;
        }

        Ok(store)
    }

    /// Returns true when the collection had to be created.
    async fn ensure_collection(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| Error::knowledge(format!("Failed to list collections: {}", e)))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection_name);

        if exists {
            return Ok(false);
        }

        tracing::info!(collection = %self.collection_name, "Creating Qdrant collection");

        let vectors_config = VectorsConfig {
            config: Some(VectorsConfigEnum::Params(
                VectorParamsBuilder::new(self.vector_size, Distance::Cosine).build(),
            )),
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection_name).vectors_config(vectors_config),
            )
            .await
            .map_err(|e| Error::knowledge(format!("Failed to create collection: {}", e)))?;

        Ok(true)
    }

    /// Embed and upsert documents.
    pub async fn upsert(&self, docs: &[KnowledgeDoc]) -> Result<usize> {
        let mut points = Vec::with_capacity(docs.len());
        for doc in docs {
            let vector = self.embedder.embed(&doc.text).await?;
            points.push(PointStruct::new(
                uuid::Uuid::new_v4().to_string(),
                vector,
                to_payload(doc),
            ));
        }

        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection_name, points).wait(true))
            .await
            .map_err(|e| Error::knowledge(format!("Failed to upsert points: {}", e)))?;

        tracing::info!(collection = %self.collection_name, count, "Seeded knowledge collection");
        Ok(count)
    }
}

fn string_value(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn to_payload(doc: &KnowledgeDoc) -> HashMap<String, QdrantValue> {
    let mut payload = HashMap::new();
    payload.insert("id".to_string(), string_value(&doc.id));
    payload.insert("text".to_string(), string_value(&doc.text));
    if let Some(category) = &doc.category {
        payload.insert("category".to_string(), string_value(category));
    }
    payload
}

fn payload_str(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key)?.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl KnowledgeStore for QdrantKnowledgeStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>> {
        let query_vector = self.embedder.embed(query).await?;

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection_name, query_vector, top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| Error::knowledge(format!("Failed to search: {}", e)))?;

        let hits = response
            .result
            .into_iter()
            .filter_map(|point| {
                Some(KnowledgeHit {
                    text: payload_str(&point.payload, "text")?,
                    score: point.score,
                    category: payload_str(&point.payload, "category"),
                })
            })
            .collect();

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip_fields() {
        let doc = KnowledgeDoc::new("k1", "I write HTML").with_category("capabilities");
        let payload = to_payload(&doc);

        assert_eq!(payload_str(&payload, "text").as_deref(), Some("I write HTML"));
        assert_eq!(payload_str(&payload, "category").as_deref(), Some("capabilities"));
        assert_eq!(payload_str(&payload, "missing"), None);
    }
}
