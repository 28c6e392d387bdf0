use anyhow::Result;
use arrow_array::{
    types::Float32Type, Array, FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::StreamExt;
use lancedb::connection::connect;
use lancedb::query::{ExecutableQuery, QueryBase};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One embedded chunk of an ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub source: String,
    pub content: String,
    pub chunk_index: i64,
    pub created_at: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub source: String,
    pub content: String,
    pub chunk_index: i64,
}

/// Chunk index persisted under the working directory. Nothing outside
/// this module reads or writes the index files.
pub struct VectorStore {
    db: lancedb::connection::Connection,
    table_name: String,
    dimensions: usize,
}

impl VectorStore {
    pub async fn new(db_path: &Path, table_name: &str, dimensions: usize) -> Result<Self> {
        let db = connect(
            db_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Invalid path"))?,
        )
        .execute()
        .await?;

        let store = Self {
            db,
            table_name: table_name.to_string(),
            dimensions,
        };

        store.ensure_table().await?;
        Ok(store)
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("chunk_index", DataType::Int64, false),
            Field::new("created_at", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimensions as i32,
                ),
                false,
            ),
        ]))
    }

    async fn ensure_table(&self) -> Result<()> {
        let tables = self.db.table_names().execute().await?;
        if !tables.contains(&self.table_name) {
            let schema = self.schema();
            let batch = RecordBatch::new_empty(schema.clone());
            let batches: Vec<Result<RecordBatch, arrow_schema::ArrowError>> = vec![Ok(batch)];
            let reader = RecordBatchIterator::new(batches.into_iter(), schema);

            self.db
                .create_table(&self.table_name, reader)
                .execute()
                .await?;

            tracing::info!("Created chunk table: {}", self.table_name);
        }

        Ok(())
    }

    pub async fn insert(&self, chunks: Vec<ChunkRecord>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let schema = self.schema();

        let ids: StringArray = StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()));
        let sources: StringArray =
            StringArray::from_iter_values(chunks.iter().map(|c| c.source.as_str()));
        let contents: StringArray =
            StringArray::from_iter_values(chunks.iter().map(|c| c.content.as_str()));
        let chunk_indices: Int64Array = chunks.iter().map(|c| c.chunk_index).collect();
        let created_ats: StringArray =
            StringArray::from_iter_values(chunks.iter().map(|c| c.created_at.as_str()));

        let embeddings = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            chunks
                .iter()
                .map(|c| Some(c.embedding.iter().map(|&v| Some(v)).collect::<Vec<_>>())),
            self.dimensions as i32,
        );

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(sources),
                Arc::new(contents),
                Arc::new(chunk_indices),
                Arc::new(created_ats),
                Arc::new(embeddings),
            ],
        )?;

        let table = self.db.open_table(&self.table_name).execute().await?;
        let batches: Vec<Result<RecordBatch, arrow_schema::ArrowError>> = vec![Ok(batch)];
        let reader = RecordBatchIterator::new(batches.into_iter(), self.schema());
        table.add(reader).execute().await?;

        tracing::info!("Inserted {} chunks", chunks.len());
        Ok(())
    }

    pub async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ChunkHit>> {
        let table = self.db.open_table(&self.table_name).execute().await?;

        let query_vec = query_embedding.to_vec();

        let mut stream = table
            .query()
            .nearest_to(query_vec)?
            .limit(limit)
            .execute()
            .await?;

        let mut results = Vec::new();

        while let Some(batch) = stream.next().await {
            let batch = batch?;

            let sources = batch
                .column_by_name("source")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing/invalid source column"))?;

            let contents = batch
                .column_by_name("content")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing/invalid content column"))?;

            let chunk_indices = batch
                .column_by_name("chunk_index")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing/invalid chunk_index column"))?;

            for i in 0..batch.num_rows() {
                results.push(ChunkHit {
                    source: sources.value(i).to_string(),
                    content: contents.value(i).to_string(),
                    chunk_index: chunk_indices.value(i),
                });
            }
        }

        Ok(results)
    }

    pub async fn list_sources(&self) -> Result<Vec<String>> {
        let table = self.db.open_table(&self.table_name).execute().await?;

        let mut stream = table
            .query()
            .select(lancedb::query::Select::columns(&["source"]))
            .execute()
            .await?;

        let mut sources = std::collections::HashSet::new();

        while let Some(batch) = stream.next().await {
            let batch = batch?;
            if let Some(col) = batch.column_by_name("source") {
                if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
                    for i in 0..arr.len() {
                        sources.insert(arr.value(i).to_string());
                    }
                }
            }
        }

        let mut sources: Vec<String> = sources.into_iter().collect();
        sources.sort();
        Ok(sources)
    }

    pub async fn count(&self) -> Result<usize> {
        let table = self.db.open_table(&self.table_name).execute().await?;
        Ok(table.count_rows(None).await?)
    }
}
