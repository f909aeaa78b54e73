//! Recording metadata queries

use crate::error::PipelineError;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// A stored recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recording {
    pub id: i64,
    pub filename: String,
    /// `"{bucket}/{object}"`
    pub original_path: String,
    pub duration: Option<f64>,
    pub sample_rate: i64,
    /// RFC3339
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Fields supplied when a recording is created
#[derive(Debug, Clone)]
pub struct NewRecording<'a> {
    pub filename: &'a str,
    pub original_path: &'a str,
    pub duration: f64,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub page: u32,
    pub limit: u32,
    pub item_count: u64,
    pub page_count: u64,
}

impl PaginationMetadata {
    pub fn new(page: u32, limit: u32, item_count: u64) -> Self {
        Self {
            page,
            limit,
            item_count,
            page_count: item_count.div_ceil(u64::from(limit.max(1))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingPage {
    pub items: Vec<Recording>,
    pub metadata: PaginationMetadata,
}

fn row_to_recording(row: &sqlx::sqlite::SqliteRow) -> Recording {
    Recording {
        id: row.get("id"),
        filename: row.get("filename"),
        original_path: row.get("original_path"),
        duration: row.get("duration"),
        sample_rate: row.get("sample_rate"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Insert a recording and return it with its assigned id
pub async fn create_recording(db: &SqlitePool, new: NewRecording<'_>) -> Result<Recording, PipelineError> {
    let created_at = Utc::now().to_rfc3339();

    let row = sqlx::query(
        r#"
        INSERT INTO recordings (filename, original_path, duration, sample_rate, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, filename, original_path, duration, sample_rate, created_at, updated_at
        "#,
    )
    .bind(new.filename)
    .bind(new.original_path)
    .bind(new.duration)
    .bind(i64::from(new.sample_rate))
    .bind(&created_at)
    .fetch_one(db)
    .await?;

    Ok(row_to_recording(&row))
}

pub async fn get_recording(db: &SqlitePool, id: i64) -> Result<Option<Recording>, PipelineError> {
    let row = sqlx::query(
        r#"
        SELECT id, filename, original_path, duration, sample_rate, created_at, updated_at
        FROM recordings
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(row.as_ref().map(row_to_recording))
}

pub async fn count_recordings(db: &SqlitePool) -> Result<u64, PipelineError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recordings")
        .fetch_one(db)
        .await?;
    Ok(count.max(0) as u64)
}

/// One page of recordings in insertion order. `page` is 1-based.
pub async fn list_recordings(db: &SqlitePool, page: u32, limit: u32) -> Result<RecordingPage, PipelineError> {
    let page = page.max(1);
    let limit = limit.max(1);
    let offset = i64::from(page - 1) * i64::from(limit);

    let rows = sqlx::query(
        r#"
        SELECT id, filename, original_path, duration, sample_rate, created_at, updated_at
        FROM recordings
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(i64::from(limit))
    .bind(offset)
    .fetch_all(db)
    .await?;

    let item_count = count_recordings(db).await?;

    Ok(RecordingPage {
        items: rows.iter().map(row_to_recording).collect(),
        metadata: PaginationMetadata::new(page, limit, item_count),
    })
}
