use crate::app::ports::{HttpClientPort, ObjectStorePort, Warehouse};
use crate::constants::{DROPPED_COLUMNS, ROW_ID_HEADER, TABLE_COLUMNS};
use crate::error::{EtlError, Result};
use crate::pipeline::{Slots, StageOutcome};
use crate::types::{Sample, Table};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

/// Fetcher: retrieves the source snapshot and writes the response body
/// verbatim to the raw artifact path, overwriting any prior content.
/// A non-success status or I/O failure leaves the prior artifact untouched.
pub async fn extract(http: &dyn HttpClientPort, url: &str, raw_path: &Path) -> StageOutcome {
    info!(url, "Fetching source snapshot");
    let result = match http.get(url).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Fetch failed: {}", e);
            return StageOutcome::Failed { error: e.to_string() };
        }
    };
    if !(200..300).contains(&result.status) {
        warn!(status = result.status, "Source returned non-success status");
        return StageOutcome::Failed {
            error: format!("Unexpected status {} from source", result.status),
        };
    }
    match write_artifact(raw_path, &result.bytes) {
        Ok(()) => {
            info!(bytes = result.bytes.len(), path = %raw_path.display(), "Wrote raw artifact");
            StageOutcome::Completed {
                bytes: result.bytes.len(),
                checksum: sha256_hex(&result.bytes),
            }
        }
        Err(e) => {
            warn!("Failed to write raw artifact: {}", e);
            StageOutcome::Failed { error: e.to_string() }
        }
    }
}

async fn upload(
    store: &dyn ObjectStorePort,
    path: &Path,
    bucket: &str,
    key: &str,
) -> StageOutcome {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), "Failed to read artifact: {}", e);
            return StageOutcome::Failed { error: e.to_string() };
        }
    };
    match store.put(bucket, key, &bytes).await {
        Ok(()) => {
            info!(bytes = bytes.len(), key, "Uploaded artifact");
            StageOutcome::Completed {
                bytes: bytes.len(),
                checksum: sha256_hex(&bytes),
            }
        }
        Err(e) => {
            warn!(key, "Upload failed: {}", e);
            StageOutcome::Failed { error: e.to_string() }
        }
    }
}

/// Stager: copies the raw artifact unmodified into the staging slot.
/// Overwrites whatever the slot held; re-running produces the same object.
pub async fn stage(store: &dyn ObjectStorePort, raw_path: &Path, slots: &Slots) -> StageOutcome {
    upload(store, raw_path, &slots.bucket, &slots.staging_key).await
}

/// Publisher: copies the cleaned artifact into the transformed slot.
pub async fn publish(
    store: &dyn ObjectStorePort,
    transformed_path: &Path,
    slots: &Slots,
) -> StageOutcome {
    upload(store, transformed_path, &slots.bucket, &slots.transformed_key).await
}

/// Diagnostics of the transform's data-quality scan. Counts only; the scan
/// never drops or alters rows.
#[derive(Debug, Clone, Serialize)]
pub struct TransformSummary {
    pub rows: usize,
    pub columns: usize,
    /// Null (empty-field) count per surviving column, in artifact order.
    pub null_counts: Vec<(String, usize)>,
    /// Rows whose surviving fields fully match an earlier row. The row
    /// identifier is excluded from the comparison, otherwise no row could
    /// ever count as a duplicate.
    pub duplicate_rows: usize,
}

/// Transformer: reads the staged object, drops the fixed sensitive columns,
/// assigns the dense row identifier 1..N in source order, runs the
/// data-quality scan, and writes the cleaned artifact locally. Malformed
/// input is fatal here, unlike the transient-I/O stages.
pub async fn transform(
    store: &dyn ObjectStorePort,
    slots: &Slots,
    transformed_path: &Path,
) -> Result<TransformSummary> {
    let bytes = store.get(&slots.bucket, &slots.staging_key).await?;
    let table = Table::from_csv_bytes(&bytes)?;

    // Column projection: every drop-list column must be present
    let mut drop_indices = HashSet::new();
    for name in DROPPED_COLUMNS {
        let index = table
            .column_index(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()))?;
        drop_indices.insert(index);
    }
    let keep: Vec<usize> = (0..table.header.len())
        .filter(|i| !drop_indices.contains(i))
        .collect();

    // Row identifier assignment: leading column, 1..N in source order
    let mut header = vec![ROW_ID_HEADER.to_string()];
    header.extend(keep.iter().map(|&i| table.header[i].clone()));
    let mut rows = Vec::with_capacity(table.row_count());
    for (n, row) in table.rows.iter().enumerate() {
        let mut cleaned = Vec::with_capacity(keep.len() + 1);
        cleaned.push((n + 1).to_string());
        cleaned.extend(keep.iter().map(|&i| row[i].clone()));
        rows.push(cleaned);
    }
    let cleaned = Table { header, rows };

    // Data-quality scan: diagnostics only, nothing is dropped or altered
    let mut null_counts: Vec<(String, usize)> = cleaned.header[1..]
        .iter()
        .map(|h| (h.clone(), 0))
        .collect();
    let mut seen: HashMap<&[String], usize> = HashMap::new();
    let mut duplicate_rows = 0;
    for row in &cleaned.rows {
        for (j, value) in row[1..].iter().enumerate() {
            if value.is_empty() {
                null_counts[j].1 += 1;
            }
        }
        let count = seen.entry(&row[1..]).or_insert(0);
        if *count > 0 {
            duplicate_rows += 1;
        }
        *count += 1;
    }
    for (column, nulls) in &null_counts {
        if *nulls > 0 {
            info!(column = %column, nulls, "Null values in column");
        }
    }
    info!(
        rows = cleaned.row_count(),
        duplicate_rows, "Transform quality scan complete"
    );

    write_artifact(transformed_path, &cleaned.to_csv_bytes()?)?;
    info!(path = %transformed_path.display(), "Wrote transformed artifact");

    Ok(TransformSummary {
        rows: cleaned.row_count(),
        columns: cleaned.header.len(),
        null_counts,
        duplicate_rows,
    })
}

/// Result of the load stage.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub rows_loaded: u64,
    pub sample: Sample,
}

/// Loader: fetches the transformed object, validates its header against the
/// fixed destination schema, replaces the table's full contents, and runs
/// the verification query. Connection and schema errors are fatal; a failed
/// load must never be silently ignored.
pub async fn load(
    store: &dyn ObjectStorePort,
    warehouse: &dyn Warehouse,
    slots: &Slots,
) -> Result<LoadSummary> {
    let bytes = store.get(&slots.bucket, &slots.transformed_key).await?;
    let table = Table::from_csv_bytes(&bytes)?;

    let mut expected = vec![ROW_ID_HEADER.to_string()];
    expected.extend(TABLE_COLUMNS.iter().map(|c| c.header.to_string()));
    if table.header != expected {
        return Err(EtlError::SchemaMismatch(format!(
            "Transformed artifact header {:?} does not match the destination schema",
            table.header
        )));
    }

    let rows_loaded = warehouse.replace_all(&table).await?;
    let sample = warehouse.verification_sample().await?;
    info!(rows_loaded, "Load complete");
    Ok(LoadSummary { rows_loaded, sample })
}
