use std::collections::{BTreeMap, BTreeSet, HashSet};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{info, warn};

use crate::database::schema::SCHEMA;
use crate::transform::normalizer::{ColorRow, NormalizedBatch};

/// Opens (creating if needed) the store at `path` and makes sure the schema exists.
pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path))?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates the three tables. Safe to call on an existing store.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).context("Failed to initialize schema")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub metadata: usize,
    pub media: usize,
    pub colors: usize,
    /// Rows dropped because they carried no artifact id.
    pub skipped: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.metadata + self.media + self.colors
    }
}

type ColorKey<'a> = (
    i64,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<u64>,
    Option<&'a str>,
);

fn color_key(id: i64, row: &ColorRow) -> ColorKey<'_> {
    (
        id,
        row.color.as_deref(),
        row.spectrum.as_deref(),
        row.hue.as_deref(),
        row.percent.map(f64::to_bits),
        row.css3.as_deref(),
    )
}

/// Writes one normalized batch in a single transaction.
///
/// Metadata and media rows are deduplicated by id with the last occurrence
/// winning, then replaced wholesale. Every artifact in the batch has its stored
/// colors deleted before the batch's distinct color rows are inserted. On any
/// error the transaction rolls back and nothing from the batch is visible.
pub fn load(conn: &mut Connection, batch: &NormalizedBatch) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();

    let mut metadata = BTreeMap::new();
    for row in &batch.metadata {
        match row.id {
            Some(id) => {
                metadata.insert(id, row);
            }
            None => summary.skipped += 1,
        }
    }

    let mut media = BTreeMap::new();
    for row in &batch.media {
        match row.objectid {
            Some(id) => {
                media.insert(id, row);
            }
            None => summary.skipped += 1,
        }
    }

    let mut seen = HashSet::new();
    let mut colors = Vec::new();
    for row in &batch.colors {
        let Some(id) = row.objectid else {
            summary.skipped += 1;
            continue;
        };
        if seen.insert(color_key(id, row)) {
            colors.push((id, row));
        }
    }

    let artifact_ids: BTreeSet<i64> = metadata
        .keys()
        .chain(media.keys())
        .copied()
        .chain(colors.iter().map(|(id, _)| *id))
        .collect();

    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "Rows without an artifact id were not stored");
    }

    let tx = conn.transaction().context("Failed to begin transaction")?;

    {
        let mut stmt_metadata = tx.prepare(
            "INSERT OR REPLACE INTO artifact_metadata
                (id, title, culture, period, century, medium, dimensions,
                 description, department, classification, accessionyear, accessionmethod)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;

        let mut stmt_media = tx.prepare(
            "INSERT OR REPLACE INTO artifact_media
                (objectid, imagecount, mediacount, colorcount, rank, datebegin, dateend)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        let mut stmt_clear_colors = tx.prepare("DELETE FROM artifact_colors WHERE objectid = ?1")?;

        let mut stmt_color = tx.prepare(
            "INSERT INTO artifact_colors (objectid, color, spectrum, hue, percent, css3)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;

        for (id, row) in &metadata {
            stmt_metadata
                .execute(params![
                    id,
                    row.title,
                    row.culture,
                    row.period,
                    row.century,
                    row.medium,
                    row.dimensions,
                    row.description,
                    row.department,
                    row.classification,
                    row.accessionyear,
                    row.accessionmethod,
                ])
                .with_context(|| format!("Failed to write metadata for artifact {}", id))?;
            summary.metadata += 1;
        }

        for (id, row) in &media {
            stmt_media
                .execute(params![
                    id,
                    row.imagecount,
                    row.mediacount,
                    row.colorcount,
                    row.rank,
                    row.datebegin,
                    row.dateend,
                ])
                .with_context(|| format!("Failed to write media for artifact {}", id))?;
            summary.media += 1;
        }

        for id in &artifact_ids {
            stmt_clear_colors
                .execute(params![id])
                .with_context(|| format!("Failed to clear colors for artifact {}", id))?;
        }

        for (id, row) in &colors {
            stmt_color
                .execute(params![id, row.color, row.spectrum, row.hue, row.percent, row.css3])
                .with_context(|| format!("Failed to write color for artifact {}", id))?;
            summary.colors += 1;
        }
    }

    tx.commit().context("Failed to commit transaction")?;
    info!(
        metadata = summary.metadata,
        media = summary.media,
        colors = summary.colors,
        "Batch stored"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::RawRecord;
    use crate::transform::normalizer::normalize;
    use serde_json::json;

    fn batch(values: &[serde_json::Value]) -> NormalizedBatch {
        let records: Vec<RawRecord> = values.iter().map(RawRecord::from_json).collect();
        normalize(&records)
    }

    fn count(conn: &Connection, table: &str) -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
    }

    #[test]
    fn test_schema_init_is_idempotent() -> Result<()> {
        let conn = open_in_memory()?;
        init_schema(&conn)?;
        init_schema(&conn)?;
        assert_eq!(count(&conn, "artifact_metadata")?, 0);
        Ok(())
    }

    #[test]
    fn test_end_to_end_dedup() -> Result<()> {
        let mut conn = open_in_memory()?;
        let rows = batch(&[
            json!({
                "id": 1,
                "title": "Old title",
                "colors": [
                    { "color": "#000000", "spectrum": "#1eb264", "hue": "Black", "percent": 60.0, "css3": "black" },
                    { "color": "#ffffff", "spectrum": "#ffffff", "hue": "White", "percent": 40.0, "css3": "white" }
                ]
            }),
            json!({ "id": 2, "title": "Plate" }),
            json!({
                "id": 1,
                "title": "New title",
                "colors": [{ "color": "#c80000", "hue": "Red", "percent": 10.5, "css3": "firebrick" }]
            }),
        ]);

        let summary = load(&mut conn, &rows)?;
        assert_eq!(summary.metadata, 2);
        assert_eq!(summary.media, 2);
        assert_eq!(summary.colors, 3);
        assert_eq!(summary.total(), 7);

        assert_eq!(count(&conn, "artifact_metadata")?, 2);
        assert_eq!(count(&conn, "artifact_colors")?, 3);
        let title: String =
            conn.query_row("SELECT title FROM artifact_metadata WHERE id = 1", [], |r| r.get(0))?;
        assert_eq!(title, "New title");
        let colorcount: i64 =
            conn.query_row("SELECT colorcount FROM artifact_media WHERE objectid = 1", [], |r| r.get(0))?;
        assert_eq!(colorcount, 1);
        Ok(())
    }

    #[test]
    fn test_reload_same_batch_is_idempotent() -> Result<()> {
        let mut conn = open_in_memory()?;
        let rows = batch(&[
            json!({ "id": 10, "colors": [{ "color": "#111" }, { "color": "#111" }] }),
            json!({ "id": 11, "colors": [{ "color": "#222" }] }),
        ]);

        load(&mut conn, &rows)?;
        load(&mut conn, &rows)?;

        assert_eq!(count(&conn, "artifact_metadata")?, 2);
        assert_eq!(count(&conn, "artifact_media")?, 2);
        assert_eq!(count(&conn, "artifact_colors")?, 2);
        Ok(())
    }

    #[test]
    fn test_reload_replaces_stale_colors() -> Result<()> {
        let mut conn = open_in_memory()?;
        load(&mut conn, &batch(&[json!({ "id": 4, "colors": [{ "hue": "Red", "percent": 50.0 }] })]))?;
        load(&mut conn, &batch(&[json!({ "id": 4, "colors": [{ "hue": "Red", "percent": 55.0 }] })]))?;

        let percent: f64 =
            conn.query_row("SELECT percent FROM artifact_colors WHERE objectid = 4", [], |r| r.get(0))?;
        assert_eq!(count(&conn, "artifact_colors")?, 1);
        assert_eq!(percent, 55.0);
        Ok(())
    }

    #[test]
    fn test_reload_overwrites_instead_of_merging() -> Result<()> {
        let mut conn = open_in_memory()?;
        load(&mut conn, &batch(&[json!({ "id": 3, "title": "Vase", "culture": "Greek" })]))?;
        load(&mut conn, &batch(&[json!({ "id": 3, "title": "Vase" })]))?;

        let culture: Option<String> =
            conn.query_row("SELECT culture FROM artifact_metadata WHERE id = 3", [], |r| r.get(0))?;
        assert_eq!(culture, None);
        Ok(())
    }

    #[test]
    fn test_rank_keeps_fractional_scores() -> Result<()> {
        let mut conn = open_in_memory()?;
        load(&mut conn, &batch(&[json!({ "id": 1, "rank": 12.5 }), json!({ "id": 2, "rank": 17 })]))?;

        let fractional: f64 =
            conn.query_row("SELECT rank FROM artifact_media WHERE objectid = 1", [], |r| r.get(0))?;
        let whole: i64 =
            conn.query_row("SELECT rank FROM artifact_media WHERE objectid = 2", [], |r| r.get(0))?;
        assert_eq!(fractional, 12.5);
        assert_eq!(whole, 17);
        Ok(())
    }

    #[test]
    fn test_rows_without_id_are_skipped() -> Result<()> {
        let mut conn = open_in_memory()?;
        let summary = load(&mut conn, &batch(&[json!({ "title": "Anonymous", "colors": [{}] })]))?;
        assert_eq!(summary.total(), 0);
        assert_eq!(summary.skipped, 3);
        assert_eq!(count(&conn, "artifact_metadata")?, 0);
        Ok(())
    }

    #[test]
    fn test_failed_write_rolls_back_whole_batch() -> Result<()> {
        let mut conn = open_in_memory()?;
        conn.execute_batch(
            "CREATE TRIGGER reject_colors BEFORE INSERT ON artifact_colors
             BEGIN SELECT RAISE(ABORT, 'color rejected'); END;",
        )?;

        let result = load(&mut conn, &batch(&[json!({ "id": 8, "colors": [{ "hue": "Blue" }] })]));
        assert!(result.is_err());
        assert_eq!(count(&conn, "artifact_metadata")?, 0);
        assert_eq!(count(&conn, "artifact_media")?, 0);
        Ok(())
    }
}
