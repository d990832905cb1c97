//! The catalog: an embedded SQLite store of assets and their tags.
//!
//! A [`Catalog`] is an explicit handle; callers own it and there is no
//! process-wide database state. All writes for one asset happen in a single
//! transaction so a search can never observe an asset row whose tag set is
//! stale or half-written.

mod schema;

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::sidecar::Sidecar;

pub use schema::SCHEMA;

/// Tag normalization applied before storage: lowercase, trimmed,
/// inner whitespace collapsed to hyphens.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub filepath: String,
    pub filename: String,
    pub file_type: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Number of distinct query terms this asset matched.
    pub score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_assets: i64,
    pub photos: i64,
    pub videos: i64,
    pub unique_tags: i64,
    pub total_tags: i64,
    pub top_tags: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedAsset {
    pub filepath: String,
    pub filename: String,
    pub file_type: String,
    pub description: Option<String>,
    pub scene_type: Option<String>,
    pub mood: Vec<String>,
    pub time_of_day: Option<String>,
    pub weather: Option<String>,
    pub motion: Option<String>,
    pub shot_type: Option<String>,
    pub notable_elements: Vec<String>,
    pub date_taken: Option<String>,
    pub processed_at: Option<String>,
    pub keyframe_count: Option<i64>,
    pub tags: Vec<String>,
}

pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open (or create) a catalog at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// In-memory catalog for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert-or-replace the asset row keyed by filepath and replace its tag
    /// set, as one atomic transaction. Returns the asset id.
    ///
    /// Calling this twice with identical input leaves one row and one tag
    /// set; the only observable difference is the processing timestamp.
    pub fn upsert_asset(&mut self, meta: &Sidecar) -> Result<i64> {
        let technical = &meta.technical_metadata;
        let mood = serde_json::to_string(&meta.mood)?;
        let notable = serde_json::to_string(&meta.notable_elements)?;

        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO assets (
                filepath, filename, file_type, file_size_bytes,
                description, scene_type, mood, time_of_day, weather, motion,
                shot_type, notable_elements,
                duration_seconds, resolution_width, resolution_height,
                codec, frame_rate,
                camera_model, lens, iso, aperture, shutter_speed,
                gps_lat, gps_lon, date_taken,
                processed_at, keyframe_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                      ?25, ?26, ?27)
            ON CONFLICT(filepath) DO UPDATE SET
                filename = excluded.filename,
                file_type = excluded.file_type,
                file_size_bytes = excluded.file_size_bytes,
                description = excluded.description,
                scene_type = excluded.scene_type,
                mood = excluded.mood,
                time_of_day = excluded.time_of_day,
                weather = excluded.weather,
                motion = excluded.motion,
                shot_type = excluded.shot_type,
                notable_elements = excluded.notable_elements,
                duration_seconds = excluded.duration_seconds,
                resolution_width = excluded.resolution_width,
                resolution_height = excluded.resolution_height,
                codec = excluded.codec,
                frame_rate = excluded.frame_rate,
                camera_model = excluded.camera_model,
                lens = excluded.lens,
                iso = excluded.iso,
                aperture = excluded.aperture,
                shutter_speed = excluded.shutter_speed,
                gps_lat = excluded.gps_lat,
                gps_lon = excluded.gps_lon,
                date_taken = excluded.date_taken,
                processed_at = excluded.processed_at,
                keyframe_count = excluded.keyframe_count
            "#,
            rusqlite::params![
                meta.filepath,
                meta.filename,
                meta.file_type.as_str(),
                technical.file_size_bytes.map(|s| s as i64),
                meta.description,
                meta.scene_type,
                mood,
                meta.time_of_day,
                meta.weather,
                meta.motion,
                meta.shot_type,
                notable,
                technical.duration_seconds,
                technical.width,
                technical.height,
                technical.codec,
                technical.frame_rate,
                technical.camera_model,
                technical.lens,
                technical.iso,
                technical.aperture,
                technical.shutter_speed,
                technical.gps_lat,
                technical.gps_lon,
                technical.date_taken,
                meta.processed_at,
                meta.keyframe_count,
            ],
        )?;

        let asset_id: i64 = tx.query_row(
            "SELECT id FROM assets WHERE filepath = ?",
            [&meta.filepath],
            |row| row.get(0),
        )?;

        // Full tag replacement: stale tags from a previous analysis never linger
        tx.execute("DELETE FROM tags WHERE asset_id = ?", [asset_id])?;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO tags (asset_id, tag) VALUES (?, ?)")?;
            for tag in &meta.tags {
                let normalized = normalize_tag(tag);
                if !normalized.is_empty() {
                    stmt.execute(rusqlite::params![asset_id, normalized])?;
                }
            }
        }

        tx.commit()?;
        Ok(asset_id)
    }

    /// Rank-ordered search over tags, descriptions and scene types.
    ///
    /// Each term matches by substring; assets matching more distinct terms
    /// rank first, ties broken by most recent processing. One row per asset.
    pub fn search(&self, terms: &[String]) -> Result<Vec<SearchHit>> {
        let terms: Vec<&String> = terms.iter().filter(|t| !t.trim().is_empty()).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut score_parts = Vec::with_capacity(terms.len());
        let mut params = Vec::with_capacity(terms.len());
        for (i, term) in terms.iter().enumerate() {
            let idx = i + 1;
            score_parts.push(format!(
                "(CASE WHEN EXISTS (SELECT 1 FROM tags t WHERE t.asset_id = a.id AND t.tag LIKE ?{idx}) \
                 OR a.description LIKE ?{idx} OR a.scene_type LIKE ?{idx} THEN 1 ELSE 0 END)"
            ));
            params.push(format!("%{}%", term.trim().to_lowercase()));
        }

        let sql = format!(
            r#"
            SELECT filepath, filename, file_type, description, all_tags, score FROM (
                SELECT a.id, a.filepath, a.filename, a.file_type,
                       COALESCE(a.description, '') AS description,
                       a.processed_at,
                       (SELECT GROUP_CONCAT(tag, ',') FROM tags WHERE asset_id = a.id) AS all_tags,
                       ({score}) AS score
                FROM assets a
            )
            WHERE score > 0
            ORDER BY score DESC, processed_at DESC
            "#,
            score = score_parts.join(" + ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let hits = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                let all_tags: Option<String> = row.get(4)?;
                Ok(SearchHit {
                    filepath: row.get(0)?,
                    filename: row.get(1)?,
                    file_type: row.get(2)?,
                    description: row.get(3)?,
                    tags: all_tags
                        .map(|t| t.split(',').map(String::from).collect())
                        .unwrap_or_default(),
                    score: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(hits)
    }

    /// Aggregate counts for operator feedback.
    pub fn stats(&self, top_n: usize) -> Result<CatalogStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        let total_assets = count("SELECT COUNT(*) FROM assets")?;
        let photos = count("SELECT COUNT(*) FROM assets WHERE file_type = 'photo'")?;
        let videos = count("SELECT COUNT(*) FROM assets WHERE file_type = 'video'")?;
        let unique_tags = count("SELECT COUNT(DISTINCT tag) FROM tags")?;
        let total_tags = count("SELECT COUNT(*) FROM tags")?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT tag, COUNT(*) as cnt
            FROM tags
            GROUP BY tag
            ORDER BY cnt DESC, tag ASC
            LIMIT ?
            "#,
        )?;
        let top_tags = stmt
            .query_map([top_n as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(CatalogStats {
            total_assets,
            photos,
            videos,
            unique_tags,
            total_tags,
            top_tags,
        })
    }

    /// All tags with occurrence counts, alphabetical.
    pub fn list_tags(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT tag, COUNT(*) as cnt
            FROM tags
            GROUP BY tag
            ORDER BY tag
            "#,
        )?;
        let tags = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tags)
    }

    /// Export the whole catalog, tags attached and JSON columns decoded.
    pub fn export(&self) -> Result<Vec<ExportedAsset>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, filepath, filename, file_type, description, scene_type,
                   mood, time_of_day, weather, motion, shot_type,
                   notable_elements, date_taken, processed_at, keyframe_count
            FROM assets
            ORDER BY date_taken DESC, filepath ASC
            "#,
        )?;

        let rows: Vec<(i64, ExportedAsset)> = stmt
            .query_map([], |row| {
                let mood: Option<String> = row.get(6)?;
                let notable: Option<String> = row.get(11)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    ExportedAsset {
                        filepath: row.get(1)?,
                        filename: row.get(2)?,
                        file_type: row.get(3)?,
                        description: row.get(4)?,
                        scene_type: row.get(5)?,
                        mood: decode_string_list(mood),
                        time_of_day: row.get(7)?,
                        weather: row.get(8)?,
                        motion: row.get(9)?,
                        shot_type: row.get(10)?,
                        notable_elements: decode_string_list(notable),
                        date_taken: row.get(12)?,
                        processed_at: row.get(13)?,
                        keyframe_count: row.get(14)?,
                        tags: Vec::new(),
                    },
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();

        let mut tag_stmt = self
            .conn
            .prepare("SELECT tag FROM tags WHERE asset_id = ? ORDER BY tag")?;

        let mut assets = Vec::with_capacity(rows.len());
        for (id, mut asset) in rows {
            asset.tags = tag_stmt
                .query_map([id], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            assets.push(asset);
        }

        Ok(assets)
    }
}

fn decode_string_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::TechnicalMetadata;
    use crate::scanner::MediaKind;

    fn sample_sidecar(path: &str, tags: &[&str]) -> Sidecar {
        Sidecar {
            filepath: path.to_string(),
            filename: path.rsplit('/').next().unwrap_or(path).to_string(),
            file_type: MediaKind::Photo,
            description: "A quiet beach at dusk".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            scene_type: "landscape".to_string(),
            mood: vec!["calm".to_string()],
            time_of_day: "evening".to_string(),
            weather: "clear".to_string(),
            motion: String::new(),
            shot_type: "wide".to_string(),
            notable_elements: vec!["driftwood".to_string()],
            technical_metadata: TechnicalMetadata {
                file_size_bytes: Some(2048),
                width: Some(6000),
                height: Some(4000),
                ..Default::default()
            },
            keyframe_count: 0,
            processed_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn tag_rows(catalog: &Catalog, filepath: &str) -> Vec<String> {
        let mut stmt = catalog
            .conn
            .prepare(
                "SELECT t.tag FROM tags t JOIN assets a ON t.asset_id = a.id \
                 WHERE a.filepath = ? ORDER BY t.tag",
            )
            .unwrap();
        stmt.query_map([filepath], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  Sunset  "), "sunset");
        assert_eq!(normalize_tag("Golden Hour"), "golden-hour");
        assert_eq!(normalize_tag("city  at night"), "city-at-night");
        assert_eq!(normalize_tag("   "), "");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let sidecar = sample_sidecar("/media/a.jpg", &["beach", "dusk"]);

        let id1 = catalog.upsert_asset(&sidecar).unwrap();
        let id2 = catalog.upsert_asset(&sidecar).unwrap();
        assert_eq!(id1, id2);

        let stats = catalog.stats(10).unwrap();
        assert_eq!(stats.total_assets, 1);
        assert_eq!(stats.total_tags, 2);
    }

    #[test]
    fn test_upsert_replaces_tag_set() {
        let mut catalog = Catalog::open_in_memory().unwrap();

        let mut sidecar = sample_sidecar("/media/a.jpg", &["a", "b"]);
        catalog.upsert_asset(&sidecar).unwrap();

        sidecar.tags = vec!["c".to_string()];
        catalog.upsert_asset(&sidecar).unwrap();

        assert_eq!(tag_rows(&catalog, "/media/a.jpg"), vec!["c"]);
    }

    #[test]
    fn test_upsert_normalizes_and_dedupes_tags() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let sidecar = sample_sidecar("/media/a.jpg", &["Golden Hour", "golden-hour", "  ", "Sea"]);
        catalog.upsert_asset(&sidecar).unwrap();

        assert_eq!(tag_rows(&catalog, "/media/a.jpg"), vec!["golden-hour", "sea"]);
    }

    #[test]
    fn test_search_ranks_by_distinct_term_matches() {
        let mut catalog = Catalog::open_in_memory().unwrap();

        let mut x = sample_sidecar("/media/x.jpg", &["sunset", "beach"]);
        x.description = "Sunset over the beach".to_string();
        x.processed_at = "2026-01-01T00:00:00Z".to_string();
        catalog.upsert_asset(&x).unwrap();

        let mut y = sample_sidecar("/media/y.jpg", &["sunset"]);
        y.description = "City sunset".to_string();
        y.processed_at = "2026-02-01T00:00:00Z".to_string();
        catalog.upsert_asset(&y).unwrap();

        let hits = catalog
            .search(&["sunset".to_string(), "beach".to_string()])
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].filepath, "/media/x.jpg");
        assert_eq!(hits[0].score, 2);
        assert_eq!(hits[1].filepath, "/media/y.jpg");
        assert_eq!(hits[1].score, 1);
    }

    #[test]
    fn test_search_ties_break_by_recency_and_rows_unique() {
        let mut catalog = Catalog::open_in_memory().unwrap();

        let mut old = sample_sidecar("/media/old.jpg", &["sunset", "sunset-glow"]);
        old.processed_at = "2026-01-01T00:00:00Z".to_string();
        catalog.upsert_asset(&old).unwrap();

        let mut new = sample_sidecar("/media/new.jpg", &["sunset"]);
        new.processed_at = "2026-03-01T00:00:00Z".to_string();
        catalog.upsert_asset(&new).unwrap();

        // "sunset" matches both tags of old.jpg, but it must appear once
        let hits = catalog.search(&["sunset".to_string()]).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].filepath, "/media/new.jpg");
        assert_eq!(hits[1].filepath, "/media/old.jpg");
    }

    #[test]
    fn test_search_matches_description_substring() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        let mut s = sample_sidecar("/media/a.jpg", &["boat"]);
        s.description = "A lighthouse on the headland".to_string();
        catalog.upsert_asset(&s).unwrap();

        let hits = catalog.search(&["lighthouse".to_string()]).unwrap();
        assert_eq!(hits.len(), 1);

        assert!(catalog.search(&["submarine".to_string()]).unwrap().is_empty());
        assert!(catalog.search(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_stats_counts_and_top_tags() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog
            .upsert_asset(&sample_sidecar("/m/a.jpg", &["sea", "sky"]))
            .unwrap();
        catalog
            .upsert_asset(&sample_sidecar("/m/b.jpg", &["sea"]))
            .unwrap();
        let mut video = sample_sidecar("/m/c.mp4", &["sea", "boat"]);
        video.file_type = MediaKind::Video;
        catalog.upsert_asset(&video).unwrap();

        let stats = catalog.stats(2).unwrap();
        assert_eq!(stats.total_assets, 3);
        assert_eq!(stats.photos, 2);
        assert_eq!(stats.videos, 1);
        assert_eq!(stats.unique_tags, 3);
        assert_eq!(stats.total_tags, 5);
        assert_eq!(stats.top_tags[0], ("sea".to_string(), 3));
    }

    #[test]
    fn test_export_attaches_tags_and_decodes_lists() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog
            .upsert_asset(&sample_sidecar("/m/a.jpg", &["sea", "sky"]))
            .unwrap();

        let exported = catalog.export().unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].tags, vec!["sea", "sky"]);
        assert_eq!(exported[0].mood, vec!["calm"]);
        assert_eq!(exported[0].notable_elements, vec!["driftwood"]);
    }

    #[test]
    fn test_list_tags_alphabetical() {
        let mut catalog = Catalog::open_in_memory().unwrap();
        catalog
            .upsert_asset(&sample_sidecar("/m/a.jpg", &["zebra", "alpha"]))
            .unwrap();

        let tags = catalog.list_tags().unwrap();
        assert_eq!(tags[0].0, "alpha");
        assert_eq!(tags[1].0, "zebra");
    }
}
