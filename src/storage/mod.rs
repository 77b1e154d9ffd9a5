//! Relational sink for scraped quotes.
//!
//! Every operation opens its own connection and closes it before returning,
//! on success and on failure. Tags are not stored here; only text and author.

use crate::config::StorageConfig;
use crate::models::{Quote, StoredQuote};
use anyhow::{Context, Result};
use duckdb::{Connection, params};
use std::path::PathBuf;
use tracing::{error, info, warn};

pub const TABLE: &str = "citacoes";

/// Rows returned by the viewer.
pub const PREVIEW_LIMIT: usize = 100;

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS citacoes_id_seq START 1;

CREATE TABLE IF NOT EXISTS citacoes (
    id      BIGINT PRIMARY KEY DEFAULT nextval('citacoes_id_seq'),
    texto   VARCHAR,
    autor   VARCHAR
);
"#;

/// Same table, created natively on the PostgreSQL side.
const PG_DDL: &str = "CREATE TABLE IF NOT EXISTS citacoes (id SERIAL PRIMARY KEY, texto TEXT, autor TEXT)";

const PG_ALIAS: &str = "quotes_pg";

const INSERT: &str = "INSERT INTO citacoes (texto, autor) VALUES (?, ?)";

// ── Target ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum StoreTarget {
    /// Local DuckDB database file
    File(PathBuf),
    /// PostgreSQL, attached through DuckDB's `postgres` extension
    Postgres(String),
}

impl StoreTarget {
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        if !config.uses_postgres() {
            return Ok(Self::File(config.path.clone()));
        }

        let mut parts = Vec::new();
        let fields = [
            ("dbname", config.name.as_deref()),
            ("user", config.user.as_deref()),
            ("password", config.password.as_deref()),
            ("host", config.host.as_deref()),
        ];
        for (key, value) in fields {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                parts.push(format!("{key}={}", libpq_quote(v)));
            }
        }
        if let Some(port) = config.port()? {
            parts.push(format!("port={port}"));
        }
        Ok(Self::Postgres(parts.join(" ")))
    }
}

/// Quote a libpq keyword value.
fn libpq_quote(v: &str) -> String {
    format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'"))
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct QuoteStore {
    target: StoreTarget,
}

impl QuoteStore {
    pub fn new(target: StoreTarget) -> Self {
        Self { target }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(StoreTarget::from_config(config)?))
    }

    #[cfg(test)]
    pub fn open_file(path: &std::path::Path) -> Self {
        Self::new(StoreTarget::File(path.to_path_buf()))
    }

    fn connect(&self) -> Result<Connection> {
        match &self.target {
            StoreTarget::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Could not create dir {:?}", parent))?;
                }
                Connection::open(path)
                    .with_context(|| format!("Failed to open DuckDB at {:?}", path))
            }
            StoreTarget::Postgres(dsn) => {
                let conn = Connection::open_in_memory()?;
                let attach = format!(
                    "INSTALL postgres; LOAD postgres; ATTACH '{}' AS {PG_ALIAS} (TYPE POSTGRES); USE {PG_ALIAS};",
                    dsn.replace('\'', "''")
                );
                if let Err(e) = conn.execute_batch(&attach) {
                    release(conn);
                    return Err(e).context("Failed to attach PostgreSQL database");
                }
                Ok(conn)
            }
        }
    }

    /// Open, run `op`, close. The connection is released on both paths.
    fn with_connection<T>(&self, op: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.connect()?;
        let result = op(&mut conn);
        release(conn);
        result
    }

    // ── Schema ────────────────────────────────────────────────────────────────

    /// Create the quotes table unless it already exists. Safe on every startup.
    pub fn ensure_schema(&self) -> Result<()> {
        let postgres = matches!(self.target, StoreTarget::Postgres(_));

        self.with_connection(|conn| {
            if table_exists(conn)? {
                info!("Table {} already present", TABLE);
                return Ok(());
            }

            let created = if postgres {
                conn.execute_batch(&format!(
                    "CALL postgres_execute('{PG_ALIAS}', '{PG_DDL}'); CALL pg_clear_cache();"
                ))
            } else {
                conn.execute_batch(DDL)
            };
            created.context("DDL failed")?;

            info!("Table {} created", TABLE);
            Ok(())
        })
    }

    // ── Insert ────────────────────────────────────────────────────────────────

    /// Insert the whole batch in one transaction. Any failing row rolls back
    /// every row of the batch.
    pub fn insert_all(&self, quotes: &[Quote]) -> Result<usize> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;

            for (i, q) in quotes.iter().enumerate() {
                if let Err(e) = tx.execute(INSERT, params![q.text, q.author]) {
                    error!(
                        "Insert of quote #{} by {:?} failed, batch rolled back: {}",
                        i + 1,
                        q.author,
                        e
                    );
                    if let Err(rb) = tx.rollback() {
                        warn!("Rollback failed: {}", rb);
                    }
                    return Err(e).with_context(|| {
                        format!("insert quote #{} by {:?}; batch rolled back", i + 1, q.author)
                    });
                }
            }

            if let Err(e) = tx.commit() {
                error!("Commit of {} quotes failed: {}", quotes.len(), e);
                return Err(e).context("commit failed");
            }
            info!("{} quotes inserted into {}", quotes.len(), TABLE);
            Ok(quotes.len())
        })
    }

    // ── Read back ─────────────────────────────────────────────────────────────

    /// Read-only look at up to `limit` rows (capped at [`PREVIEW_LIMIT`]).
    pub fn fetch_preview(&self, limit: usize) -> Result<Vec<StoredQuote>> {
        let limit = limit.min(PREVIEW_LIMIT);

        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, texto, autor FROM citacoes ORDER BY id LIMIT {limit}"
            ))?;
            let rows = stmt
                .query_map([], |r| {
                    Ok(StoredQuote {
                        id: r.get(0)?,
                        text: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        author: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .context("preview query failed")?;

            info!("Preview read {} rows", rows.len());
            Ok(rows)
        })
    }

    pub fn count(&self) -> Result<i64> {
        self.with_connection(|conn| {
            let mut s = conn.prepare("SELECT COUNT(*) FROM citacoes")?;
            Ok(s.query_row([], |r| r.get(0))?)
        })
    }
}

fn table_exists(conn: &Connection) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM duckdb_tables() \
         WHERE database_name = current_database() AND table_name = ?",
    )?;
    let n: i64 = stmt.query_row(params![TABLE], |r| r.get(0))?;
    Ok(n > 0)
}

fn release(conn: Connection) {
    if let Err((_conn, e)) = conn.close() {
        warn!("Failed to close connection: {}", e);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, QuoteStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = QuoteStore::open_file(&tmp.path().join("db/quotes.duckdb"));
        (tmp, store)
    }

    fn column_names(store: &QuoteStore) -> Vec<String> {
        store
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT column_name FROM information_schema.columns \
                     WHERE table_name = 'citacoes' ORDER BY ordinal_position",
                )?;
                let names = stmt
                    .query_map([], |r| r.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .unwrap()
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let (_tmp, store) = store();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();

        assert_eq!(column_names(&store), vec!["id", "texto", "autor"]);
        let tables: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM duckdb_tables() WHERE table_name = 'citacoes'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_insert_assigns_ids_and_drops_tags() {
        let (_tmp, store) = store();
        store.ensure_schema().unwrap();

        let quotes = vec![
            Quote::new("Be bold.", "J. Doe", &["courage"]),
            Quote::new("Stay curious.", "A. Einstein", &["curiosity", "science"]),
        ];
        assert_eq!(store.insert_all(&quotes).unwrap(), 2);
        assert_eq!(store.insert_all(&quotes).unwrap(), 2);

        let rows = store.fetch_preview(PREVIEW_LIMIT).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].text, "Be bold.");
        assert_eq!(rows[1].author, "A. Einstein");
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_failed_row_rolls_back_whole_batch() {
        let (tmp, store) = store();
        let path = tmp.path().join("db/quotes.duckdb");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        // Pre-existing table that rejects one specific author.
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE SEQUENCE citacoes_id_seq START 1;
             CREATE TABLE citacoes (
                 id BIGINT PRIMARY KEY DEFAULT nextval('citacoes_id_seq'),
                 texto VARCHAR,
                 autor VARCHAR CHECK (autor <> 'Broken')
             );",
        )
        .unwrap();
        drop(conn);

        store.ensure_schema().unwrap();

        let batch = vec![
            Quote::new("A", "Anon", &[]),
            Quote::new("B", "Broken", &[]),
            Quote::new("C", "Anon", &[]),
        ];
        let err = store.insert_all(&batch).unwrap_err();
        assert!(format!("{:#}", err).contains("insert quote #2"));
        assert_eq!(store.count().unwrap(), 0);

        // the store is still usable afterwards
        assert_eq!(store.insert_all(&batch[..1]).unwrap(), 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_preview_is_capped() {
        let (_tmp, store) = store();
        store.ensure_schema().unwrap();

        let quotes: Vec<Quote> = (0..105)
            .map(|i| Quote::new(format!("quote {i}"), "Anon", &[]))
            .collect();
        store.insert_all(&quotes).unwrap();

        assert_eq!(store.fetch_preview(500).unwrap().len(), PREVIEW_LIMIT);
        assert_eq!(store.fetch_preview(3).unwrap().len(), 3);
        assert_eq!(store.count().unwrap(), 105);
    }

    #[test]
    fn test_events_route_to_storage_log() {
        assert!(module_path!().starts_with(crate::logging::STORAGE_TARGET));
    }

    #[test]
    fn test_postgres_target_from_config() {
        let cfg = StorageConfig {
            path: PathBuf::from("unused.duckdb"),
            name: Some("quotes".into()),
            user: Some("etl".into()),
            password: Some("it's".into()),
            host: Some("db".into()),
            port: Some("5432".into()),
        };
        match StoreTarget::from_config(&cfg).unwrap() {
            StoreTarget::Postgres(dsn) => assert_eq!(
                dsn,
                r#"dbname='quotes' user='etl' password='it\'s' host='db' port=5432"#
            ),
            other => panic!("unexpected target {:?}", other),
        }
    }
}
