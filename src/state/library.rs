use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::task;
use tracing::{debug, info};
use uuid::Uuid;

use super::data::{GarmentPatch, GarmentRecord, NewGarment};
use crate::error::{CatalogError, Result};

/// Schema version written to `PRAGMA user_version` on first use.
/// There is no migration path; newer databases are refused.
const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Where the catalog database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    /// Private in-memory database, gone when the store is closed.
    /// After [`RecordStore::close`] every operation fails with `ReadError`
    /// until [`RecordStore::open`] starts a new, empty database.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Open,
    Read,
    Write,
}

/// The RecordStore manages the SQLite catalog database.
///
/// Each garment is one row keyed by `id`. The full record is kept as JSON in
/// `record_json`; `category` and `created_at` are copied into their own
/// indexed columns for lookups.
///
/// The handle is cheap to clone. All clones share one connection, which is
/// opened lazily on first use. A file store is reopened if an operation
/// arrives after [`RecordStore::close`]; a closed in-memory store refuses
/// operations until it is explicitly opened again. SQLite calls run on the blocking thread pool while
/// holding the connection lock, so store operations never interleave.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<Inner>,
}

struct Inner {
    location: StoreLocation,
    conn: Mutex<Option<Connection>>,
    /// Set when an in-memory database has been discarded by `close`
    closed: AtomicBool,
}

impl RecordStore {
    /// Create an unopened store. Nothing touches the disk until the first operation.
    pub fn new(location: StoreLocation) -> Self {
        RecordStore {
            inner: Arc::new(Inner {
                location,
                conn: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StoreLocation::Memory)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.inner.location
    }

    /// Open the connection and create the schema if needed. Idempotent.
    pub async fn open(&self) -> Result<()> {
        self.with_conn(Access::Open, "open catalog", |_| Ok(())).await
    }

    /// Drop the shared connection. A file store is reopened by the next
    /// operation. An in-memory store loses its data and stays closed until
    /// [`RecordStore::open`] is called.
    pub async fn close(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || {
            let mut slot = inner.conn.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.take() {
                Some(conn) => match conn.close() {
                    Ok(()) => {
                        if inner.location == StoreLocation::Memory {
                            inner.closed.store(true, Ordering::Release);
                        }
                        debug!("Closed catalog at {:?}", inner.location);
                        Ok(())
                    }
                    Err((conn, e)) => {
                        *slot = Some(conn);
                        Err(CatalogError::write("close catalog", e))
                    }
                },
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| CatalogError::write("close catalog", e))?
    }

    /// Insert a new record with a fresh id and `createdAt == updatedAt == now`.
    /// Returns the new id.
    pub async fn create(&self, garment: NewGarment) -> Result<String> {
        let now = Utc::now();
        let record = GarmentRecord {
            id: Uuid::new_v4().to_string(),
            fields: garment.fields,
            image_url: garment.image_url,
            coordinates: garment.coordinates,
            created_at: now,
            updated_at: now,
        };
        let id = record.id.clone();

        self.with_conn(Access::Write, "insert garment", move |conn| {
            insert_record(conn, &record)
        })
        .await?;

        info!("Created garment {}", id);
        Ok(id)
    }

    /// Every stored record, in no particular order
    pub async fn get_all(&self) -> Result<Vec<GarmentRecord>> {
        self.with_conn(Access::Read, "list garments", |conn| {
            query_records(conn, "SELECT record_json FROM garments", params![])
        })
        .await
    }

    /// Look up one record. A missing id is `Ok(None)`, not an error.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<GarmentRecord>> {
        let id = id.to_string();
        self.with_conn(Access::Read, "get garment", move |conn| load_record(conn, &id))
            .await
    }

    /// All records with the given category, served by `idx_garments_category`
    pub async fn get_by_category(&self, category: &str) -> Result<Vec<GarmentRecord>> {
        let category = category.to_string();
        self.with_conn(Access::Read, "list garments by category", move |conn| {
            query_records(
                conn,
                "SELECT record_json FROM garments WHERE category = ?1",
                [category],
            )
        })
        .await
    }

    /// Newest records first, served by `idx_garments_created_at`
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<GarmentRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(Access::Read, "list recent garments", move |conn| {
            query_records(
                conn,
                "SELECT record_json FROM garments ORDER BY created_at DESC, id LIMIT ?1",
                [limit],
            )
        })
        .await
    }

    pub async fn count(&self) -> Result<usize> {
        self.with_conn(Access::Read, "count garments", |conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM garments", [], |row| row.get(0))
                .map_err(|e| CatalogError::read("count garments", e))?;
            Ok(count.max(0) as usize)
        })
        .await
    }

    /// Merge `patch` over the stored record and bump `updatedAt`.
    pub async fn update(&self, id: &str, patch: GarmentPatch) -> Result<GarmentRecord> {
        self.modify(id, move |record| {
            patch.apply(record);
            Ok(())
        })
        .await
    }

    /// Atomic read-modify-write of one record.
    ///
    /// The read, the mutation and the write happen in a single IMMEDIATE
    /// transaction under the connection lock, so no other caller can slip a
    /// write in between. `updatedAt` is advanced after `mutate` runs; the
    /// closure cannot change `id` or `createdAt` in the stored row.
    pub async fn modify<F>(&self, id: &str, mutate: F) -> Result<GarmentRecord>
    where
        F: FnOnce(&mut GarmentRecord) -> Result<()> + Send + 'static,
    {
        let id = id.to_string();
        self.with_conn(Access::Write, "update garment", move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| CatalogError::write("begin update", e))?;

            let mut record = load_record(&tx, &id)?.ok_or_else(|| CatalogError::not_found(&id))?;
            let created_at = record.created_at;
            let previous = record.updated_at;

            mutate(&mut record)?;
            record.id = id.clone();
            record.created_at = created_at;
            record.updated_at = next_timestamp(previous);

            let json = serde_json::to_string(&record)
                .map_err(|e| CatalogError::write("serialize garment", e))?;
            tx.execute(
                "UPDATE garments SET category = ?1, record_json = ?2 WHERE id = ?3",
                params![record.fields.category, json, id],
            )
            .map_err(|e| CatalogError::write("update garment", e))?;
            tx.commit()
                .map_err(|e| CatalogError::write("commit update", e))?;

            debug!("Updated garment {}", id);
            Ok(record)
        })
        .await
    }

    /// Remove a record. Deleting an unknown id succeeds.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.with_conn(Access::Write, "delete garment", move |conn| {
            let removed = conn
                .execute("DELETE FROM garments WHERE id = ?1", [&id])
                .map_err(|e| CatalogError::write("delete garment", e))?;
            if removed > 0 {
                info!("Deleted garment {}", id);
            } else {
                debug!("Delete of unknown garment {} ignored", id);
            }
            Ok(())
        })
        .await
    }

    /// Insert complete records verbatim (ids and timestamps kept) in one
    /// transaction. Any id collision aborts the whole batch, as does a record
    /// whose coordinate ids are empty or repeated.
    pub async fn import(&self, records: Vec<GarmentRecord>) -> Result<usize> {
        for record in &records {
            check_coordinate_ids(record)?;
        }

        self.with_conn(Access::Write, "import garments", move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| CatalogError::write("begin import", e))?;
            for record in &records {
                insert_record(&tx, record)?;
            }
            tx.commit()
                .map_err(|e| CatalogError::write("commit import", e))?;
            info!("Imported {} garments", records.len());
            Ok(records.len())
        })
        .await
    }

    /// Run `f` against the open connection on the blocking pool,
    /// opening it first if needed.
    async fn with_conn<T, F>(&self, access: Access, context: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || {
            let mut slot = inner.conn.lock().unwrap_or_else(PoisonError::into_inner);
            let conn = match slot.take() {
                Some(conn) => conn,
                None => {
                    if access != Access::Open && inner.closed.load(Ordering::Acquire) {
                        return Err(CatalogError::read(context, "in-memory catalog is closed"));
                    }
                    let conn = connect(&inner.location)?;
                    inner.closed.store(false, Ordering::Release);
                    conn
                }
            };
            f(slot.insert(conn))
        })
        .await
        .map_err(|e| match access {
            Access::Open | Access::Read => CatalogError::read(context, e),
            Access::Write => CatalogError::write(context, e),
        })?
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("location", &self.inner.location)
            .finish()
    }
}

/// Open the database and make sure the schema exists
fn connect(location: &StoreLocation) -> Result<Connection> {
    let conn = match location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CatalogError::read(format!("create {}", parent.display()), e))?;
            }
            Connection::open(path)
        }
        StoreLocation::Memory => Connection::open_in_memory(),
    }
    .map_err(|e| CatalogError::read("open catalog database", e))?;

    // Another process holding the write lock makes us wait, then fail with SQLITE_BUSY
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| CatalogError::read("configure catalog database", e))?;

    init_schema(&conn)?;

    match location {
        StoreLocation::File(path) => info!("Catalog database opened at {}", path.display()),
        StoreLocation::Memory => debug!("In-memory catalog opened"),
    }
    Ok(conn)
}

/// Create the garments table and its indexes on first use.
fn init_schema(conn: &Connection) -> Result<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| CatalogError::read("read schema version", e))?;

    if version > SCHEMA_VERSION {
        return Err(CatalogError::read(
            "open catalog database",
            format!("schema version {version} is newer than supported version {SCHEMA_VERSION}"),
        ));
    }
    if version == SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS garments (
             id          TEXT PRIMARY KEY NOT NULL,
             category    TEXT NOT NULL,
             created_at  INTEGER NOT NULL,
             record_json TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_garments_category ON garments(category);
         CREATE INDEX IF NOT EXISTS idx_garments_created_at ON garments(created_at);
         PRAGMA user_version = 1;
         COMMIT;",
    )
    .map_err(|e| CatalogError::write("create catalog schema", e))?;

    info!("Catalog schema initialized");
    Ok(())
}

fn insert_record(conn: &Connection, record: &GarmentRecord) -> Result<()> {
    let json =
        serde_json::to_string(record).map_err(|e| CatalogError::write("serialize garment", e))?;
    conn.execute(
        "INSERT INTO garments (id, category, created_at, record_json) VALUES (?1, ?2, ?3, ?4)",
        params![
            record.id,
            record.fields.category,
            record.created_at.timestamp_micros(),
            json
        ],
    )
    .map_err(|e| CatalogError::write(format!("insert garment {}", record.id), e))?;
    Ok(())
}

/// Coordinate ids must be non-empty and unique within their garment
fn check_coordinate_ids(record: &GarmentRecord) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in &record.coordinates {
        if entry.id.is_empty() {
            return Err(CatalogError::write(
                format!("import garment {}", record.id),
                "coordinate with empty id",
            ));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(CatalogError::write(
                format!("import garment {}", record.id),
                format!("duplicate coordinate id {}", entry.id),
            ));
        }
    }
    Ok(())
}

fn load_record(conn: &Connection, id: &str) -> Result<Option<GarmentRecord>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT record_json FROM garments WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CatalogError::read("get garment", e))?;

    json.as_deref().map(decode_record).transpose()
}

fn query_records<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<GarmentRecord>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| CatalogError::read("prepare garment query", e))?;

    let rows = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(|e| CatalogError::read("query garments", e))?;

    let mut records = Vec::new();
    for json in rows {
        let json = json.map_err(|e| CatalogError::read("read garment row", e))?;
        records.push(decode_record(&json)?);
    }
    Ok(records)
}

fn decode_record(json: &str) -> Result<GarmentRecord> {
    serde_json::from_str(json).map_err(|e| CatalogError::read("decode garment", e))
}

/// A timestamp strictly after `previous`, even if the clock has not moved
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Default database location in the user's data directory:
/// - Linux: ~/.local/share/my-closet/my_closet.db
/// - macOS: ~/Library/Application Support/my-closet/my_closet.db
/// - Windows: %APPDATA%\my-closet\my_closet.db
pub fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| Path::new(".").to_path_buf());

    path.push("my-closet");
    path.push("my_closet.db");
    path
}
