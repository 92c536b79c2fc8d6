use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use vigil_core::{Contact, Incident, IncidentRow, IncidentStatus};

const INCIDENT_COLUMNS: &str =
    "id, severity, components, started_at, updated_at, status, description, document_id";

/// SQLite-backed state shared by every handler. The connection sits behind a
/// mutex so background work can use the same store; SQLite itself serializes
/// writers.
pub struct BotStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl BotStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("store connection lock poisoned"))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
              version INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        apply_migration(
            &conn,
            1,
            "base_tables",
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              severity INTEGER NOT NULL CHECK (severity BETWEEN 1 AND 5),
              components TEXT NOT NULL,
              started_at TEXT NOT NULL,
              updated_at TEXT NOT NULL,
              status TEXT NOT NULL,
              description TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS topics (
              channel TEXT PRIMARY KEY,
              topic TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS acls (
              command TEXT NOT NULL,
              identifier TEXT NOT NULL,
              PRIMARY KEY (command, identifier)
            );

            CREATE TABLE IF NOT EXISTS contacts (
              name TEXT PRIMARY KEY,
              phone TEXT NOT NULL,
              email TEXT NOT NULL
            );
            "#,
        )?;

        apply_migration(
            &conn,
            2,
            "incident_documents",
            r#"
            ALTER TABLE incidents ADD COLUMN document_id TEXT;
            "#,
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status)",
            [],
        )?;
        Ok(())
    }

    /// Upserts keyed on the incident id. A fresh incident gets its id from the
    /// insert; an update that finds no row re-inserts under the same id.
    pub fn save_incident(&self, incident: &mut Incident) -> Result<()> {
        incident.touch(Utc::now());
        let row = incident.to_row();
        let conn = self.conn()?;

        if incident.is_persisted() {
            let changed = conn
                .execute(
                    "UPDATE incidents
                     SET severity = ?1, components = ?2, updated_at = ?3, status = ?4,
                         description = ?5, document_id = ?6
                     WHERE id = ?7",
                    params![
                        row.severity,
                        row.components,
                        row.updated_at,
                        row.status,
                        row.description,
                        row.document_id,
                        row.id
                    ],
                )
                .with_context(|| format!("failed to update incident #{}", row.id))?;
            if changed > 0 {
                return Ok(());
            }
            debug!(incident_id = row.id, "incident row missing on update, inserting");
            conn.execute(
                "INSERT INTO incidents
                 (id, severity, components, started_at, updated_at, status, description, document_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.severity,
                    row.components,
                    row.started_at,
                    row.updated_at,
                    row.status,
                    row.description,
                    row.document_id
                ],
            )
            .with_context(|| format!("failed to re-insert incident #{}", row.id))?;
            return Ok(());
        }

        conn.execute(
            "INSERT INTO incidents
             (severity, components, started_at, updated_at, status, description, document_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.severity,
                row.components,
                row.started_at,
                row.updated_at,
                row.status,
                row.description,
                row.document_id
            ],
        )
        .with_context(|| "failed to insert incident")?;
        incident.set_id(conn.last_insert_rowid());
        Ok(())
    }

    pub fn get_incident(&self, id: i64) -> Result<Option<Incident>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
                params![id],
                incident_row,
            )
            .optional()?;
        row.map(Incident::from_row)
            .transpose()
            .with_context(|| format!("incident #{id} is corrupt"))
    }

    pub fn open_incidents(&self) -> Result<Vec<Incident>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE status = ?1 ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![IncidentStatus::Open.as_str()], incident_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|row| {
                let id = row.id;
                Incident::from_row(row).with_context(|| format!("incident #{id} is corrupt"))
            })
            .collect()
    }

    pub fn get_topic(&self, channel: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let topic = conn
            .query_row(
                "SELECT topic FROM topics WHERE channel = ?1",
                params![channel],
                |row| row.get(0),
            )
            .optional()?;
        Ok(topic)
    }

    pub fn save_topic(&self, channel: &str, topic: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO topics (channel, topic) VALUES (?1, ?2)
                 ON CONFLICT(channel) DO UPDATE SET topic = excluded.topic",
                params![channel, topic],
            )
            .with_context(|| format!("failed to save topic for {channel}"))?;
        Ok(())
    }

    pub fn remove_topic(&self, channel: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM topics WHERE channel = ?1", params![channel])?;
        Ok(changed > 0)
    }

    pub fn acl_identifiers(&self, command: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT identifier FROM acls WHERE command = ?1 ORDER BY identifier")?;
        let rows = stmt.query_map(params![command], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    pub fn acl_exists(&self, command: &str, identifier: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT 1 FROM acls WHERE command = ?1 AND identifier = ?2 LIMIT 1")?;
        let mut rows = stmt.query(params![command, identifier])?;
        Ok(rows.next()?.is_some())
    }

    pub fn insert_acl(&self, command: &str, identifier: &str) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO acls (command, identifier) VALUES (?1, ?2)",
                params![command, identifier],
            )
            .with_context(|| format!("failed to add acl {command}/{identifier}"))?;
        Ok(())
    }

    pub fn delete_acl(&self, command: &str, identifier: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "DELETE FROM acls WHERE command = ?1 AND identifier = ?2",
                params![command, identifier],
            )
            .with_context(|| format!("failed to remove acl {command}/{identifier}"))?;
        Ok(changed > 0)
    }

    pub fn get_contact(&self, name: &str) -> Result<Option<Contact>> {
        let conn = self.conn()?;
        let contact = conn
            .query_row(
                "SELECT name, phone, email FROM contacts WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Contact {
                        name: row.get(0)?,
                        phone: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(contact)
    }

    pub fn save_contact(&self, contact: &Contact) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO contacts (name, phone, email) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET phone = excluded.phone, email = excluded.email",
                params![contact.name, contact.phone, contact.email],
            )
            .with_context(|| format!("failed to save contact {}", contact.name))?;
        Ok(())
    }

    pub fn remove_contact(&self, name: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM contacts WHERE name = ?1", params![name])
            .with_context(|| format!("failed to remove contact {name}"))?;
        Ok(changed > 0)
    }
}

fn incident_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IncidentRow> {
    Ok(IncidentRow {
        id: row.get(0)?,
        severity: row.get(1)?,
        components: row.get(2)?,
        started_at: row.get(3)?,
        updated_at: row.get(4)?,
        status: row.get(5)?,
        description: row.get(6)?,
        document_id: row.get(7)?,
    })
}

fn apply_migration(conn: &Connection, version: i64, name: &str, sql: &str) -> Result<()> {
    let applied = conn
        .query_row(
            "SELECT 1 FROM schema_migrations WHERE version = ?1 LIMIT 1",
            params![version],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if applied {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    for raw in sql.split(';') {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        tx.execute(trimmed, [])
            .with_context(|| format!("migration {version} ({name}) failed"))?;
    }
    tx.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
        params![version, name],
    )?;
    tx.commit()?;
    debug!(version, name, "applied schema migration");
    Ok(())
}
