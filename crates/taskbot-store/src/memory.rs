//! In-process stand-in for the PostgREST store.
//!
//! Generates keys and timestamps the way the database defaults do, seeds the
//! status table, and enforces the foreign keys the real schema declares.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use taskbot_shared::{default_member_role, TaskStatus, DEFAULT_PRIORITY, INITIAL_STATUS_ID};

use crate::backend::{Backend, PROJECTS, PROJECT_MEMBERS, TASKS, TASK_COMMENTS, TASK_STATUSES, USERS};
use crate::error::StoreError;
use crate::query::Query;

/// (table, column, referenced table, referenced key)
const FOREIGN_KEYS: [(&str, &str, &str, &str); 5] = [
    (TASKS, "project_id", PROJECTS, "project_id"),
    (TASKS, "status_id", TASK_STATUSES, "status_id"),
    (TASK_COMMENTS, "task_id", TASKS, "task_id"),
    (PROJECT_MEMBERS, "project_id", PROJECTS, "project_id"),
    (PROJECT_MEMBERS, "user_id", USERS, "user_id"),
];

fn primary_key(table: &str) -> &'static [&'static str] {
    match table {
        USERS => &["user_id"],
        PROJECTS => &["project_id"],
        TASKS => &["task_id"],
        TASK_STATUSES => &["status_id"],
        TASK_COMMENTS => &["comment_id"],
        PROJECT_MEMBERS => &["project_id", "user_id"],
        _ => &[],
    }
}

/// Key column filled from a sequence when an insert omits it.
fn generated_key(table: &str) -> Option<&'static str> {
    match table {
        PROJECTS => Some("project_id"),
        TASKS => Some("task_id"),
        TASK_STATUSES => Some("status_id"),
        TASK_COMMENTS => Some("comment_id"),
        _ => None,
    }
}

fn timestamp_columns(table: &str) -> &'static [&'static str] {
    match table {
        USERS => &["registered_at"],
        PROJECTS => &["created_at"],
        TASKS => &["created_at", "updated_at"],
        TASK_COMMENTS => &["created_at"],
        _ => &[],
    }
}

struct MemoryState {
    tables: HashMap<&'static str, Vec<Value>>,
    sequences: HashMap<&'static str, i64>,
    last_timestamp: DateTime<Utc>,
}

impl MemoryState {
    fn rows(&self, table: &str) -> &[Value] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn next_id(&mut self, table: &'static str) -> i64 {
        let next = self.sequences.entry(table).or_insert(0);
        *next += 1;
        *next
    }

    /// Strictly increasing, so creation order survives a sort on timestamps.
    fn next_timestamp(&mut self) -> String {
        let now = Utc::now();
        self.last_timestamp = if now > self.last_timestamp {
            now
        } else {
            self.last_timestamp + Duration::microseconds(1)
        };
        self.last_timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn check_foreign_keys(&self, table: &str, row: &Map<String, Value>) -> Result<(), StoreError> {
        for (fk_table, column, referenced, key) in FOREIGN_KEYS {
            if fk_table != table {
                continue;
            }
            let Some(value) = row.get(column).filter(|value| !value.is_null()) else {
                continue;
            };
            let exists = self
                .rows(referenced)
                .iter()
                .any(|candidate| Query::table(referenced).eq(key, value.clone()).matches(candidate));
            if !exists {
                return Err(conflict(format!(
                    "insert or update on table \"{}\" violates foreign key constraint on \"{}\"",
                    table, column
                )));
            }
        }
        Ok(())
    }

    fn check_unique(&self, table: &str, row: &Map<String, Value>) -> Result<(), StoreError> {
        let key = primary_key(table);
        if key.is_empty() {
            return Ok(());
        }
        let duplicate = self.rows(table).iter().any(|existing| {
            key.iter()
                .all(|column| existing.get(*column) == row.get(*column))
        });
        if duplicate {
            return Err(conflict(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                table
            )));
        }
        Ok(())
    }
}

fn conflict(body: String) -> StoreError {
    StoreError::Status { status: 409, body }
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    requests: AtomicUsize,
    available: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Empty store with the status table seeded.
    pub fn new() -> Self {
        let statuses: Vec<Value> = TaskStatus::seed()
            .iter()
            .map(|status| {
                json!({
                    "status_id": status.status_id,
                    "name": status.name,
                    "order_index": status.order_index,
                })
            })
            .collect();

        let mut sequences = HashMap::new();
        sequences.insert(TASK_STATUSES, statuses.len() as i64);

        let mut tables = HashMap::new();
        tables.insert(TASK_STATUSES, statuses);

        Self {
            state: Mutex::new(MemoryState {
                tables,
                sequences,
                last_timestamp: DateTime::<Utc>::MIN_UTC,
            }),
            requests: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Number of select/insert/update calls served, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Simulate the store going down (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of a table's rows, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().rows(table).to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(self.lock())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let state = self.begin()?;
        let matched = state
            .rows(query.table_name())
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect();
        Ok(query.shape(matched))
    }

    async fn insert(&self, table: &'static str, row: Value) -> Result<Vec<Value>, StoreError> {
        let mut state = self.begin()?;

        let Value::Object(mut row) = row else {
            return Err(StoreError::Status {
                status: 400,
                body: "insert body must be a JSON object".to_string(),
            });
        };

        if let Some(key) = generated_key(table) {
            if row.get(key).map_or(true, Value::is_null) {
                let id = state.next_id(table);
                row.insert(key.to_string(), json!(id));
            }
        }

        let columns = timestamp_columns(table);
        if !columns.is_empty() {
            let now = state.next_timestamp();
            for column in columns {
                if row.get(*column).map_or(true, Value::is_null) {
                    row.insert(column.to_string(), Value::String(now.clone()));
                }
            }
        }

        if table == PROJECT_MEMBERS && row.get("role_in_project").map_or(true, Value::is_null) {
            row.insert("role_in_project".to_string(), json!(default_member_role()));
        }

        if table == TASKS {
            if row.get("status_id").map_or(true, Value::is_null) {
                row.insert("status_id".to_string(), json!(INITIAL_STATUS_ID));
            }
            if row.get("priority").map_or(true, Value::is_null) {
                row.insert("priority".to_string(), json!(DEFAULT_PRIORITY));
            }
        }

        state.check_unique(table, &row)?;
        state.check_foreign_keys(table, &row)?;

        let row = Value::Object(row);
        state.tables.entry(table).or_default().push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError> {
        let mut state = self.begin()?;
        let table = query.table_name();

        let Value::Object(patch) = patch else {
            return Err(StoreError::Status {
                status: 400,
                body: "patch body must be a JSON object".to_string(),
            });
        };

        state.check_foreign_keys(table, &patch)?;

        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| query.matches(row)) {
                if let Value::Object(fields) = row {
                    for (column, value) in &patch {
                        fields.insert(column.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        Ok(updated)
    }
}
