//! Shared test fixtures: an in-memory storage backend, a text-wire codec,
//! and the sample domain used across the integration suite.
//!
//! The storage fake keeps rows in their wire form (UUIDs and timestamps as
//! text, booleans as integers), so every load/store path in the tests runs
//! through the codec the same way a SQL driver would.

#![allow(dead_code)]

use objectspace::prelude::*;
use objectspace::{
    ChangeSet, ClassDescriptor, EntityInstance, MetadataRegistry as Registry, Result, Row,
    StorageConnection, StorageError, StorageErrorKind, ValueCodec, expected_schema,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ----------------------------------------------------------------------
// codec
// ----------------------------------------------------------------------

/// Codec for a text-oriented store: UUIDs and timestamps travel as text,
/// booleans as 0/1 integers.
pub struct TextCodec;

impl TextCodec {
    /// The wire form a value is stored as.
    pub fn wire(value: &Value) -> Value {
        match value {
            Value::Uuid(id) => Value::Text(id.to_string()),
            Value::Timestamp(ts) => Value::Text(ts.to_rfc3339()),
            Value::Bool(b) => Value::Int(i64::from(*b)),
            other => other.clone(),
        }
    }
}

fn decode_error(field_type: &FieldType, raw: &Value) -> objectspace::Error {
    StorageError::new(
        StorageErrorKind::Decode,
        format!("cannot decode {} from {:?} value", type_label(field_type), raw.type_name()),
    )
    .into()
}

fn type_label(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Uuid => "uuid",
        FieldType::Text => "text",
        FieldType::Integer => "integer",
        FieldType::Double => "double",
        FieldType::Boolean => "boolean",
        FieldType::Timestamp => "timestamp",
        FieldType::Reference(_) => "reference",
        FieldType::List(_) => "list",
    }
}

impl ValueCodec for TextCodec {
    fn storage_type(&self, field_type: &FieldType, size: Option<u32>) -> String {
        match field_type {
            FieldType::Uuid | FieldType::Reference(_) => "CHAR(36)".to_string(),
            FieldType::Text => size.map_or_else(|| "TEXT".to_string(), |s| format!("VARCHAR({s})")),
            FieldType::Integer | FieldType::Boolean => "INTEGER".to_string(),
            FieldType::Double => "REAL".to_string(),
            FieldType::Timestamp => "TEXT".to_string(),
            FieldType::List(_) => String::new(),
        }
    }

    fn decode(&self, field_type: &FieldType, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match field_type {
            FieldType::Uuid | FieldType::Reference(_) => match raw {
                Value::Uuid(_) => Ok(raw.clone()),
                Value::Text(s) => s
                    .parse::<Uuid>()
                    .map(Value::Uuid)
                    .map_err(|_| decode_error(field_type, raw)),
                _ => Err(decode_error(field_type, raw)),
            },
            FieldType::Text => match raw {
                Value::Text(_) => Ok(raw.clone()),
                _ => Err(decode_error(field_type, raw)),
            },
            FieldType::Integer => match raw {
                Value::Int(_) => Ok(raw.clone()),
                _ => Err(decode_error(field_type, raw)),
            },
            FieldType::Double => match raw {
                Value::Double(_) => Ok(raw.clone()),
                Value::Int(i) => Ok(Value::Double(*i as f64)),
                _ => Err(decode_error(field_type, raw)),
            },
            FieldType::Boolean => match raw {
                Value::Bool(_) => Ok(raw.clone()),
                Value::Int(i) => Ok(Value::Bool(*i != 0)),
                _ => Err(decode_error(field_type, raw)),
            },
            FieldType::Timestamp => match raw {
                Value::Timestamp(_) => Ok(raw.clone()),
                Value::Text(s) => chrono::DateTime::parse_from_rfc3339(s)
                    .map(|ts| Value::Timestamp(ts.with_timezone(&chrono::Utc)))
                    .map_err(|_| decode_error(field_type, raw)),
                _ => Err(decode_error(field_type, raw)),
            },
            FieldType::List(_) => Err(decode_error(field_type, raw)),
        }
    }

    fn encode(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Timestamp(ts) => format!("'{}'", ts.to_rfc3339()),
            Value::Uuid(id) => format!("'{id}'"),
        }
    }
}

// ----------------------------------------------------------------------
// storage
// ----------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    tables: HashMap<String, BTreeMap<Uuid, Row>>,
    snapshot: Option<HashMap<String, BTreeMap<Uuid, Row>>>,
    fail_inserts: bool,
    inserts: usize,
    updates: usize,
}

/// In-memory storage backend with snapshot-based transactions.
///
/// Clones share state, so one handle can seed data while a session owns
/// another — the stand-in for two sessions over one database.
#[derive(Clone)]
pub struct MemoryStorage {
    registry: Arc<Registry>,
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            inner: Arc::new(Mutex::new(MemoryInner::default())),
        }
    }

    /// Make the next inserts fail (until cleared), for commit-failure tests.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.inner.lock().unwrap().fail_inserts = fail;
    }

    pub fn insert_count(&self) -> usize {
        self.inner.lock().unwrap().inserts
    }

    pub fn update_count(&self) -> usize {
        self.inner.lock().unwrap().updates
    }

    /// Number of stored rows in a table, soft-deleted included.
    pub fn row_count(&self, table: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    /// Rewrite criteria literals into their wire form so evaluation matches
    /// what an encoded statement would compare.
    fn wire_clause(clause: &WhereClause) -> WhereClause {
        match clause {
            WhereClause::Compare {
                property,
                operator,
                value,
            } => WhereClause::Compare {
                property: property.clone(),
                operator: *operator,
                value: TextCodec::wire(value),
            },
            WhereClause::Combine {
                left,
                right,
                operator,
            } => WhereClause::Combine {
                left: Box::new(Self::wire_clause(left)),
                right: Box::new(Self::wire_clause(right)),
                operator: *operator,
            },
        }
    }

    fn row_is_deleted(row: &Row) -> bool {
        row.get("deleted") == Value::Int(1)
    }
}

impl StorageConnection for MemoryStorage {
    fn connect(&mut self, _info: &ConnectionInfo) -> Result<()> {
        Ok(())
    }

    fn fetch_row(&mut self, class: &ClassDescriptor, id: Uuid) -> Result<Option<Row>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tables
            .get(class.storage_name())
            .and_then(|table| table.get(&id))
            .filter(|row| !Self::row_is_deleted(row))
            .cloned())
    }

    fn fetch_table(
        &mut self,
        class: &ClassDescriptor,
        clause: Option<&WhereClause>,
    ) -> Result<Vec<Row>> {
        let wired = clause.map(Self::wire_clause);
        let inner = self.inner.lock().unwrap();
        let Some(table) = inner.tables.get(class.storage_name()) else {
            return Ok(Vec::new());
        };
        Ok(table
            .values()
            .filter(|row| !Self::row_is_deleted(row))
            .filter(|row| {
                wired
                    .as_ref()
                    .is_none_or(|c| c.evaluate(&|name| row.get(name)))
            })
            .cloned()
            .collect())
    }

    fn begin_transaction(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.snapshot = Some(inner.tables.clone());
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        self.inner.lock().unwrap().snapshot = None;
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(snapshot) = inner.snapshot.take() {
            inner.tables = snapshot;
        }
        Ok(())
    }

    fn insert(&mut self, class: &ClassDescriptor, entity: &EntityInstance) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_inserts {
            return Err(StorageError::new(StorageErrorKind::Execute, "insert refused").into());
        }
        let id = entity.id().ok_or_else(|| {
            StorageError::new(StorageErrorKind::Execute, "entity has no primary key")
        })?;

        let mut row = Row::new();
        for property in class.value_properties() {
            let value = entity.get(property.name());
            if !value.is_null() {
                row.set(property.storage_name(), TextCodec::wire(&value));
            }
        }

        inner
            .tables
            .entry(class.storage_name().to_string())
            .or_default()
            .insert(id, row);
        inner.inserts += 1;
        Ok(())
    }

    fn update(&mut self, change: &ChangeSet) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .tables
            .get_mut(change.storage_name)
            .and_then(|table| table.get_mut(&change.id))
            .ok_or_else(|| {
                StorageError::new(
                    StorageErrorKind::Execute,
                    format!("no row '{}' in '{}'", change.id, change.storage_name),
                )
            })?;
        for (column, value) in &change.changes {
            row.set(*column, TextCodec::wire(value));
        }
        inner.updates += 1;
        Ok(())
    }

    fn execute(&mut self, _statement: &str) -> Result<()> {
        Ok(())
    }

    fn create_schema(&mut self) -> Result<()> {
        let expected = expected_schema(&self.registry)?;
        let mut inner = self.inner.lock().unwrap();
        for table in expected {
            inner.tables.entry(table.name).or_default();
        }
        Ok(())
    }

    fn update_schema(&mut self) -> Result<()> {
        Ok(())
    }
}

// ----------------------------------------------------------------------
// sample domain
// ----------------------------------------------------------------------

/// Register the sample domain: projects own tasks (nullable back-reference)
/// and milestones (NOT NULL back-reference); audits reference tasks
/// anonymously.
pub fn build_registry() -> Arc<Registry> {
    let mut registry = Registry::new(Arc::new(TextCodec));
    registry
        .register(
            EntityInfo::new("project")
                .property(PropertyInfo::new("name", FieldType::Text).size(120))
                .property(
                    PropertyInfo::new("tasks", FieldType::List("task")).association("project_tasks"),
                )
                .property(
                    PropertyInfo::new("milestones", FieldType::List("milestone"))
                        .association("project_milestones"),
                ),
        )
        .expect("register project");
    registry
        .register(
            EntityInfo::new("task")
                .property(PropertyInfo::new("title", FieldType::Text))
                .property(PropertyInfo::new("hours", FieldType::Integer))
                .property(PropertyInfo::new("done", FieldType::Boolean))
                .property(
                    PropertyInfo::new("project", FieldType::Reference("project"))
                        .association("project_tasks"),
                ),
        )
        .expect("register task");
    registry
        .register(
            EntityInfo::new("milestone")
                .property(PropertyInfo::new("label", FieldType::Text))
                .property(
                    PropertyInfo::new("project", FieldType::Reference("project"))
                        .association("project_milestones")
                        .not_null(true),
                ),
        )
        .expect("register milestone");
    registry
        .register(
            EntityInfo::new("audit")
                .property(PropertyInfo::new("note", FieldType::Text))
                .property(PropertyInfo::new("subject", FieldType::Reference("task"))),
        )
        .expect("register audit");
    registry.resolve_associations().expect("resolve associations");
    Arc::new(registry)
}

/// A fresh registry + storage pair with the schema created.
pub fn build_stack() -> (Arc<Registry>, MemoryStorage) {
    let registry = build_registry();
    let mut storage = MemoryStorage::new(Arc::clone(&registry));
    storage.connect(&ConnectionInfo::new("memory://fixture")).unwrap();
    storage.create_schema().unwrap();
    (registry, storage)
}

/// Open a session over a clone of the given storage handle.
pub fn open_space(
    registry: &Arc<Registry>,
    storage: &MemoryStorage,
) -> ObjectSpace<MemoryStorage> {
    ObjectSpace::new(storage.clone(), Arc::clone(registry)).expect("open session")
}
