//! SQLite Memory Store
//!
//! 单文件数据库，所有 Agent 共享，按 agent_id 分区。连接由 Mutex 保护，写入天然串行化。
//! 建表失败属于致命初始化错误（StorageInit），由启动流程决定是否终止进程。

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::core::AgentError;
use crate::memory::store::{decode_value, encode_value, now_timestamp, MemoryStore};
use crate::memory::{Role, StoredMessage};

pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
}

impl SqliteMemoryStore {
    /// 打开（或创建）数据库文件；父目录不存在时自动创建
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AgentError::StorageInit(e.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(|e| AgentError::StorageInit(e.to_string()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, AgentError> {
        let conn =
            Connection::open_in_memory().map_err(|e| AgentError::StorageInit(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, AgentError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp REAL NOT NULL,
                metadata TEXT
            );
            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                timestamp REAL NOT NULL,
                metadata TEXT,
                UNIQUE (agent_id, key)
            );
            CREATE INDEX IF NOT EXISTS idx_messages_agent_id ON messages (agent_id);
            CREATE INDEX IF NOT EXISTS idx_memories_agent_id ON memories (agent_id);",
        )
        .map_err(|e| AgentError::StorageInit(e.to_string()))?;
        tracing::debug!("SQLite memory store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AgentError> {
        self.conn
            .lock()
            .map_err(|e| AgentError::Storage(format!("connection lock poisoned: {e}")))
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn append_message(
        &self,
        agent_id: &str,
        role: Role,
        content: &str,
        timestamp: f64,
    ) -> Result<String, AgentError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn()?.execute(
            "INSERT INTO messages (id, agent_id, role, content, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, '{}')",
            params![id, agent_id, role.as_str(), content, timestamp],
        )?;
        Ok(id)
    }

    fn get_messages(
        &self,
        agent_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, AgentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, role, content, timestamp, metadata FROM messages
             WHERE agent_id = ?1
             ORDER BY timestamp DESC, rowid DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt.query_map(params![agent_id, limit as i64, offset as i64], |row| {
            let role: String = row.get(1)?;
            let metadata: Option<String> = row.get(4)?;
            Ok(StoredMessage {
                id: row.get(0)?,
                role: Role::parse(&role),
                content: row.get(2)?,
                timestamp: row.get(3)?,
                metadata: metadata
                    .and_then(|m| serde_json::from_str(&m).ok())
                    .unwrap_or_else(|| Value::Object(Default::default())),
            })
        })?;
        let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    fn set_value(
        &self,
        agent_id: &str,
        key: &str,
        value: &Value,
        metadata: &Value,
    ) -> Result<String, AgentError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn()?.execute(
            "INSERT INTO memories (id, agent_id, key, value, timestamp, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (agent_id, key) DO UPDATE SET
                id = excluded.id,
                value = excluded.value,
                timestamp = excluded.timestamp,
                metadata = excluded.metadata",
            params![
                id,
                agent_id,
                key,
                encode_value(value),
                now_timestamp(),
                metadata.to_string()
            ],
        )?;
        Ok(id)
    }

    fn get_value(&self, agent_id: &str, key: &str) -> Result<Option<Value>, AgentError> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM memories WHERE agent_id = ?1 AND key = ?2",
                params![agent_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|r| decode_value(&r)))
    }

    fn delete_value(&self, agent_id: &str, key: &str) -> Result<bool, AgentError> {
        let affected = self.conn()?.execute(
            "DELETE FROM memories WHERE agent_id = ?1 AND key = ?2",
            params![agent_id, key],
        )?;
        Ok(affected > 0)
    }

    fn list_values(&self, agent_id: &str) -> Result<BTreeMap<String, Value>, AgentError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM memories WHERE agent_id = ?1")?;
        let rows = stmt.query_map(params![agent_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut values = BTreeMap::new();
        for row in rows {
            let (key, raw) = row?;
            values.insert(key, decode_value(&raw));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_open_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nekos_storage.db");
        let store = SqliteMemoryStore::open(&path).unwrap();
        store.append_message("a", Role::User, "hi", 1.0).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let store = SqliteMemoryStore::open(&path).unwrap();
            store.append_message("a", Role::Assistant, "saved", 1.0).unwrap();
            store.set_value("a", "k", &json!({"n": 1}), &json!({})).unwrap();
        }
        let store = SqliteMemoryStore::open(&path).unwrap();
        let messages = store.get_messages("a", 10, 0).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(store.get_value("a", "k").unwrap(), Some(json!({"n": 1})));
    }

    #[test]
    fn test_messages_order_and_isolation() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.append_message("a", Role::User, "first", 1.0).unwrap();
        store.append_message("a", Role::Assistant, "second", 2.0).unwrap();
        store.append_message("a", Role::User, "third", 3.0).unwrap();
        store.append_message("b", Role::User, "other", 4.0).unwrap();

        let latest: Vec<String> = store
            .get_messages("a", 2, 0)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(latest, vec!["second", "third"]);
        assert!(store
            .get_messages("a", 10, 0)
            .unwrap()
            .iter()
            .all(|m| m.content != "other"));
    }

    #[test]
    fn test_value_roundtrip_raw_text_preserved() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.set_value("a", "note", &json!("not json"), &json!({})).unwrap();
        assert_eq!(store.get_value("a", "note").unwrap(), Some(json!("not json")));

        store.set_value("a", "note", &json!([1, 2, 3]), &json!({})).unwrap();
        assert_eq!(store.get_value("a", "note").unwrap(), Some(json!([1, 2, 3])));
        assert_eq!(store.list_values("a").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_value() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        assert!(!store.delete_value("a", "missing").unwrap());
        store.set_value("a", "k", &json!(true), &json!({})).unwrap();
        assert!(store.delete_value("a", "k").unwrap());
        assert_eq!(store.get_value("a", "k").unwrap(), None);
    }
}
