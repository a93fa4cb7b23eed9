//! Memory Store 抽象
//!
//! 按 Agent 身份分区：有序的对话记录 + 命名值（同 key 后写覆盖）。
//! 值以序列化文本存储，读取时尝试反序列化为 JSON，失败则原样返回文本。
//! Memory Store 句柄在构造时显式注入每个节点，不做全局单例。

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value;

use crate::core::AgentError;
use crate::memory::{Role, StoredMessage};

/// Memory Store 接口（写入串行化，读取可并发）
pub trait MemoryStore: Send + Sync {
    /// 追加一轮对话，返回消息 id
    fn append_message(
        &self,
        agent_id: &str,
        role: Role,
        content: &str,
        timestamp: f64,
    ) -> Result<String, AgentError>;

    /// 取最近 limit 条（跳过最新的 offset 条），按时间升序返回
    fn get_messages(
        &self,
        agent_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, AgentError>;

    /// 写入命名值，返回值记录 id
    fn set_value(
        &self,
        agent_id: &str,
        key: &str,
        value: &Value,
        metadata: &Value,
    ) -> Result<String, AgentError>;

    fn get_value(&self, agent_id: &str, key: &str) -> Result<Option<Value>, AgentError>;

    fn delete_value(&self, agent_id: &str, key: &str) -> Result<bool, AgentError>;

    fn list_values(&self, agent_id: &str) -> Result<BTreeMap<String, Value>, AgentError>;
}

/// 值序列化：字符串原样存储，其余转 JSON 文本
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 值反序列化：JSON 解析失败时返回原始文本
pub fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// 当前 Unix 时间（秒，含小数）
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Default)]
struct Partition {
    messages: Vec<StoredMessage>,
    /// key -> (value id, 序列化文本)
    values: HashMap<String, (String, String)>,
}

/// 进程内 Memory Store（测试与 `storage.backend = "memory"` 使用）
#[derive(Debug, Default)]
pub struct InMemoryStore {
    partitions: Mutex<HashMap<String, Partition>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_partitions<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Partition>) -> R,
    ) -> Result<R, AgentError> {
        let mut guard = self
            .partitions
            .lock()
            .map_err(|e| AgentError::Storage(format!("memory store lock poisoned: {e}")))?;
        Ok(f(&mut guard))
    }
}

impl MemoryStore for InMemoryStore {
    fn append_message(
        &self,
        agent_id: &str,
        role: Role,
        content: &str,
        timestamp: f64,
    ) -> Result<String, AgentError> {
        let id = uuid::Uuid::new_v4().to_string();
        let message = StoredMessage {
            id: id.clone(),
            role,
            content: content.to_string(),
            timestamp,
            metadata: Value::Object(Default::default()),
        };
        self.with_partitions(|p| {
            p.entry(agent_id.to_string())
                .or_default()
                .messages
                .push(message)
        })?;
        Ok(id)
    }

    fn get_messages(
        &self,
        agent_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>, AgentError> {
        self.with_partitions(|p| {
            let Some(partition) = p.get(agent_id) else {
                return Vec::new();
            };
            // 插入顺序作为同一时间戳的次序
            let mut indexed: Vec<(usize, &StoredMessage)> =
                partition.messages.iter().enumerate().collect();
            indexed.sort_by(|(ia, a), (ib, b)| {
                b.timestamp
                    .partial_cmp(&a.timestamp)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(ib.cmp(ia))
            });
            let mut page: Vec<StoredMessage> = indexed
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|(_, m)| m.clone())
                .collect();
            page.reverse();
            page
        })
    }

    fn set_value(
        &self,
        agent_id: &str,
        key: &str,
        value: &Value,
        _metadata: &Value,
    ) -> Result<String, AgentError> {
        let id = uuid::Uuid::new_v4().to_string();
        let encoded = encode_value(value);
        self.with_partitions(|p| {
            p.entry(agent_id.to_string())
                .or_default()
                .values
                .insert(key.to_string(), (id.clone(), encoded));
        })?;
        Ok(id)
    }

    fn get_value(&self, agent_id: &str, key: &str) -> Result<Option<Value>, AgentError> {
        self.with_partitions(|p| {
            p.get(agent_id)
                .and_then(|part| part.values.get(key))
                .map(|(_, raw)| decode_value(raw))
        })
    }

    fn delete_value(&self, agent_id: &str, key: &str) -> Result<bool, AgentError> {
        self.with_partitions(|p| {
            p.get_mut(agent_id)
                .map(|part| part.values.remove(key).is_some())
                .unwrap_or(false)
        })
    }

    fn list_values(&self, agent_id: &str) -> Result<BTreeMap<String, Value>, AgentError> {
        self.with_partitions(|p| {
            p.get(agent_id)
                .map(|part| {
                    part.values
                        .iter()
                        .map(|(k, (_, raw))| (k.clone(), decode_value(raw)))
                        .collect()
                })
                .unwrap_or_default()
        })
    }
}
