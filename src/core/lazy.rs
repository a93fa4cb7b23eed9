//! 子 Agent 延迟初始化槽位
//!
//! 每个子节点是一个显式的 `Uninitialized | Ready(node)` 状态；`ensure_ready` 幂等，
//! 节点生命周期内每个槽位最多真正构造一次。

use crate::core::AgentError;

/// 子节点槽位
#[derive(Debug, Default)]
pub enum ChildSlot<T> {
    #[default]
    Uninitialized,
    Ready(T),
}

impl<T> ChildSlot<T> {
    pub fn new() -> Self {
        ChildSlot::Uninitialized
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ChildSlot::Ready(_))
    }

    /// 未初始化时调用 build 构造；已就绪则原样保留
    pub fn ensure_ready<F>(&mut self, build: F) -> Result<&mut T, AgentError>
    where
        F: FnOnce() -> Result<T, AgentError>,
    {
        if !self.is_ready() {
            *self = ChildSlot::Ready(build()?);
        }
        match self {
            ChildSlot::Ready(node) => Ok(node),
            ChildSlot::Uninitialized => Err(AgentError::InvalidInput(
                "child slot not initialized".to_string(),
            )),
        }
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            ChildSlot::Ready(node) => Some(node),
            ChildSlot::Uninitialized => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            ChildSlot::Ready(node) => Some(node),
            ChildSlot::Uninitialized => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_starts_uninitialized() {
        let slot: ChildSlot<u32> = ChildSlot::new();
        assert!(!slot.is_ready());
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_ensure_ready_builds_once() {
        let mut slot = ChildSlot::new();
        let mut builds = 0;
        for _ in 0..3 {
            slot.ensure_ready(|| {
                builds += 1;
                Ok(format!("node-{builds}"))
            })
            .unwrap();
        }
        assert_eq!(builds, 1);
        assert_eq!(slot.get().map(String::as_str), Some("node-1"));
    }

    #[test]
    fn test_failed_build_stays_uninitialized() {
        let mut slot: ChildSlot<u32> = ChildSlot::new();
        let result = slot.ensure_ready(|| Err(AgentError::InvalidInput("boom".into())));
        assert!(result.is_err());
        assert!(!slot.is_ready());
        assert_eq!(*slot.ensure_ready(|| Ok(7)).unwrap(), 7);
    }
}
