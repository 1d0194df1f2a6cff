/// 订阅注册表
/// 
/// 维护 主题 -> 连接集合 与 连接 -> 主题集合 两个互相一致的索引。
/// 所有修改都在同一把写锁内完成，快照读取不会看到只更新了一半的索引

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::connection::{Connection, ConnectionId};

/// 推送主题
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 单个机器人的状态更新
    Robot(Uuid),
    /// 全车队摘要
    Fleet,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Robot(id) => write!(f, "robot:{}", id),
            Topic::Fleet => write!(f, "fleet"),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryIndex {
    subscribers: HashMap<Topic, HashMap<ConnectionId, Arc<Connection>>>,
    subscriptions: HashMap<ConnectionId, HashSet<Topic>>,
}

impl RegistryIndex {
    fn insert(&mut self, connection: &Arc<Connection>, topic: Topic) -> bool {
        let id = connection.id();
        let added = self
            .subscribers
            .entry(topic)
            .or_default()
            .insert(id, connection.clone())
            .is_none();
        self.subscriptions.entry(id).or_default().insert(topic);
        added
    }

    /// 移除连接的全部订阅，并清理变空的主题
    fn remove(&mut self, id: ConnectionId) -> usize {
        let Some(topics) = self.subscriptions.remove(&id) else {
            return 0;
        };

        for topic in &topics {
            if let Some(connections) = self.subscribers.get_mut(topic) {
                connections.remove(&id);
                if connections.is_empty() {
                    self.subscribers.remove(topic);
                }
            }
        }
        topics.len()
    }

    fn subscriber_count(&self, topic: &Topic) -> usize {
        self.subscribers.get(topic).map_or(0, HashMap::len)
    }

    #[cfg(test)]
    fn is_consistent(&self) -> bool {
        let forward = self.subscribers.iter().all(|(topic, connections)| {
            !connections.is_empty()
                && connections.keys().all(|id| {
                    self.subscriptions
                        .get(id)
                        .is_some_and(|topics| topics.contains(topic))
                })
        });
        let backward = self.subscriptions.iter().all(|(id, topics)| {
            !topics.is_empty()
                && topics.iter().all(|topic| {
                    self.subscribers
                        .get(topic)
                        .is_some_and(|connections| connections.contains_key(id))
                })
        });
        forward && backward
    }
}

/// 订阅注册表
/// 
/// 显式构造后注入到会话处理与分发调用处，克隆共享同一份索引
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    index: Arc<RwLock<RegistryIndex>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册订阅，重复注册为空操作
    /// 
    /// 已进入 Closing/Closed 的连接不会被注册，返回 false
    pub async fn register(&self, connection: &Arc<Connection>, topic: Topic) -> bool {
        self.register_then(connection, topic, |_| ()).await.is_some()
    }

    /// 注册订阅，并在仍持有写锁时以该主题当前订阅数调用 `on_registered`
    /// 
    /// 会话借此在任何广播之前排入初始快照
    pub async fn register_then<T, F>(
        &self,
        connection: &Arc<Connection>,
        topic: Topic,
        on_registered: F,
    ) -> Option<T>
    where
        F: FnOnce(usize) -> T,
    {
        let mut index = self.index.write().await;
        if !connection.is_accepting() {
            debug!("连接 {} 已在关闭，拒绝订阅 {}", connection.id(), topic);
            return None;
        }

        if index.insert(connection, topic) {
            debug!("连接 {} 已订阅 {}", connection.id(), topic);
        }
        Some(on_registered(index.subscriber_count(&topic)))
    }

    /// 注销连接的全部订阅，可重复调用
    pub async fn deregister(&self, connection_id: ConnectionId) -> bool {
        let mut index = self.index.write().await;
        let removed = index.remove(connection_id);
        if removed > 0 {
            debug!("连接 {} 已注销 {} 个订阅", connection_id, removed);
        }
        removed > 0
    }

    /// 一次性注销多个连接，返回实际被移除的连接数
    pub async fn deregister_all(&self, connection_ids: &[ConnectionId]) -> usize {
        let mut index = self.index.write().await;
        connection_ids
            .iter()
            .filter(|id| index.remove(**id) > 0)
            .count()
    }

    /// 主题当前订阅者的快照
    pub async fn subscribers_of(&self, topic: &Topic) -> Vec<Arc<Connection>> {
        let index = self.index.read().await;
        index
            .subscribers
            .get(topic)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 指定主题的订阅数；不指定主题时返回去重后的连接总数
    pub async fn count(&self, topic: Option<&Topic>) -> usize {
        let index = self.index.read().await;
        match topic {
            Some(topic) => index.subscriber_count(topic),
            None => index.subscriptions.len(),
        }
    }

    /// 连接当前订阅的主题
    pub async fn topics_of(&self, connection_id: ConnectionId) -> Vec<Topic> {
        let index = self.index.read().await;
        index
            .subscriptions
            .get(&connection_id)
            .map(|topics| topics.iter().copied().collect())
            .unwrap_or_default()
    }

    /// 有订阅者的主题数
    pub async fn topic_count(&self) -> usize {
        let index = self.index.read().await;
        index.subscribers.len()
    }

    #[cfg(test)]
    async fn is_consistent(&self) -> bool {
        self.index.read().await.is_consistent()
    }
}
