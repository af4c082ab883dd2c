use super::task::TaskNode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A node waiting in the pending queue, with the number of attempts already spent on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub node: TaskNode,
    #[serde(default)]
    pub attempts: u32,
}

/// FIFO queue of pending tasks.
///
/// New work and retried work both join at the tail; `dependencies` on the
/// nodes never reorder it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskQueue {
    entries: VecDeque<QueuedTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<TaskNode>) -> Self {
        Self {
            entries: nodes
                .into_iter()
                .map(|node| QueuedTask { node, attempts: 0 })
                .collect(),
        }
    }

    /// Appends a never-attempted node
    pub fn push(&mut self, node: TaskNode) {
        self.push_attempted(node, 0);
    }

    /// Appends a node that already consumed `attempts` retries
    pub fn push_attempted(&mut self, node: TaskNode, attempts: u32) {
        self.entries.push_back(QueuedTask { node, attempts });
    }

    pub fn pop(&mut self) -> Option<QueuedTask> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&QueuedTask> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.node.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.node.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedTask> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SubgraphType;

    fn node(id: &str) -> TaskNode {
        TaskNode::new(id, SubgraphType::DbSearch, id)
    }

    #[test]
    fn pops_in_insertion_order() {
        let mut queue = TaskQueue::from_nodes(vec![node("a"), node("b")]);
        queue.push(node("c"));

        let order: Vec<String> = std::iter::from_fn(|| queue.pop())
            .map(|entry| entry.node.id)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn retried_entries_join_the_tail_with_their_attempts() {
        let mut queue = TaskQueue::from_nodes(vec![node("a"), node("b")]);
        let first = queue.pop().unwrap();
        queue.push_attempted(first.node, 1);

        assert_eq!(queue.ids(), vec!["b", "a"]);
        assert_eq!(queue.iter().last().unwrap().attempts, 1);
        assert!(queue.contains("a"));
    }

    #[test]
    fn serializes_as_a_plain_list() {
        let queue = TaskQueue::from_nodes(vec![node("a")]);
        let value = serde_json::to_value(&queue).unwrap();
        assert!(value.is_array());
        let back: TaskQueue = serde_json::from_value(value).unwrap();
        assert_eq!(back, queue);
    }
}
