//! Ordered command queue

use crate::command::Command;
use serde_json::Value;
use std::fmt;
use tether_core::Options;

/// Position of a command at the time it was added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

impl CommandId {
    /// Index in the queue when the command was added
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered, mutable list of commands
///
/// Keeps track of the most recently appended or inserted command so it
/// can be patched after the fact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandQueue {
    commands: Vec<Command>,
    last_appended: Option<usize>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command at the end
    pub fn append(&mut self, name: impl Into<String>, args: Options, remove_empty: bool) -> CommandId {
        let mut command = Command::new(name, args);
        if remove_empty {
            command.remove_empty_args();
        }
        self.push(command)
    }

    /// Append an already built command
    pub fn push(&mut self, command: Command) -> CommandId {
        self.commands.push(command);
        let index = self.commands.len() - 1;
        self.last_appended = Some(index);
        CommandId(index)
    }

    /// Insert a command `n` positions before the end
    ///
    /// Returns `None` and leaves the queue untouched when `n` exceeds the
    /// queue length.
    pub fn insert_before(
        &mut self,
        name: impl Into<String>,
        args: Options,
        n: usize,
    ) -> Option<CommandId> {
        let index = self.commands.len().checked_sub(n)?;
        self.commands.insert(index, Command::new(name, args));
        self.last_appended = Some(index);
        Some(CommandId(index))
    }

    /// Mutate the most recently appended or inserted command
    ///
    /// Returns `false` when there is no such command.
    pub fn patch_last<F>(&mut self, mutation: F) -> bool
    where
        F: FnOnce(&mut Command),
    {
        match self.last_appended.and_then(|i| self.commands.get_mut(i)) {
            Some(command) => {
                mutation(command);
                true
            }
            None => false,
        }
    }

    /// Tag the last command with a component
    pub fn bind_last(&mut self, name: impl Into<String>, item: Option<String>) -> bool {
        let name = name.into();
        self.patch_last(|command| command.set_component(name, item))
    }

    /// Set an option on the last command
    pub fn set_last_option(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        self.patch_last(|command| command.set_option(key, value))
    }

    /// Concatenate another queue, before or after this one's commands
    ///
    /// Commands are not merged with each other.
    pub fn merge(&mut self, other: CommandQueue, before: bool) {
        if other.commands.is_empty() {
            return;
        }

        let added = other.commands.len();
        if before {
            let mut commands = other.commands;
            commands.append(&mut self.commands);
            self.commands = commands;
            self.last_appended = Some(match self.last_appended {
                Some(index) => index + added,
                None => added - 1,
            });
        } else {
            self.commands.extend(other.commands);
            self.last_appended = Some(self.commands.len() - 1);
        }
    }

    /// Command by id
    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.commands.get(id.0)
    }

    /// Most recently appended or inserted command
    pub fn last_appended(&self) -> Option<&Command> {
        self.last_appended.and_then(|i| self.commands.get(i))
    }

    /// Final command of the queue, for adjacency merging
    pub(crate) fn tail_mut(&mut self) -> Option<&mut Command> {
        self.commands.last_mut()
    }

    /// Mark the final command as the last appended one, after merging into it
    pub(crate) fn touch_tail(&mut self) -> Option<CommandId> {
        let index = self.commands.len().checked_sub(1)?;
        self.last_appended = Some(index);
        Some(CommandId(index))
    }

    /// All commands in order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Iterate over commands in order
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the queue holds no command
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Remove every command
    pub fn clear(&mut self) {
        self.commands.clear();
        self.last_appended = None;
    }

    /// Wire representation: an ordered JSON array of commands
    pub fn serialize(&self) -> Value {
        Value::Array(
            self.commands
                .iter()
                .map(|command| serde_json::to_value(command).unwrap_or(Value::Null))
                .collect(),
        )
    }

    /// Wire representation as a JSON string
    pub fn to_json(&self) -> tether_core::Result<String> {
        Ok(serde_json::to_string(&self.commands)?)
    }
}

impl IntoIterator for CommandQueue {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(queue: &CommandQueue) -> Vec<&str> {
        queue.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_append_and_serialize() {
        let mut queue = CommandQueue::new();
        let first = queue.append("dom.assign", Options::new(), false);
        let second = queue.append("script.exec", Options::new(), false);

        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(
            queue.serialize(),
            json!([
                {"name": "dom.assign", "args": {}},
                {"name": "script.exec", "args": {}}
            ])
        );
    }

    #[test]
    fn test_insert_before() {
        let mut queue = CommandQueue::new();
        queue.append("a", Options::new(), false);
        queue.append("b", Options::new(), false);

        let id = queue.insert_before("x", Options::new(), 1).unwrap();
        assert_eq!(id.index(), 1);
        assert_eq!(names(&queue), vec!["a", "x", "b"]);
        assert_eq!(queue.last_appended().map(|c| c.name.as_str()), Some("x"));

        queue.insert_before("y", Options::new(), 3).unwrap();
        assert_eq!(names(&queue), vec!["y", "a", "x", "b"]);
    }

    #[test]
    fn test_insert_before_past_length_is_noop() {
        let mut queue = CommandQueue::new();
        queue.append("a", Options::new(), false);

        assert!(queue.insert_before("x", Options::new(), 2).is_none());
        assert_eq!(names(&queue), vec!["a"]);
        assert_eq!(queue.last_appended().map(|c| c.name.as_str()), Some("a"));
    }

    #[test]
    fn test_patch_last() {
        let mut queue = CommandQueue::new();
        assert!(!queue.patch_last(|c| c.name = "never".to_string()));

        queue.append("dom.assign", Options::new(), false);
        queue.append("dom.append", Options::new(), false);
        assert!(queue.bind_last("cart", Some("item-1".to_string())));
        assert!(queue.set_last_option("plugin", json!("dialog")));

        let wire = queue.serialize();
        assert!(wire[0].get("component").is_none());
        assert_eq!(wire[1]["component"], json!({"name": "cart", "item": "item-1"}));
        assert_eq!(wire[1]["options"], json!({"plugin": "dialog"}));
    }

    #[test]
    fn test_merge() {
        let mut queue = CommandQueue::new();
        queue.append("a", Options::new(), false);

        let mut other = CommandQueue::new();
        other.append("b", Options::new(), false);
        other.append("c", Options::new(), false);

        let mut before = queue.clone();
        before.merge(other.clone(), true);
        assert_eq!(names(&before), vec!["b", "c", "a"]);
        assert_eq!(before.last_appended().map(|c| c.name.as_str()), Some("a"));

        queue.merge(other, false);
        assert_eq!(names(&queue), vec!["a", "b", "c"]);
        assert_eq!(queue.last_appended().map(|c| c.name.as_str()), Some("c"));
    }

    #[test]
    fn test_merge_into_empty_before() {
        let mut queue = CommandQueue::new();
        let mut other = CommandQueue::new();
        other.append("b", Options::new(), false);

        queue.merge(other, true);
        assert_eq!(queue.last_appended().map(|c| c.name.as_str()), Some("b"));
    }

    #[test]
    fn test_to_json_matches_serialize() {
        let mut queue = CommandQueue::new();
        queue.append("script.debug", Options::new(), false);
        let text = queue.to_json().unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, queue.serialize());
    }
}
