//! Mutation and selection notifications for views and the preview

use fomod_parser::NodeId;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Event sent to every subscriber of an [`EventBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// Fired after every successful mutation; `None` means the whole
    /// document changed (new, open, undo of an unknown scope)
    DocumentChanged(Option<NodeId>),

    /// The current node changed
    SelectionChanged(Option<NodeId>),
}

/// Fan-out of editor events over channels
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<EditorEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<EditorEvent> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Send to all subscribers, forgetting the ones that hung up
    pub fn emit(&mut self, event: EditorEvent) {
        self.subscribers.retain(|subscriber| subscriber.send(event).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
