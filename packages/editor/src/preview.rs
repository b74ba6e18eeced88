//! # Preview Dispatcher
//!
//! Regenerates a rendered preview on a background thread so edits never
//! wait for rendering.
//!
//! The editor submits an owned [`PreviewSnapshot`] after each relevant
//! event. Submissions that arrive while a render is running are coalesced:
//! the worker only renders the newest snapshot waiting in the queue.

use fomod_parser::{NodeId, Serializer, Tree};
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;
use tracing::debug;

/// Immutable copy of the document taken when a preview was requested
#[derive(Debug, Clone)]
pub struct PreviewSnapshot {
    pub tree: Tree,
    pub info: NodeId,
    pub config: NodeId,

    /// Node the preview should focus on, usually the selection
    pub focus: Option<NodeId>,

    /// Increases with every submission from the same editor
    pub revision: u64,
}

/// Something that turns a snapshot into a preview
pub trait PreviewRenderer: Send + 'static {
    fn render(&mut self, snapshot: &PreviewSnapshot);
}

/// Rendered XML source of the previewed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePreviewOutput {
    pub revision: u64,
    pub code: String,
}

/// Renders the focused node, or the whole configuration, as XML
pub struct CodePreview {
    output: Sender<CodePreviewOutput>,
}

impl CodePreview {
    pub fn new(output: Sender<CodePreviewOutput>) -> Self {
        Self { output }
    }
}

impl PreviewRenderer for CodePreview {
    fn render(&mut self, snapshot: &PreviewSnapshot) {
        let mut serializer = Serializer::new();
        let code = match snapshot.focus {
            Some(node) => serializer.serialize_fragment(&snapshot.tree, node),
            None => serializer.serialize(&snapshot.tree, snapshot.config),
        };

        // Nobody listening anymore is not an error for the worker.
        let _ = self.output.send(CodePreviewOutput {
            revision: snapshot.revision,
            code,
        });
    }
}

enum Message {
    Render(Box<PreviewSnapshot>),
    Shutdown,
}

/// Owner of the preview worker thread
pub struct PreviewDispatcher {
    sender: Sender<Message>,
    worker: Option<JoinHandle<()>>,
}

impl PreviewDispatcher {
    /// Start a worker thread driving `renderer`
    pub fn spawn(mut renderer: impl PreviewRenderer) -> Self {
        let (sender, receiver) = channel::<Message>();

        let worker = std::thread::spawn(move || {
            debug!("Preview worker started");
            while let Ok(message) = receiver.recv() {
                let mut latest = match message {
                    Message::Render(snapshot) => snapshot,
                    Message::Shutdown => break,
                };

                // Keep only the newest pending snapshot.
                let mut shutdown = false;
                while let Ok(next) = receiver.try_recv() {
                    match next {
                        Message::Render(snapshot) => latest = snapshot,
                        Message::Shutdown => {
                            shutdown = true;
                            break;
                        }
                    }
                }

                debug!(revision = latest.revision, "Rendering preview");
                renderer.render(&latest);

                if shutdown {
                    break;
                }
            }
            debug!("Preview worker stopped");
        });

        Self {
            sender,
            worker: Some(worker),
        }
    }

    /// Queue a snapshot for rendering; never blocks
    pub fn submit(&self, snapshot: PreviewSnapshot) {
        if self.sender.send(Message::Render(Box::new(snapshot))).is_err() {
            debug!("Preview worker is gone, dropping snapshot");
        }
    }
}

impl Drop for PreviewDispatcher {
    fn drop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fomod_parser::{NodeKind, Package};
    use std::sync::mpsc::Receiver;
    use std::time::Duration;

    /// Blocks inside its first render until released
    struct GatedRenderer {
        started: Sender<()>,
        release: Receiver<()>,
        rendered: Sender<u64>,
        first: bool,
    }

    impl PreviewRenderer for GatedRenderer {
        fn render(&mut self, snapshot: &PreviewSnapshot) {
            if self.first {
                self.first = false;
                self.started.send(()).unwrap();
                self.release.recv().unwrap();
            }
            self.rendered.send(snapshot.revision).unwrap();
        }
    }

    fn snapshot(package: &Package, revision: u64) -> PreviewSnapshot {
        PreviewSnapshot {
            tree: package.tree.clone(),
            info: package.info,
            config: package.config,
            focus: None,
            revision,
        }
    }

    #[test]
    fn test_pending_snapshots_are_coalesced() {
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        let (rendered_tx, rendered_rx) = channel();

        let package = Package::new();
        let dispatcher = PreviewDispatcher::spawn(GatedRenderer {
            started: started_tx,
            release: release_rx,
            rendered: rendered_tx,
            first: true,
        });

        dispatcher.submit(snapshot(&package, 1));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        for revision in 2..=4 {
            dispatcher.submit(snapshot(&package, revision));
        }
        release_tx.send(()).unwrap();
        drop(dispatcher);

        let rendered: Vec<u64> = rendered_rx.iter().collect();
        assert_eq!(rendered, vec![1, 4]);
    }

    #[test]
    fn test_code_preview_renders_focus() {
        let (output_tx, output_rx) = channel();
        let mut package = Package::new();
        let module_name = package.tree.children(package.config)[0];
        package.tree.set_text(module_name, "Preview");

        let dispatcher = PreviewDispatcher::spawn(CodePreview::new(output_tx));
        let mut focused = snapshot(&package, 7);
        focused.focus = Some(module_name);
        dispatcher.submit(focused);

        let output = output_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(output.revision, 7);
        assert_eq!(
            output.code,
            "<moduleName user_sort_order=\"0000001\">Preview</moduleName>\n"
        );

        dispatcher.submit(snapshot(&package, 8));
        let output = output_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(output.code.starts_with("<?xml"));
        assert_eq!(package.tree.kind(package.config), NodeKind::Config);
    }
}
