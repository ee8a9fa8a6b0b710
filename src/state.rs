use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Pause and completion flags for a traversal, arranged in a tree.
///
/// A `State` created with [`State::new`] is its own root. States created with
/// [`child`](State::child) point at their parent through a weak link and
/// read their pause flag from the root of that chain, so one
/// [`pause`](State::pause) on the root pauses a whole subtree. Pausing a
/// non-root state is accepted but has no visible effect.
///
/// The parent link never keeps the parent alive. If an ancestor has been
/// dropped, the last ancestor still reachable acts as the root.
///
/// The flags are atomic, so a handle may be moved to another thread (for
/// example a UI thread) to pause a traversal that runs elsewhere. Cloning
/// yields another handle to the same node.
#[derive(Clone, Debug)]
pub struct State {
    node: Arc<Node>,
}

#[derive(Debug)]
struct Node {
    pause: AtomicBool,
    done: AtomicBool,
    parent: Option<Weak<Node>>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// A self-rooted state.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    /// A state whose pause flag follows this state's root.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(Arc::downgrade(&self.node)))
    }

    fn with_parent(parent: Option<Weak<Node>>) -> Self {
        Self {
            node: Arc::new(Node {
                pause: AtomicBool::new(false),
                done: AtomicBool::new(false),
                parent,
            }),
        }
    }

    /// Set the local pause flag. Only observable on a root.
    pub fn pause(&self, pause: bool) {
        self.node.pause.store(pause, Ordering::SeqCst);
    }

    /// The root's pause flag.
    pub fn is_paused(&self) -> bool {
        self.root().pause.load(Ordering::SeqCst)
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.as_ref().and_then(Weak::upgrade).is_none()
    }

    /// This node's own completion flag.
    pub fn is_done(&self) -> bool {
        self.node.done.load(Ordering::SeqCst)
    }

    pub(crate) fn set_done(&self, done: bool) {
        self.node.done.store(done, Ordering::SeqCst);
    }

    fn root(&self) -> Arc<Node> {
        let mut node = Arc::clone(&self.node);
        while let Some(parent) = node.parent.as_ref().and_then(Weak::upgrade) {
            node = parent;
        }
        node
    }
}
