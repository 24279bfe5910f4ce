use super::pin_registry::PinId;
use thiserror::Error;

/// Arena slot index plus the generation it was allocated in. A stale id
/// never resolves to a node allocated later in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// A highlight wrapper. Owns exactly the highlighted slice of one original leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub text: String,
    pub category: String,
    pub pin_id: Option<PinId>,
    /// Leaf this marker was cut from. Only fragments with the same origin
    /// are merged back when it is removed.
    pub origin: Option<NodeId>,
}

impl Marker {
    pub fn is_pinned(&self) -> bool {
        self.pin_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Container { tag: String },
    Text(String),
    /// Unhighlighted piece of a leaf that was split around a marker.
    Fragment { text: String, origin: NodeId },
    Marker(Marker),
}

impl Node {
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Text(text) | Node::Fragment { text, .. } => Some(text.as_str()),
            Node::Marker(marker) => Some(marker.text.as_str()),
            Node::Container { .. } => None,
        }
    }

    /// Searchable text: whole leaves and fragments, never marker contents.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Text(_) | Node::Fragment { .. })
    }

    /// The leaf a fragment or marker was split from.
    pub fn origin(&self) -> Option<NodeId> {
        match self {
            Node::Fragment { origin, .. } => Some(*origin),
            Node::Marker(marker) => marker.origin,
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Node::Marker(marker) => Some(marker),
            _ => None,
        }
    }

    fn is_container(&self) -> bool {
        matches!(self, Node::Container { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not a text leaf")]
    NotALeaf(NodeId),
    #[error("node {0:?} is not a marker")]
    NotAMarker(NodeId),
    #[error("node {0:?} cannot hold children")]
    NotAContainer(NodeId),
    #[error("nodes are not a contiguous run of siblings")]
    NotSiblings,
    #[error("node {0:?} has no parent")]
    DetachedNode(NodeId),
    #[error("highlight span {start}..{end} is empty or out of bounds")]
    EmptySpan { start: usize, end: usize },
}

/// The host document as seen by the highlighter.
///
/// Implementors expose structure and a single mutation primitive; everything
/// else (leaf iteration, sibling lookup) is derived.
pub trait DocumentTree {
    fn root(&self) -> NodeId;

    fn node(&self, id: NodeId) -> Option<&Node>;

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    fn children(&self, id: NodeId) -> &[NodeId];

    /// Replace a contiguous, ordered run of siblings with freshly created
    /// childless nodes at the same position. Returns the new ids in order.
    fn replace(&mut self, targets: &[NodeId], with: Vec<Node>) -> Result<Vec<NodeId>, TreeError>;

    /// All nodes below the root in document (pre-)order.
    fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = self.children(self.root()).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Text leaves and fragments in document order. Marker contents are
    /// not leaves.
    fn leaves(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| self.node(*id).is_some_and(Node::is_leaf))
            .collect()
    }

    fn markers(&self) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|id| matches!(self.node(*id), Some(Node::Marker(_))))
            .collect()
    }

    fn marker(&self, id: NodeId) -> Option<&Marker> {
        self.node(id).and_then(Node::as_marker)
    }

    fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|sibling| *sibling == id)?;
        pos.checked_sub(1).map(|prev| siblings[prev])
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Concatenated text of a subtree, markers included.
    fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.node(id).and_then(Node::text) {
            out.push_str(text);
        }
        for child in self.children(id) {
            out.push_str(&self.text_content(*child));
        }
        out
    }
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Arena-backed in-memory document. Freed slots are recycled under a new
/// generation.
#[derive(Debug, Clone)]
pub struct NodeTree {
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    root: NodeId,
}

impl NodeTree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            root: NodeId::new(0, 0),
        };
        tree.root = tree.alloc(
            Node::Container {
                tag: "body".to_string(),
            },
            None,
        );
        tree
    }

    /// Build a document from plain text: blank-line separated paragraphs
    /// become `p` containers holding one leaf with the raw paragraph text.
    pub fn from_text(content: &str) -> Self {
        let mut tree = Self::new();
        let mut paragraph: Vec<&str> = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                tree.push_paragraph(&mut paragraph);
            } else {
                paragraph.push(line);
            }
        }
        tree.push_paragraph(&mut paragraph);

        tree
    }

    fn push_paragraph(&mut self, lines: &mut Vec<&str>) {
        if lines.is_empty() {
            return;
        }
        let text = lines.join("\n");
        lines.clear();
        // The root is always a live container
        let container = self.attach(self.root, Node::Container { tag: "p".to_string() });
        self.attach(container, Node::Text(text));
    }

    pub fn append(&mut self, parent: NodeId, node: Node) -> Result<NodeId, TreeError> {
        if !self.entry(parent)?.node.is_container() {
            return Err(TreeError::NotAContainer(parent));
        }
        Ok(self.attach(parent, node))
    }

    /// Number of live nodes below the root.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count()
            .saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: NodeId) -> Result<&Entry, TreeError> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(TreeError::UnknownNode(id))
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Allocate `node` as the last child of a parent already known to be a
    /// live container.
    fn attach(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.alloc(node, Some(parent));
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.push(id);
        }
        id
    }

    fn alloc(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
        let entry = Entry {
            node,
            parent,
            children: Vec::new(),
        };
        match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.generation = slot.generation.wrapping_add(1);
                slot.entry = Some(entry);
                NodeId::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                NodeId::new(self.slots.len() - 1, 0)
            }
        }
    }

    fn free(&mut self, id: NodeId) {
        let Some(entry) = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.take())
        else {
            return;
        };
        self.vacant.push(id.index);
        for child in entry.children {
            self.free(child);
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree for NodeTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.entry(id).ok().map(|entry| &entry.node)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).ok().and_then(|entry| entry.parent)
    }

    fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    fn replace(&mut self, targets: &[NodeId], with: Vec<Node>) -> Result<Vec<NodeId>, TreeError> {
        let first = *targets.first().ok_or(TreeError::NotSiblings)?;
        let parent = self.entry(first)?.parent.ok_or(TreeError::DetachedNode(first))?;

        let siblings = self.children(parent);
        let pos = siblings
            .iter()
            .position(|sibling| *sibling == first)
            .ok_or(TreeError::DetachedNode(first))?;
        let contiguous = siblings
            .get(pos..pos + targets.len())
            .is_some_and(|run| run == targets);
        if !contiguous {
            return Err(TreeError::NotSiblings);
        }

        for target in targets {
            self.free(*target);
        }
        let new_ids: Vec<NodeId> = with
            .into_iter()
            .map(|node| self.alloc(node, Some(parent)))
            .collect();

        if let Some(entry) = self.entry_mut(parent) {
            entry
                .children
                .splice(pos..pos + targets.len(), new_ids.iter().copied());
        }
        Ok(new_ids)
    }
}
