//! Game tree with variations.
//!
//! Nodes live in an arena owned by [`Game`] and refer to each other through
//! [`NodeId`]s. A child is owned by the arena slot, its `parent` field is only
//! a lookup key. Removed slots are never reused, so a stale id is reported as
//! [`TreeError::UnknownNode`] instead of silently addressing another node.

use std::fmt;

use thiserror::Error;

use crate::headers::Headers;
use crate::nag::{Nag, NagSet};
use crate::position::{ply_of, MoveEngine, MoveError, PlayedMove, START_FEN};

/// Handle to a node of one [`Game`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("the root node cannot be removed")]
    RootRemoval,

    #[error(transparent)]
    IllegalMove(#[from] MoveError),
}

/// The move leading to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyMove {
    pub san: String,
    pub uci: String,
    /// 1 for White's first move of a game from the standard start.
    pub ply: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameNode {
    mv: Option<PlyMove>,
    position: String,
    /// Comment written after the move.
    pub comment: Option<String>,
    /// Comment written between the move number and the move.
    pub pre_comment: Option<String>,
    pub nags: NagSet,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    /// Game result, set on the root.
    pub result: Option<String>,
}

impl GameNode {
    fn new(mv: Option<PlyMove>, position: String, parent: Option<NodeId>) -> Self {
        Self {
            mv,
            position,
            comment: None,
            pre_comment: None,
            nags: NagSet::new(),
            children: Vec::new(),
            parent,
            result: None,
        }
    }

    pub fn mv(&self) -> Option<&PlyMove> {
        self.mv.as_ref()
    }

    pub fn san(&self) -> Option<&str> {
        self.mv.as_ref().map(|m| m.san.as_str())
    }

    /// FEN of the position after this node's move.
    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn main_child(&self) -> Option<NodeId> {
        self.children.first().copied()
    }
}

/// One game: headers plus the move tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub headers: Headers,
    nodes: Vec<Option<GameNode>>,
    root: NodeId,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Empty game from the standard starting position.
    pub fn new() -> Self {
        Self::with_root(START_FEN.to_string())
    }

    /// Empty game from a custom position. Sets the `SetUp` and `FEN` tags.
    pub fn from_position(engine: &dyn MoveEngine, fen: &str) -> Result<Self, MoveError> {
        let fen = engine.validate_position(fen)?;
        let mut game = Self::with_root(fen.clone());
        if fen != START_FEN {
            game.headers.set("SetUp", "1");
            game.headers.set("FEN", fen);
        }
        Ok(game)
    }

    pub(crate) fn with_root(position: String) -> Self {
        Self {
            headers: Headers::new(),
            nodes: vec![Some(GameNode::new(None, position, None))],
            root: NodeId(0),
        }
    }

    /// Replaces the starting position of a game that has no moves yet.
    pub(crate) fn reset_root(&mut self, position: String) {
        debug_assert!(self.root_node().children.is_empty());
        self.root_node_mut().position = position;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&GameNode, TreeError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut GameNode, TreeError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    fn root_node(&self) -> &GameNode {
        match self.nodes[self.root.0].as_ref() {
            Some(node) => node,
            None => unreachable!("root slot is never cleared"),
        }
    }

    fn root_node_mut(&mut self) -> &mut GameNode {
        match self.nodes[self.root.0].as_mut() {
            Some(node) => node,
            None => unreachable!("root slot is never cleared"),
        }
    }

    pub fn start_position(&self) -> &str {
        &self.root_node().position
    }

    pub fn result(&self) -> Option<&str> {
        self.root_node().result.as_deref()
    }

    pub fn set_result(&mut self, result: impl Into<String>) {
        self.root_node_mut().result = Some(result.into());
    }

    /// Children of a node, empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(GameNode::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(GameNode::parent)
    }

    /// Appends a child without checking for an identical sibling.
    pub(crate) fn push_child(&mut self, at: NodeId, played: PlayedMove) -> Result<NodeId, TreeError> {
        let ply = ply_of(self.node(at)?.position());
        let id = NodeId(self.nodes.len());
        let mv = PlyMove {
            san: played.san,
            uci: played.uci,
            ply,
        };
        self.nodes.push(Some(GameNode::new(Some(mv), played.position, Some(at))));
        self.node_mut(at)?.children.push(id);
        Ok(id)
    }

    /// Resolves `san` at `at` and appends it as a new child. An identical
    /// existing child is returned instead of adding a duplicate.
    pub fn add_variant(
        &mut self,
        at: NodeId,
        san: &str,
        engine: &dyn MoveEngine,
    ) -> Result<NodeId, TreeError> {
        let played = engine.apply_move(self.node(at)?.position(), san)?;
        self.attach(at, played)
    }

    /// Same as [`Game::add_variant`] with a UCI move.
    pub fn add_uci_variant(
        &mut self,
        at: NodeId,
        uci: &str,
        engine: &dyn MoveEngine,
    ) -> Result<NodeId, TreeError> {
        let played = engine.apply_uci(self.node(at)?.position(), uci)?;
        self.attach(at, played)
    }

    fn attach(&mut self, at: NodeId, played: PlayedMove) -> Result<NodeId, TreeError> {
        let existing = self
            .children(at)
            .iter()
            .copied()
            .find(|&c| self.node(c).ok().and_then(GameNode::mv).is_some_and(|m| m.uci == played.uci));
        match existing {
            Some(id) => Ok(id),
            None => self.push_child(at, played),
        }
    }

    /// Adds a sequence of SAN moves starting at `at`. Returns the ids of the
    /// line's nodes. Nothing is added if any move fails to resolve.
    pub fn add_line<S: AsRef<str>>(
        &mut self,
        at: NodeId,
        sans: &[S],
        engine: &dyn MoveEngine,
    ) -> Result<Vec<NodeId>, TreeError> {
        let mut position = self.node(at)?.position().to_string();
        let mut played = Vec::with_capacity(sans.len());
        for san in sans {
            let mv = engine.apply_move(&position, san.as_ref())?;
            position = mv.position.clone();
            played.push(mv);
        }
        self.attach_line(at, played)
    }

    /// Adds a sequence of UCI moves starting at `at`, converting them to SAN.
    pub fn add_uci_line<S: AsRef<str>>(
        &mut self,
        at: NodeId,
        ucis: &[S],
        engine: &dyn MoveEngine,
    ) -> Result<Vec<NodeId>, TreeError> {
        let mut position = self.node(at)?.position().to_string();
        let mut played = Vec::with_capacity(ucis.len());
        for uci in ucis {
            let mv = engine.apply_uci(&position, uci.as_ref())?;
            position = mv.position.clone();
            played.push(mv);
        }
        self.attach_line(at, played)
    }

    fn attach_line(&mut self, at: NodeId, played: Vec<PlayedMove>) -> Result<Vec<NodeId>, TreeError> {
        let mut cursor = at;
        let mut ids = Vec::with_capacity(played.len());
        for mv in played {
            cursor = self.attach(cursor, mv)?;
            ids.push(cursor);
        }
        Ok(ids)
    }

    fn sibling_index(&self, node: NodeId) -> Result<Option<(NodeId, usize)>, TreeError> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(None);
        };
        let idx = self
            .children(parent)
            .iter()
            .position(|&c| c == node)
            .ok_or(TreeError::UnknownNode(node))?;
        Ok(Some((parent, idx)))
    }

    /// Swaps `node` with its preceding sibling. No-op at index 0.
    pub fn promote_variant(&mut self, node: NodeId) -> Result<(), TreeError> {
        if let Some((parent, idx)) = self.sibling_index(node)? {
            if idx > 0 {
                self.node_mut(parent)?.children.swap(idx, idx - 1);
            }
        }
        Ok(())
    }

    /// Moves `node` to index 0; the former mainline becomes index 1.
    pub fn promote_variant_to_main(&mut self, node: NodeId) -> Result<(), TreeError> {
        if let Some((parent, idx)) = self.sibling_index(node)? {
            if idx > 0 {
                let children = &mut self.node_mut(parent)?.children;
                let promoted = children.remove(idx);
                children.insert(0, promoted);
            }
        }
        Ok(())
    }

    /// Swaps `node` with its following sibling. No-op at the last position.
    pub fn demote_variant(&mut self, node: NodeId) -> Result<(), TreeError> {
        if let Some((parent, idx)) = self.sibling_index(node)? {
            let children = &mut self.node_mut(parent)?.children;
            if idx + 1 < children.len() {
                children.swap(idx, idx + 1);
            }
        }
        Ok(())
    }

    /// Detaches and discards `node` with its subtree.
    pub fn remove_variant(&mut self, node: NodeId) -> Result<(), TreeError> {
        let (parent, idx) = self.sibling_index(node)?.ok_or(TreeError::RootRemoval)?;
        self.node_mut(parent)?.children.remove(idx);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.get_mut(id.0).and_then(Option::take) {
                stack.extend(removed.children);
            }
        }
        Ok(())
    }

    /// Removes every comment in the tree.
    pub fn strip_comments(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.comment = None;
            node.pre_comment = None;
        }
    }

    /// Removes every variation, keeping only the mainline.
    pub fn strip_variations(&mut self) -> Result<(), TreeError> {
        let line: Vec<NodeId> = std::iter::once(self.root).chain(self.mainline()).collect();
        for id in line {
            let extra: Vec<NodeId> = self.children(id).iter().skip(1).copied().collect();
            for variation in extra {
                self.remove_variant(variation)?;
            }
        }
        Ok(())
    }

    /// Mainline nodes after the root.
    pub fn mainline(&self) -> Mainline<'_> {
        Mainline {
            game: self,
            current: self.root,
        }
    }

    /// Nodes from the root (exclusive) down to `node` (inclusive).
    pub fn path_to(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(parent) = self.node(current)?.parent {
            path.push(current);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Child indices leading from the root to `node`.
    pub fn variation_path(&self, node: NodeId) -> Result<Vec<usize>, TreeError> {
        self.path_to(node)?
            .into_iter()
            .map(|id| self.sibling_index(id).map(|s| s.map_or(0, |(_, idx)| idx)))
            .collect()
    }

    /// Follows child indices from the root.
    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |id, &idx| self.children(id).get(idx).copied())
    }

    pub fn set_comment(&mut self, node: NodeId, comment: Option<String>) -> Result<(), TreeError> {
        self.node_mut(node)?.comment = comment.filter(|c| !c.trim().is_empty());
        Ok(())
    }

    pub fn push_nag(&mut self, node: NodeId, nag: Nag) -> Result<(), TreeError> {
        self.node_mut(node)?.nags.push(nag);
        Ok(())
    }
}

/// Iterator over the mainline, see [`Game::mainline`].
pub struct Mainline<'a> {
    game: &'a Game,
    current: NodeId,
}

impl Iterator for Mainline<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.game.children(self.current).first().copied()?;
        self.current = next;
        Some(next)
    }
}
