//! Abstracted game tree: decision nodes, information sets and strength
//! buckets.
//!
//! Nodes and information sets live in id-keyed registries and refer to each
//! other by id only. A node may point at an information set shared with
//! other nodes; the set does not know which nodes use it.
//!
//! Query results are sorted by id so they never depend on hash order.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::abstraction::config::AbstractionConfig;
use crate::cfr::PlayerId;
use crate::error::{AbstractionError, AbstractionResult};

/// Identifier of a tree node.
pub type NodeId = String;

/// Identifier of an information set.
pub type InfoSetId = String;

/// A vertex of the abstracted game tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    is_terminal: bool,
    payoff: Option<Vec<f64>>,
    information_set: Option<InfoSetId>,
}

impl Node {
    /// Node id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parent id, `None` for a root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Child ids in creation order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node ends the game.
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    /// Payoff per player; present exactly on terminal nodes.
    pub fn payoff(&self) -> Option<&[f64]> {
        self.payoff.as_deref()
    }

    /// Id of the information set assigned to this node, if any.
    pub fn information_set(&self) -> Option<&str> {
        self.information_set.as_deref()
    }
}

/// Game states a player cannot tell apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationSet {
    id: InfoSetId,
    player: PlayerId,
    actions: Vec<String>,
    hand_strength: Option<f64>,
    bucket: Option<usize>,
}

impl InformationSet {
    /// Information set id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acting player.
    pub fn player(&self) -> &str {
        &self.player
    }

    /// Legal actions, in order.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Number of legal actions.
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Hand strength the set was created with, if any.
    pub fn hand_strength(&self) -> Option<f64> {
        self.hand_strength
    }

    /// Strength bucket, if one has been assigned.
    pub fn bucket(&self) -> Option<usize> {
        self.bucket
    }
}

/// Registry of nodes and information sets with strength bucketing.
///
/// # Example
/// ```
/// use equilibrium_solver::abstraction::GameTreeAbstractor;
///
/// let mut tree = GameTreeAbstractor::new(10).unwrap();
/// tree.create_node("root", None, false, None).unwrap();
/// tree.create_node("fold", Some("root"), true, Some(vec![-1.0, 1.0])).unwrap();
/// tree.create_information_set("btn_AKs", "btn", ["fold", "call", "raise"], Some(0.85)).unwrap();
/// tree.assign_information_set("root", "btn_AKs").unwrap();
///
/// assert_eq!(tree.get_abstracted_strategy_space(), (1, 3));
/// assert_eq!(tree.get_information_set_by_bucket("btn", 8).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameTreeAbstractor {
    num_buckets: usize,
    nodes: FxHashMap<NodeId, Node>,
    information_sets: FxHashMap<InfoSetId, InformationSet>,
    /// Payoff length fixed by the first terminal node.
    payoff_len: Option<usize>,
}

impl GameTreeAbstractor {
    /// Create an empty abstractor with `num_buckets` strength buckets.
    ///
    /// # Errors
    /// `InvalidBucketCount` if `num_buckets` is zero.
    pub fn new(num_buckets: usize) -> AbstractionResult<Self> {
        if num_buckets == 0 {
            return Err(AbstractionError::InvalidBucketCount);
        }
        Self::with_config(AbstractionConfig::new(num_buckets))
    }

    /// Create an empty abstractor from a shared configuration.
    ///
    /// The whole config is validated, but only `num_buckets` is kept; the
    /// histogram settings belong to [`HistogramAbstractor`](crate::abstraction::HistogramAbstractor).
    pub fn with_config(config: AbstractionConfig) -> AbstractionResult<Self> {
        config.validate()?;
        Ok(Self {
            num_buckets: config.num_buckets,
            nodes: FxHashMap::default(),
            information_sets: FxHashMap::default(),
            payoff_len: None,
        })
    }

    /// Number of strength buckets.
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Register a node.
    ///
    /// # Arguments
    /// * `id` - Unique node id
    /// * `parent_id` - Existing non-terminal parent, `None` for a root
    /// * `is_terminal` - Whether the node ends the game
    /// * `payoff` - One value per player; required on terminal nodes and
    ///   forbidden otherwise
    ///
    /// # Returns
    /// The registered node. It is also appended to the parent's children.
    pub fn create_node(
        &mut self,
        id: impl Into<NodeId>,
        parent_id: Option<&str>,
        is_terminal: bool,
        payoff: Option<Vec<f64>>,
    ) -> AbstractionResult<&Node> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(AbstractionError::DuplicateNode(id));
        }

        if let Some(parent_id) = parent_id {
            let parent = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| AbstractionError::UnknownNode(parent_id.to_string()))?;
            if parent.is_terminal {
                return Err(AbstractionError::TerminalParent(parent_id.to_string()));
            }
        }

        match (&payoff, is_terminal) {
            (None, true) => return Err(AbstractionError::MissingPayoff(id)),
            (Some(p), true) if p.is_empty() => return Err(AbstractionError::MissingPayoff(id)),
            (Some(_), false) => return Err(AbstractionError::UnexpectedPayoff(id)),
            _ => {}
        }

        if let Some(p) = &payoff {
            match self.payoff_len {
                Some(expected) if expected != p.len() => {
                    return Err(AbstractionError::PayoffLengthMismatch {
                        id,
                        expected,
                        actual: p.len(),
                    });
                }
                _ => self.payoff_len = Some(p.len()),
            }
        }

        if let Some(parent) = parent_id.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(id.clone());
        }

        let node = Node {
            id: id.clone(),
            parent: parent_id.map(str::to_string),
            children: Vec::new(),
            is_terminal,
            payoff,
            information_set: None,
        };
        Ok(self.nodes.entry(id).or_insert(node))
    }

    /// Register an information set.
    ///
    /// When `hand_strength` is given the set is bucketed with
    /// [`assign_bucket`](Self::assign_bucket); otherwise it stays unbucketed
    /// until [`set_bucket`](Self::set_bucket) is called.
    pub fn create_information_set<I, A>(
        &mut self,
        id: impl Into<InfoSetId>,
        player: impl Into<PlayerId>,
        actions: I,
        hand_strength: Option<f64>,
    ) -> AbstractionResult<&InformationSet>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let id = id.into();
        if self.information_sets.contains_key(&id) {
            return Err(AbstractionError::DuplicateInformationSet(id));
        }

        let actions: Vec<String> = actions.into_iter().map(Into::into).collect();
        if actions.is_empty() {
            return Err(AbstractionError::NoActions(id));
        }

        let info_set = InformationSet {
            id: id.clone(),
            player: player.into(),
            actions,
            hand_strength,
            bucket: hand_strength.map(|s| self.assign_bucket(s)),
        };
        Ok(self.information_sets.entry(id).or_insert(info_set))
    }

    /// Attach an existing information set to an existing decision node.
    ///
    /// Replaces any set the node pointed at before.
    pub fn assign_information_set(&mut self, node_id: &str, info_set_id: &str) -> AbstractionResult<()> {
        if !self.information_sets.contains_key(info_set_id) {
            return Err(AbstractionError::UnknownInformationSet(info_set_id.to_string()));
        }
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| AbstractionError::UnknownNode(node_id.to_string()))?;
        if node.is_terminal {
            return Err(AbstractionError::TerminalNode(node_id.to_string()));
        }

        node.information_set = Some(info_set_id.to_string());
        Ok(())
    }

    /// Information set count and total action count across all sets.
    pub fn get_abstracted_strategy_space(&self) -> (usize, usize) {
        let actions = self.information_sets.values().map(InformationSet::num_actions).sum();
        (self.information_sets.len(), actions)
    }

    /// Information sets of `player` in `bucket_id`, ordered by id.
    pub fn get_information_set_by_bucket(&self, player: &str, bucket_id: usize) -> Vec<&InformationSet> {
        sorted_by_id(
            self.information_sets
                .values()
                .filter(|s| s.player == player && s.bucket == Some(bucket_id)),
            InformationSet::id,
        )
    }

    /// Map a hand strength to a bucket.
    ///
    /// `clamp(floor(strength * num_buckets), 0, num_buckets - 1)`, so 0.0
    /// lands in the first bucket, 1.0 in the last, and the mapping is
    /// monotonic. NaN lands in bucket 0.
    pub fn assign_bucket(&self, strength: f64) -> usize {
        let last = self.num_buckets - 1;
        let scaled = (strength * self.num_buckets as f64).floor();
        if scaled.is_nan() {
            0
        } else {
            scaled.clamp(0.0, last as f64) as usize
        }
    }

    /// Overwrite the bucket of an information set, clamped to the valid
    /// range. Returns the bucket actually stored.
    pub fn set_bucket(&mut self, info_set_id: &str, bucket: usize) -> AbstractionResult<usize> {
        let last = self.num_buckets - 1;
        let info_set = self
            .information_sets
            .get_mut(info_set_id)
            .ok_or_else(|| AbstractionError::UnknownInformationSet(info_set_id.to_string()))?;
        let bucket = bucket.min(last);
        info_set.bucket = Some(bucket);
        Ok(bucket)
    }

    /// Look up a node.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up an information set.
    pub fn information_set(&self, id: &str) -> Option<&InformationSet> {
        self.information_sets.get(id)
    }

    /// Number of registered nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered information sets.
    pub fn num_information_sets(&self) -> usize {
        self.information_sets.len()
    }

    /// Child ids of a node, in creation order.
    pub fn children(&self, node_id: &str) -> AbstractionResult<&[NodeId]> {
        Ok(self.get_node(node_id)?.children())
    }

    /// Ids from `node_id` up to its root, node first.
    pub fn path_to_root(&self, node_id: &str) -> AbstractionResult<Vec<&str>> {
        let mut path = vec![self.get_node(node_id)?.id()];
        let mut current = self.get_node(node_id)?;
        // Parents are fixed at creation, so the walk terminates.
        while let Some(parent) = current.parent() {
            current = self.get_node(parent)?;
            path.push(current.id());
        }
        Ok(path)
    }

    /// Number of edges between a node and its root.
    pub fn depth(&self, node_id: &str) -> AbstractionResult<usize> {
        Ok(self.path_to_root(node_id)?.len() - 1)
    }

    /// All terminal nodes, ordered by id.
    pub fn terminal_nodes(&self) -> Vec<&Node> {
        sorted_by_id(self.nodes.values().filter(|n| n.is_terminal), Node::id)
    }

    /// Nodes assigned to an information set, ordered by id.
    pub fn nodes_in_information_set(&self, info_set_id: &str) -> AbstractionResult<Vec<&Node>> {
        if !self.information_sets.contains_key(info_set_id) {
            return Err(AbstractionError::UnknownInformationSet(info_set_id.to_string()));
        }
        Ok(sorted_by_id(
            self.nodes
                .values()
                .filter(|n| n.information_set() == Some(info_set_id)),
            Node::id,
        ))
    }

    /// Information set assigned to a node, if any.
    pub fn information_set_for_node(&self, node_id: &str) -> AbstractionResult<Option<&InformationSet>> {
        Ok(self
            .get_node(node_id)?
            .information_set()
            .and_then(|id| self.information_sets.get(id)))
    }

    /// All information sets of a player, ordered by id.
    pub fn information_sets_for_player(&self, player: &str) -> Vec<&InformationSet> {
        sorted_by_id(
            self.information_sets.values().filter(|s| s.player == player),
            InformationSet::id,
        )
    }

    /// Count of a player's information sets in each bucket.
    pub fn bucket_occupancy(&self, player: &str) -> Vec<usize> {
        let mut counts = vec![0; self.num_buckets];
        for bucket in self
            .information_sets
            .values()
            .filter(|s| s.player == player)
            .filter_map(|s| s.bucket)
        {
            counts[bucket] += 1;
        }
        counts
    }

    fn get_node(&self, id: &str) -> AbstractionResult<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| AbstractionError::UnknownNode(id.to_string()))
    }
}

fn sorted_by_id<'a, T: 'a>(
    items: impl Iterator<Item = &'a T>,
    id: impl Fn(&T) -> &str,
) -> Vec<&'a T> {
    let mut items: Vec<&T> = items.collect();
    items.sort_by(|a, b| id(*a).cmp(id(*b)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root -> {fold (terminal), call -> {check (terminal)}}
    fn small_tree() -> GameTreeAbstractor {
        let mut tree = GameTreeAbstractor::new(10).unwrap();
        tree.create_node("root", None, false, None).unwrap();
        tree.create_node("fold", Some("root"), true, Some(vec![-1.0, 1.0])).unwrap();
        tree.create_node("call", Some("root"), false, None).unwrap();
        tree.create_node("check", Some("call"), true, Some(vec![2.0, -2.0])).unwrap();
        tree
    }

    #[test]
    fn test_zero_buckets_rejected() {
        assert_eq!(
            GameTreeAbstractor::new(0).unwrap_err(),
            AbstractionError::InvalidBucketCount
        );
        assert!(matches!(
            GameTreeAbstractor::with_config(AbstractionConfig::new(3).with_histogram_bins(0)),
            Err(AbstractionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_with_config_keeps_bucket_count() {
        let config = AbstractionConfig::new(4)
            .with_histogram_bins(50)
            .with_max_cluster_iterations(3);
        let tree = GameTreeAbstractor::with_config(config).unwrap();
        assert_eq!(tree.num_buckets(), 4);
        assert_eq!(tree.assign_bucket(1.0), 3);
        assert_eq!(tree.bucket_occupancy("p1").len(), 4);
    }

    #[test]
    fn test_bucket_boundaries() {
        let tree = GameTreeAbstractor::new(10).unwrap();
        assert_eq!(tree.assign_bucket(0.0), 0);
        assert_eq!(tree.assign_bucket(1.0), 9);
        assert_eq!(tree.assign_bucket(-0.5), 0);
        assert_eq!(tree.assign_bucket(1.5), 9);
        assert_eq!(tree.assign_bucket(f64::NAN), 0);
        assert_eq!(tree.assign_bucket(f64::INFINITY), 9);

        let fine = GameTreeAbstractor::new(100).unwrap();
        assert_eq!(fine.assign_bucket(0.5), 50);

        let single = GameTreeAbstractor::new(1).unwrap();
        assert_eq!(single.assign_bucket(0.7), 0);
    }

    #[test]
    fn test_bucket_is_monotonic() {
        let tree = GameTreeAbstractor::new(7).unwrap();
        let mut previous = 0;
        for i in 0..=1000 {
            let bucket = tree.assign_bucket(i as f64 / 1000.0);
            assert!(bucket >= previous, "bucket fell at strength {}", i);
            assert!(bucket - previous <= 1);
            previous = bucket;
        }
        assert_eq!(previous, 6);
    }

    #[test]
    fn test_create_node_links_children() {
        let tree = small_tree();
        assert_eq!(tree.num_nodes(), 4);
        assert_eq!(tree.children("root").unwrap(), &["fold".to_string(), "call".to_string()]);
        assert!(tree.node("root").unwrap().parent().is_none());
        assert_eq!(tree.node("check").unwrap().parent(), Some("call"));
        assert_eq!(tree.node("fold").unwrap().payoff(), Some(&[-1.0, 1.0][..]));
    }

    #[test]
    fn test_create_node_rejects_bad_input() {
        let mut tree = small_tree();
        assert_eq!(
            tree.create_node("root", None, false, None).unwrap_err(),
            AbstractionError::DuplicateNode("root".to_string())
        );
        assert_eq!(
            tree.create_node("x", Some("nowhere"), false, None).unwrap_err(),
            AbstractionError::UnknownNode("nowhere".to_string())
        );
        assert_eq!(
            tree.create_node("x", Some("fold"), false, None).unwrap_err(),
            AbstractionError::TerminalParent("fold".to_string())
        );
        assert_eq!(
            tree.create_node("x", Some("root"), true, None).unwrap_err(),
            AbstractionError::MissingPayoff("x".to_string())
        );
        assert_eq!(
            tree.create_node("x", Some("root"), true, Some(vec![])).unwrap_err(),
            AbstractionError::MissingPayoff("x".to_string())
        );
        assert_eq!(
            tree.create_node("x", Some("root"), false, Some(vec![1.0, 1.0])).unwrap_err(),
            AbstractionError::UnexpectedPayoff("x".to_string())
        );
        assert!(matches!(
            tree.create_node("x", Some("root"), true, Some(vec![1.0, 0.0, -1.0])),
            Err(AbstractionError::PayoffLengthMismatch { expected: 2, actual: 3, .. })
        ));
        // Failed creations leave the tree untouched.
        assert_eq!(tree.num_nodes(), 4);
        assert_eq!(tree.children("root").unwrap().len(), 2);
    }

    #[test]
    fn test_strategy_space_counts_actions() {
        let mut tree = GameTreeAbstractor::new(10).unwrap();
        tree.create_information_set("a", "p1", ["fold", "call", "raise"], Some(0.2)).unwrap();
        tree.create_information_set("b", "p1", ["check", "bet"], None).unwrap();
        tree.create_information_set("c", "p2", ["fold", "call"], Some(0.9)).unwrap();
        assert_eq!(tree.get_abstracted_strategy_space(), (3, 7));
        assert_eq!(tree.num_information_sets(), 3);
    }

    #[test]
    fn test_information_set_validation() {
        let mut tree = GameTreeAbstractor::new(4).unwrap();
        tree.create_information_set("a", "p1", ["fold"], None).unwrap();
        assert_eq!(
            tree.create_information_set("a", "p1", ["call"], None).unwrap_err(),
            AbstractionError::DuplicateInformationSet("a".to_string())
        );
        assert_eq!(
            tree.create_information_set("b", "p1", Vec::<String>::new(), None).unwrap_err(),
            AbstractionError::NoActions("b".to_string())
        );
        assert_eq!(tree.information_set("a").unwrap().bucket(), None);
    }

    #[test]
    fn test_bucket_query_filters_by_player() {
        let mut tree = GameTreeAbstractor::new(10).unwrap();
        tree.create_information_set("p1_b", "p1", ["fold", "call"], Some(0.55)).unwrap();
        tree.create_information_set("p1_a", "p1", ["fold", "call"], Some(0.51)).unwrap();
        tree.create_information_set("p2_a", "p2", ["fold", "call"], Some(0.52)).unwrap();
        tree.create_information_set("p1_c", "p1", ["fold", "call"], Some(0.95)).unwrap();

        let ids: Vec<&str> = tree
            .get_information_set_by_bucket("p1", 5)
            .into_iter()
            .map(InformationSet::id)
            .collect();
        assert_eq!(ids, vec!["p1_a", "p1_b"]);
        assert_eq!(tree.get_information_set_by_bucket("p2", 5).len(), 1);
        assert!(tree.get_information_set_by_bucket("p2", 9).is_empty());
        assert_eq!(tree.bucket_occupancy("p1")[5], 2);
        assert_eq!(tree.bucket_occupancy("p1")[9], 1);
        assert_eq!(tree.information_sets_for_player("p1").len(), 3);
    }

    #[test]
    fn test_assign_information_set_shares_sets() {
        let mut tree = small_tree();
        tree.create_node("call2", Some("root"), false, None).unwrap();
        tree.create_information_set("p2_any", "p2", ["fold", "call"], Some(0.3)).unwrap();

        tree.assign_information_set("call", "p2_any").unwrap();
        tree.assign_information_set("call2", "p2_any").unwrap();

        let ids: Vec<&str> = tree
            .nodes_in_information_set("p2_any")
            .unwrap()
            .into_iter()
            .map(Node::id)
            .collect();
        assert_eq!(ids, vec!["call", "call2"]);
        assert_eq!(
            tree.information_set_for_node("call").unwrap().map(InformationSet::id),
            Some("p2_any")
        );
        assert_eq!(tree.information_set_for_node("root").unwrap(), None);
    }

    #[test]
    fn test_assign_information_set_rejects_bad_ids() {
        let mut tree = small_tree();
        tree.create_information_set("s", "p1", ["fold", "call"], None).unwrap();
        assert_eq!(
            tree.assign_information_set("nowhere", "s").unwrap_err(),
            AbstractionError::UnknownNode("nowhere".to_string())
        );
        assert_eq!(
            tree.assign_information_set("root", "missing").unwrap_err(),
            AbstractionError::UnknownInformationSet("missing".to_string())
        );
        assert_eq!(
            tree.assign_information_set("fold", "s").unwrap_err(),
            AbstractionError::TerminalNode("fold".to_string())
        );
    }

    #[test]
    fn test_structural_queries() {
        let tree = small_tree();
        assert_eq!(tree.path_to_root("check").unwrap(), vec!["check", "call", "root"]);
        assert_eq!(tree.depth("check").unwrap(), 2);
        assert_eq!(tree.depth("root").unwrap(), 0);

        let terminals: Vec<&str> = tree.terminal_nodes().into_iter().map(Node::id).collect();
        assert_eq!(terminals, vec!["check", "fold"]);
        assert!(tree.depth("missing").is_err());
    }

    #[test]
    fn test_set_bucket_clamps() {
        let mut tree = GameTreeAbstractor::new(5).unwrap();
        tree.create_information_set("s", "p1", ["fold", "call"], Some(0.1)).unwrap();
        assert_eq!(tree.information_set("s").unwrap().bucket(), Some(0));

        assert_eq!(tree.set_bucket("s", 3).unwrap(), 3);
        assert_eq!(tree.set_bucket("s", 99).unwrap(), 4);
        assert_eq!(tree.information_set("s").unwrap().bucket(), Some(4));
        assert!(tree.set_bucket("missing", 0).is_err());
    }
}
