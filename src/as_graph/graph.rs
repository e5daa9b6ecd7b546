use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::shared::{Crossing, Relationship, ValidationError};

pub type ASN = u32;

/// One AS-relationship record, as read from a CAIDA serial file or built
/// directly in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RelationshipRecord {
    pub a: ASN,
    pub b: ASN,
    pub relationship: Relationship,
}

impl RelationshipRecord {
    pub fn new(a: ASN, b: ASN, relationship: Relationship) -> Self {
        Self { a, b, relationship }
    }

    /// `provider` sells transit to `customer`.
    pub fn provider_to_customer(provider: ASN, customer: ASN) -> Self {
        Self::new(provider, customer, Relationship::ProviderToCustomer)
    }

    /// `customer` buys transit from `provider`.
    pub fn customer_to_provider(customer: ASN, provider: ASN) -> Self {
        Self::new(customer, provider, Relationship::CustomerToProvider)
    }

    pub fn peer_to_peer(a: ASN, b: ASN) -> Self {
        Self::new(a, b, Relationship::PeerToPeer)
    }

    pub fn sibling_to_sibling(a: ASN, b: ASN) -> Self {
        Self::new(a, b, Relationship::SiblingToSibling)
    }

    /// Canonical undirected form: endpoints ascending, relationship
    /// reoriented to match. Two records with the same meaning normalize
    /// identically no matter which endpoint was written first.
    fn normalized(&self) -> (ASN, ASN, Relationship) {
        if self.a <= self.b {
            (self.a, self.b, self.relationship)
        } else {
            (self.b, self.a, self.relationship.reversed())
        }
    }
}

/// Adjacency of one AS, partitioned by relationship class. Neighbor lists
/// hold graph indices, sorted ascending; index order equals ASN order.
#[derive(Debug)]
pub(crate) struct AsNode {
    pub(crate) asn: ASN,
    pub(crate) providers: Vec<u32>,
    pub(crate) peers: Vec<u32>,
    pub(crate) customers: Vec<u32>,
    pub(crate) siblings: Vec<u32>,
}

impl AsNode {
    fn new(asn: ASN) -> Self {
        Self {
            asn,
            providers: Vec::new(),
            peers: Vec::new(),
            customers: Vec::new(),
            siblings: Vec::new(),
        }
    }

    /// Neighbor lists paired with the crossing an export into them makes.
    pub(crate) fn classes(&self) -> [(Crossing, &[u32]); 4] {
        [
            (Crossing::ToCustomer, self.customers.as_slice()),
            (Crossing::ToPeer, self.peers.as_slice()),
            (Crossing::ToProvider, self.providers.as_slice()),
            (Crossing::ToSibling, self.siblings.as_slice()),
        ]
    }
}

/// Accumulates relationship records and validates them pair by pair.
///
/// Re-inserting a record that means the same thing as an existing one
/// (including the reversed orientation) is a no-op; assigning a different
/// relationship to an already-related pair is an error.
#[derive(Debug, Clone, Default)]
pub struct ASGraphBuilder {
    edges: BTreeMap<(ASN, ASN), Relationship>,
}

impl ASGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: RelationshipRecord) -> Result<(), ValidationError> {
        let (a, b, relationship) = record.normalized();
        if a == b {
            return Err(ValidationError::SelfReferential(a));
        }
        match self.edges.get(&(a, b)) {
            None => {
                self.edges.insert((a, b), relationship);
                Ok(())
            }
            Some(existing) if *existing == relationship => Ok(()),
            Some(_) => Err(ValidationError::ConflictingRelationship { a, b }),
        }
    }

    pub fn build(self) -> ASGraph {
        let asns: Vec<ASN> = self
            .edges
            .keys()
            .flat_map(|&(a, b)| [a, b])
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let asn_to_index: HashMap<ASN, u32> = asns
            .iter()
            .enumerate()
            .map(|(index, &asn)| (asn, index as u32))
            .collect();
        let mut nodes: Vec<AsNode> = asns.into_iter().map(AsNode::new).collect();

        for (&(a, b), &relationship) in &self.edges {
            let ia = asn_to_index[&a] as usize;
            let ib = asn_to_index[&b] as usize;
            match relationship {
                Relationship::ProviderToCustomer => {
                    nodes[ia].customers.push(ib as u32);
                    nodes[ib].providers.push(ia as u32);
                }
                Relationship::CustomerToProvider => {
                    nodes[ia].providers.push(ib as u32);
                    nodes[ib].customers.push(ia as u32);
                }
                Relationship::PeerToPeer => {
                    nodes[ia].peers.push(ib as u32);
                    nodes[ib].peers.push(ia as u32);
                }
                Relationship::SiblingToSibling => {
                    nodes[ia].siblings.push(ib as u32);
                    nodes[ib].siblings.push(ia as u32);
                }
            }
        }
        for node in &mut nodes {
            node.providers.sort_unstable();
            node.peers.sort_unstable();
            node.customers.sort_unstable();
            node.siblings.sort_unstable();
        }

        debug!(
            "built AS graph: {} ASes, {} relationships",
            nodes.len(),
            self.edges.len()
        );
        ASGraph {
            asn_to_index,
            nodes,
            edge_count: self.edges.len(),
        }
    }
}

/// Immutable AS-level topology with dense integer indexing.
///
/// Built once from relationship records, then shared freely (including
/// across threads) by any number of propagation runs. ASNs are mapped to
/// contiguous indices in ascending ASN order, so per-run state can live in
/// flat vectors instead of hash maps.
#[derive(Debug)]
pub struct ASGraph {
    asn_to_index: HashMap<ASN, u32>,
    nodes: Vec<AsNode>,
    edge_count: usize,
}

impl ASGraph {
    /// Builds a graph from a collection of records in one shot.
    pub fn build<I>(records: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = RelationshipRecord>,
    {
        let mut builder = ASGraphBuilder::new();
        for record in records {
            builder.insert(record)?;
        }
        Ok(builder.build())
    }

    /// Number of ASes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct AS pairs with a relationship.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains(&self, asn: ASN) -> bool {
        self.asn_to_index.contains_key(&asn)
    }

    /// Dense index of an AS, usable with [`ASGraph::asn_of`].
    pub fn index_of(&self, asn: ASN) -> Option<usize> {
        self.asn_to_index.get(&asn).map(|&index| index as usize)
    }

    pub fn asn_of(&self, index: usize) -> Option<ASN> {
        self.nodes.get(index).map(|node| node.asn)
    }

    /// All ASNs, ascending.
    pub fn asns(&self) -> impl Iterator<Item = ASN> + '_ {
        self.nodes.iter().map(|node| node.asn)
    }

    /// Providers of `asn`, ascending. Empty for an unknown ASN.
    pub fn providers_of(&self, asn: ASN) -> impl Iterator<Item = ASN> + '_ {
        self.class_of(asn, |node| &node.providers)
    }

    /// Peers of `asn`, ascending. Empty for an unknown ASN.
    pub fn peers_of(&self, asn: ASN) -> impl Iterator<Item = ASN> + '_ {
        self.class_of(asn, |node| &node.peers)
    }

    /// Customers of `asn`, ascending. Empty for an unknown ASN.
    pub fn customers_of(&self, asn: ASN) -> impl Iterator<Item = ASN> + '_ {
        self.class_of(asn, |node| &node.customers)
    }

    /// Siblings of `asn`, ascending. Empty for an unknown ASN.
    pub fn siblings_of(&self, asn: ASN) -> impl Iterator<Item = ASN> + '_ {
        self.class_of(asn, |node| &node.siblings)
    }

    /// Neighbors of `asn` across every relationship class.
    pub fn neighbors_of(&self, asn: ASN) -> impl Iterator<Item = ASN> + '_ {
        self.customers_of(asn)
            .chain(self.peers_of(asn))
            .chain(self.providers_of(asn))
            .chain(self.siblings_of(asn))
    }

    /// Classifies the edge from `from` to `to`, if one exists.
    pub fn crossing_between(&self, from: ASN, to: ASN) -> Option<Crossing> {
        let from_node = self.node(from)?;
        let to_index = *self.asn_to_index.get(&to)?;
        for (crossing, targets) in from_node.classes() {
            if targets.binary_search(&to_index).is_ok() {
                return Some(crossing);
            }
        }
        None
    }

    fn node(&self, asn: ASN) -> Option<&AsNode> {
        self.asn_to_index
            .get(&asn)
            .map(|&index| &self.nodes[index as usize])
    }

    fn class_of(
        &self,
        asn: ASN,
        pick: fn(&AsNode) -> &Vec<u32>,
    ) -> impl Iterator<Item = ASN> + '_ {
        self.node(asn)
            .map(|node| pick(node).as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&index| self.nodes[index as usize].asn)
    }

    pub(crate) fn node_at(&self, index: u32) -> &AsNode {
        &self.nodes[index as usize]
    }
}
