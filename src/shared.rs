use std::fmt;

use thiserror::Error;

use crate::as_graph::ASN;

/// Relationship code of a single AS-relationship record, using the CAIDA
/// serial conventions: `a|b|-1` means `a` is a provider of `b`, `a|b|0`
/// means `a` and `b` peer. Code `1` is the reversed orientation of `-1`
/// and code `2` marks siblings (mutual full transit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(i8)]
pub enum Relationship {
    ProviderToCustomer = -1,
    PeerToPeer = 0,
    CustomerToProvider = 1,
    SiblingToSibling = 2,
}

impl Relationship {
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            -1 => Some(Relationship::ProviderToCustomer),
            0 => Some(Relationship::PeerToPeer),
            1 => Some(Relationship::CustomerToProvider),
            2 => Some(Relationship::SiblingToSibling),
            _ => None,
        }
    }

    pub fn code(&self) -> i8 {
        *self as i8
    }

    /// The same relationship seen from the other endpoint.
    pub fn reversed(&self) -> Self {
        match self {
            Relationship::ProviderToCustomer => Relationship::CustomerToProvider,
            Relationship::CustomerToProvider => Relationship::ProviderToCustomer,
            Relationship::PeerToPeer => Relationship::PeerToPeer,
            Relationship::SiblingToSibling => Relationship::SiblingToSibling,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Relationship::ProviderToCustomer => "PROVIDER_TO_CUSTOMER",
            Relationship::PeerToPeer => "PEER_TO_PEER",
            Relationship::CustomerToProvider => "CUSTOMER_TO_PROVIDER",
            Relationship::SiblingToSibling => "SIBLING_TO_SIBLING",
        };
        write!(f, "{}", s)
    }
}

/// Direction class of one edge traversal, from the exporting AS to the
/// importing AS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Crossing {
    ToProvider = 0,
    ToPeer = 1,
    ToCustomer = 2,
    ToSibling = 3,
}

impl fmt::Display for Crossing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Crossing::ToProvider => "TO_PROVIDER",
            Crossing::ToPeer => "TO_PEER",
            Crossing::ToCustomer => "TO_CUSTOMER",
            Crossing::ToSibling => "TO_SIBLING",
        };
        write!(f, "{}", s)
    }
}

/// Phase a route is in after its last edge crossing. Valley-free export
/// never lets a path return to a lower ordinal, and ranking prefers the
/// lower ordinal: customer-learned routes beat peer-learned routes beat
/// provider-learned routes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(u8)]
pub enum PropagationPhase {
    Up = 0,
    Peer = 1,
    Down = 2,
}

impl fmt::Display for PropagationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropagationPhase::Up => "UP",
            PropagationPhase::Peer => "PEER",
            PropagationPhase::Down => "DOWN",
        };
        write!(f, "{}", s)
    }
}

/// Final ranking key between candidate routes that tie on phase and
/// effective length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TieBreak {
    #[default]
    LowestNextHop,
    HighestNextHop,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TieBreak::LowestNextHop => "LOWEST_NEXT_HOP",
            TieBreak::HighestNextHop => "HIGHEST_NEXT_HOP",
        };
        write!(f, "{}", s)
    }
}

/// Rejected while building an [`crate::ASGraph`] from relationship records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A record relates an AS to itself.
    #[error("AS{0} appears on both sides of a relationship record")]
    SelfReferential(ASN),
    /// Two records assign different relationships to the same AS pair.
    #[error("conflicting relationships recorded for AS{a} and AS{b}")]
    ConflictingRelationship { a: ASN, b: ASN },
}

/// Rejected while validating an [`crate::Announcement`] against a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnouncementError {
    #[error("announcement has no origin ASes")]
    NoOrigins,
    #[error("origin AS{0} is not in the AS graph")]
    UnknownOrigin(ASN),
    #[error("origin AS{0} is in the announcement's poison set")]
    PoisonedOrigin(ASN),
    /// An export scope or prepend names an AS that the origin has no edge to.
    #[error("AS{neighbor} is not a neighbor of origin AS{origin}")]
    NotANeighbor { origin: ASN, neighbor: ASN },
    /// An export scope or prepend is configured for an AS that announces nothing.
    #[error("AS{0} has export settings but is not an origin")]
    NotAnOrigin(ASN),
}

/// Failures while fetching or parsing CAIDA AS-relationship data.
#[derive(Debug, Error)]
pub enum CaidaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("download of {url} failed with HTTP status {status}")]
    Download { url: String, status: u16 },
    #[error("malformed relationship record at line {line}: {content:?}")]
    Parse { line: usize, content: String },
    #[error("invalid relationship data: {0}")]
    Validation(#[from] ValidationError),
}

/// A settled routing table entry that breaks one of the propagation
/// invariants. Produced by the checks in [`crate::propagation::invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("AS{asn} holds an entry with an empty path")]
    EmptyPath { asn: ASN },
    #[error("AS{asn} holds a path owned by AS{owner}")]
    WrongOwner { asn: ASN, owner: ASN },
    #[error("AS{asn} holds a path that repeats AS{hop}")]
    RepeatedHop { asn: ASN, hop: ASN },
    #[error("AS{asn} holds a path originated by AS{origin}, which announced nothing")]
    ForeignOrigin { asn: ASN, origin: ASN },
    #[error("AS{asn} holds a path through poisoned AS{hop}")]
    PoisonedHop { asn: ASN, hop: ASN },
    #[error("AS{asn} holds a path {path:?} that is not a valley-free walk of the graph")]
    IllegalPath { asn: ASN, path: Vec<ASN> },
    #[error("AS{asn} records phase {recorded} but its path travels in phase {traced}")]
    PhaseMismatch {
        asn: ASN,
        recorded: PropagationPhase,
        traced: PropagationPhase,
    },
    #[error("AS{asn} holds an alternate path {path:?} that does not tie its primary path")]
    AlternateMismatch { asn: ASN, path: Vec<ASN> },
}
