//! Abstraction layer: shrinks large hand spaces before solving.
//!
//! - [`HistogramAbstractor`]: equity samples to histograms, earth mover's
//!   distance, and clustering of hands into strength-ordered buckets
//! - [`GameTreeAbstractor`]: id-keyed registry of decision nodes and
//!   information sets, bucketed by hand strength
//!
//! The two are independent. A caller typically clusters hands first and then
//! writes the resulting bucket ids onto information sets with
//! [`GameTreeAbstractor::set_bucket`].

pub mod config;
pub mod histogram;
pub mod tree;

pub use config::AbstractionConfig;
pub use histogram::{Histogram, HistogramAbstractor};
pub use tree::{GameTreeAbstractor, InfoSetId, InformationSet, Node, NodeId};
