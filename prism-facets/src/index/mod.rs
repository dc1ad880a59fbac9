pub mod filter;
pub mod leaf;
pub mod mapper;

pub use filter::{Filter, FilterWeight, TermValue};
pub use leaf::{leaves, live_doc_sets, LeafContext, LeafDocSet};
pub use mapper::TypeMapper;
