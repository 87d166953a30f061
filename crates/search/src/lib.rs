mod corpus;
mod error;
mod fuzzy;
mod resolver;

pub use corpus::{CachedCorpus, DocumentLookup, MemoryCorpus, DEFAULT_CACHE_CAPACITY};
pub use error::{Result, SearchError};
pub use fuzzy::{SectionMatch, SectionMatcher, DEFAULT_MIN_MATCH_RUN};
pub use resolver::{locate_heading, CandidateResolver, HeadingLocation};
