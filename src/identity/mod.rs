//! Identity resolution: canonical UIDs, fuzzy matching and deduplication.

pub mod normalize;
pub mod similarity;
mod resolver;

pub use normalize::{normalize_text, AffiliationNormalizer};
pub use resolver::IdentityResolver;
pub use similarity::similarity;
