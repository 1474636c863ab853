//! Cosmetics catalog client and ownership heuristic
//!
//! Fetches the public battle-royale cosmetics catalog and projects it into
//! per-category "likely owned" buckets using source-tag keywords. The
//! projection is a heuristic over public metadata, not an entitlement
//! lookup — it answers "which catalog items were plausibly obtainable",
//! not "which items this account owns".
//!
//! Projection flow:
//! 1. `catalog::fetch_catalog()` pulls the full item dump (no cache)
//! 2. `classify::classify()` assigns each item its buckets
//! 3. `classify::project()` builds the serialized response: typed buckets
//!    capped at 200 items, exclusives uncapped, counts pre-truncation

pub mod catalog;
pub mod classify;
pub mod error;

pub use catalog::{CatalogItem, DEFAULT_CATALOG_URL, fetch_catalog};
pub use classify::{
    Bucket, BucketCounts, MAX_BUCKET_ITEMS, OWNED_TAG_KEYWORDS, OwnedItem, OwnershipProjection,
    classify, project,
};
pub use error::{Error, Result};
