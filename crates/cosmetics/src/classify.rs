//! Ownership heuristic over catalog items
//!
//! There is no entitlement API behind this: the projection is a guess built
//! entirely from public catalog metadata. An item counts as "likely owned"
//! when its source tags say it was obtainable through a battle pass, Twitch
//! Prime, the item shop, a founder's pack or an event; items marked
//! exclusive anywhere in their metadata land in a separate bucket. Callers
//! present this as an estimate, never as account truth.

use serde::Serialize;

use crate::catalog::CatalogItem;

/// Source-tag fragments that mark an item as plausibly obtainable.
///
/// Matched case-insensitively as substrings of each gameplay tag, so
/// `Cosmetics.Source.ItemShop` matches `itemshop`.
pub const OWNED_TAG_KEYWORDS: &[&str] =
    &["battlepass", "twitchprime", "itemshop", "founder", "event"];

/// Marker for the exclusives bucket, checked against introduction text and
/// tags alike.
pub const EXCLUSIVE_MARKER: &str = "exclusive";

/// Cap per typed bucket in the serialized projection. Counts keep the real
/// totals; only the item arrays are truncated.
pub const MAX_BUCKET_ITEMS: usize = 200;

/// The buckets an item can land in. Typed buckets are gated on the item's
/// declared type; `Exclusives` is type-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Skins,
    Pickaxes,
    Emotes,
    Exclusives,
}

/// Classify one catalog item into zero or more buckets.
///
/// A keyword tag match puts the item in the bucket for its type (`outfit`,
/// `pickaxe`, `emote`; any other type gets nothing even on a match). The
/// exclusive marker independently adds `Exclusives`, so an outfit can be in
/// both `Skins` and `Exclusives` at once.
pub fn classify(item: &CatalogItem) -> Vec<Bucket> {
    let mut buckets = Vec::new();

    if has_owned_tag(item) {
        match item.type_value().to_lowercase().as_str() {
            "outfit" => buckets.push(Bucket::Skins),
            "pickaxe" => buckets.push(Bucket::Pickaxes),
            "emote" => buckets.push(Bucket::Emotes),
            _ => {}
        }
    }

    if has_exclusive_marker(item) {
        buckets.push(Bucket::Exclusives);
    }

    buckets
}

fn has_owned_tag(item: &CatalogItem) -> bool {
    item.tags().iter().any(|tag| {
        let tag = tag.to_lowercase();
        OWNED_TAG_KEYWORDS.iter().any(|keyword| tag.contains(keyword))
    })
}

fn has_exclusive_marker(item: &CatalogItem) -> bool {
    item.introduction_text()
        .to_lowercase()
        .contains(EXCLUSIVE_MARKER)
        || item
            .tags()
            .iter()
            .any(|tag| tag.to_lowercase().contains(EXCLUSIVE_MARKER))
}

/// One projected item, reduced to what clients render.
#[derive(Debug, Clone, Serialize)]
pub struct OwnedItem {
    pub name: String,
    pub image: String,
    pub rarity: String,
    pub id: String,
}

impl OwnedItem {
    fn from_catalog(item: &CatalogItem) -> Self {
        Self {
            name: item.name.clone(),
            image: item.icon().to_string(),
            rarity: item.rarity_value().to_string(),
            id: item.id.clone(),
        }
    }
}

/// True per-bucket totals, computed before any truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub skins: usize,
    pub pickaxes: usize,
    pub emotes: usize,
    pub exclusives: usize,
}

/// The full ownership guess returned to clients.
#[derive(Debug, Default, Serialize)]
pub struct OwnershipProjection {
    pub skins: Vec<OwnedItem>,
    pub pickaxes: Vec<OwnedItem>,
    pub emotes: Vec<OwnedItem>,
    pub exclusives: Vec<OwnedItem>,
    pub counts: BucketCounts,
}

/// Project a catalog into bucketed "likely owned" lists.
///
/// Single pass in catalog order. Typed buckets keep the first
/// `MAX_BUCKET_ITEMS` matches; `exclusives` is never truncated. `counts`
/// always reflect every match, so `counts.skins` can exceed `skins.len()`.
pub fn project(items: &[CatalogItem]) -> OwnershipProjection {
    let mut projection = OwnershipProjection::default();

    for item in items {
        for bucket in classify(item) {
            match bucket {
                Bucket::Skins => {
                    push_capped(&mut projection.skins, &mut projection.counts.skins, item);
                }
                Bucket::Pickaxes => {
                    push_capped(
                        &mut projection.pickaxes,
                        &mut projection.counts.pickaxes,
                        item,
                    );
                }
                Bucket::Emotes => {
                    push_capped(&mut projection.emotes, &mut projection.counts.emotes, item);
                }
                Bucket::Exclusives => {
                    projection.counts.exclusives += 1;
                    projection.exclusives.push(OwnedItem::from_catalog(item));
                }
            }
        }
    }

    projection
}

fn push_capped(list: &mut Vec<OwnedItem>, count: &mut usize, item: &CatalogItem) {
    *count += 1;
    if list.len() < MAX_BUCKET_ITEMS {
        list.push(OwnedItem::from_catalog(item));
    }
}
