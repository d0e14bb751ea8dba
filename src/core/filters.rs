use crate::models::{CandidateListing, SearchQuery};

/// Check a listing against the buyer's hard constraints
///
/// Verified-only and minimum rating exclude a listing outright. The
/// price ceiling is not checked here; scoring decays it instead.
#[inline]
pub fn matches_constraints(listing: &CandidateListing, query: &SearchQuery) -> bool {
    if query.verified_only && !listing.verified {
        return false;
    }

    if let Some(min_rating) = query.min_rating {
        if listing.rating < min_rating {
            return false;
        }
    }

    true
}

/// Query tokens that occur in the listing title
#[inline]
pub fn shared_tokens<'q>(listing: &CandidateListing, query: &'q SearchQuery) -> Vec<&'q str> {
    let title = listing.title.to_lowercase();
    query
        .tokens
        .iter()
        .filter(|token| title.contains(token.as_str()))
        .map(String::as_str)
        .collect()
}

/// Whether the listing's lowest price is within the ceiling
#[inline]
pub fn within_price_ceiling(listing: &CandidateListing, max_price: f64) -> bool {
    listing.price_low().is_some_and(|low| low <= max_price)
}
