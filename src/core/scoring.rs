use crate::models::{CandidateListing, ScoringWeights, SearchQuery};
use crate::core::filters::shared_tokens;

/// Calculate a match score (0-100) for a listing against a query
///
/// Scoring formula with the default weights:
/// score = (
///     token_overlap * 60 +         # share of query tokens in the title
///     price_fit * 20 +             # full inside budget, decays above it
///     verified * 12 +              # gold / verified supplier
///     rating / 5 * 8               # supplier rating
/// )
///
/// Returns `None` when the title shares no token with the query.
pub fn calculate_match_score(
    listing: &CandidateListing,
    query: &SearchQuery,
    weights: &ScoringWeights,
) -> Option<u8> {
    if query.tokens.is_empty() {
        return None;
    }

    let shared = shared_tokens(listing, query).len();
    if shared == 0 {
        return None;
    }

    let overlap = shared as f64 / query.tokens.len() as f64;
    let price = calculate_price_fit(listing.price_low(), query.max_price, weights.price_tolerance);
    let trust = calculate_trust(listing.verified, listing.rating, weights);

    let total = overlap * weights.token_overlap + price * weights.price_fit + trust;

    Some(total.round().clamp(0.0, 100.0) as u8)
}

/// Price fit (0-1)
/// 1 inside the budget, linear decay to 0 at `max_price * (1 + tolerance)`
#[inline]
fn calculate_price_fit(price_low: Option<f64>, max_price: f64, tolerance: f64) -> f64 {
    let Some(low) = price_low else {
        return 0.0;
    };

    if low <= max_price {
        return 1.0;
    }

    if max_price <= 0.0 || tolerance <= 0.0 {
        return 0.0;
    }

    let overshoot = (low - max_price) / max_price;
    (1.0 - overshoot / tolerance).max(0.0)
}

/// Trust points: verified bonus plus a share of the rating weight
#[inline]
fn calculate_trust(verified: bool, rating: f64, weights: &ScoringWeights) -> f64 {
    let verified_points = if verified { weights.verified } else { 0.0 };
    let rating_points = (rating / 5.0).clamp(0.0, 1.0) * weights.rating;

    verified_points + rating_points
}
