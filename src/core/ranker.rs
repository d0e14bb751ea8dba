use crate::models::{CandidateListing, ScoredListing, ScoringWeights, SearchQuery};
use crate::core::{filters::matches_constraints, scoring::calculate_match_score};
use std::cmp::Ordering;

/// Result of the ranking process
#[derive(Debug)]
pub struct RankResult {
    pub listings: Vec<ScoredListing>,
    pub total_candidates: usize,
}

/// Scoring and ranking engine
///
/// # Pipeline Stages
/// 1. Buyer constraint filter (verified-only, minimum rating)
/// 2. Scoring, dropping listings that share no token with the query
/// 3. Deterministic ordering
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: ScoringWeights,
}

impl Ranker {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score and order candidates for a query
    ///
    /// Output is sorted by match score, then rating, then review count,
    /// all descending, with the listing id as the final tie-break.
    pub fn rank(&self, query: &SearchQuery, candidates: Vec<CandidateListing>) -> RankResult {
        let total_candidates = candidates.len();

        let mut listings: Vec<ScoredListing> = candidates
            .into_iter()
            .filter(|listing| matches_constraints(listing, query))
            .filter_map(|listing| {
                calculate_match_score(&listing, query, &self.weights).map(|match_score| {
                    ScoredListing {
                        listing,
                        match_score,
                    }
                })
            })
            .collect();

        listings.sort_by(compare_ranked);

        RankResult {
            listings,
            total_candidates,
        }
    }

    /// Order listings without relevance scoring
    ///
    /// Used when there is nothing to match against. Every listing gets a
    /// zero score and the usual rating and review tie-breaks apply.
    pub fn browse(&self, candidates: Vec<CandidateListing>) -> RankResult {
        let total_candidates = candidates.len();

        let mut listings: Vec<ScoredListing> = candidates
            .into_iter()
            .map(|listing| ScoredListing {
                listing,
                match_score: 0,
            })
            .collect();

        listings.sort_by(compare_ranked);

        RankResult {
            listings,
            total_candidates,
        }
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Total order used for result lists
pub fn compare_ranked(a: &ScoredListing, b: &ScoredListing) -> Ordering {
    b.match_score
        .cmp(&a.match_score)
        .then_with(|| b.listing.rating.total_cmp(&a.listing.rating))
        .then_with(|| b.listing.review_count.cmp(&a.listing.review_count))
        .then_with(|| a.listing.id.cmp(&b.listing.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceRange;

    fn create_candidate(id: &str, title: &str, price_low: f64, verified: bool, rating: f64, reviews: u32) -> CandidateListing {
        CandidateListing {
            id: id.to_string(),
            title: title.to_string(),
            supplier_name: format!("Supplier {}", id),
            supplier_id: None,
            price: Some(PriceRange::new(price_low, price_low * 1.5)),
            minimum_order_quantity: Some(100),
            rating,
            review_count: reviews,
            verified,
            region: "Guangdong, China".to_string(),
            response_time_hint: "< 2h".to_string(),
            image_url: String::new(),
            source_url: String::new(),
        }
    }

    fn create_query(tokens: &[&str]) -> SearchQuery {
        let mut query = SearchQuery::from_tokens(tokens.iter().copied());
        query.max_price = 10.0;
        query
    }

    #[test]
    fn test_rank_basic() {
        let ranker = Ranker::with_default_weights();
        let query = create_query(&["earbuds"]);

        let candidates = vec![
            create_candidate("1", "TWS Wireless Earbuds", 4.2, true, 4.9, 127), // Match
            create_candidate("2", "Phone Case", 1.0, true, 5.0, 500),           // No shared token
        ];

        let result = ranker.rank(&query, candidates);

        assert_eq!(result.total_candidates, 2);
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].listing.id, "1");
    }

    #[test]
    fn test_rank_sorted_with_tie_breaks() {
        let ranker = Ranker::with_default_weights();
        let query = create_query(&["earbuds", "wireless"]);

        let candidates = vec![
            create_candidate("a", "Earbuds", 4.0, false, 4.0, 10),
            create_candidate("b", "Wireless Earbuds", 4.0, false, 4.0, 10),
            create_candidate("c", "Earbuds", 4.0, false, 4.0, 90),
            create_candidate("d", "Earbuds", 4.0, false, 4.0, 10),
        ];

        let result = ranker.rank(&query, candidates);
        let ids: Vec<&str> = result.listings.iter().map(|l| l.listing.id.as_str()).collect();

        assert_eq!(ids, vec!["b", "c", "a", "d"]);

        for pair in result.listings.windows(2) {
            assert!(
                pair[0].match_score > pair[1].match_score
                    || (pair[0].match_score == pair[1].match_score
                        && pair[0].listing.rating >= pair[1].listing.rating)
            );
        }
    }

    #[test]
    fn test_rank_applies_constraints() {
        let ranker = Ranker::with_default_weights();
        let mut query = create_query(&["earbuds"]);
        query.verified_only = true;
        query.min_rating = Some(4.5);

        let candidates = vec![
            create_candidate("1", "Earbuds", 4.0, true, 4.9, 10),
            create_candidate("2", "Earbuds", 4.0, false, 4.9, 10), // Not verified
            create_candidate("3", "Earbuds", 4.0, true, 4.0, 10),  // Rating too low
        ];

        let result = ranker.rank(&query, candidates);
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].listing.id, "1");
    }

    #[test]
    fn test_over_budget_still_ranked() {
        let ranker = Ranker::with_default_weights();
        let query = create_query(&["earbuds"]);

        let candidates = vec![
            create_candidate("cheap", "Earbuds", 5.0, false, 4.0, 10),
            create_candidate("pricey", "Earbuds", 15.0, false, 4.0, 10),
        ];

        let result = ranker.rank(&query, candidates);
        assert_eq!(result.listings.len(), 2);
        assert_eq!(result.listings[1].listing.id, "pricey");
    }

    #[test]
    fn test_empty_candidates() {
        let ranker = Ranker::default();
        let result = ranker.rank(&create_query(&["earbuds"]), vec![]);
        assert!(result.listings.is_empty());
        assert_eq!(result.total_candidates, 0);
    }

    #[test]
    fn test_browse_orders_by_rating() {
        let ranker = Ranker::default();
        let candidates = vec![
            create_candidate("1", "Earbuds", 4.0, false, 4.1, 10),
            create_candidate("2", "Charger", 4.0, false, 4.8, 10),
        ];

        let result = ranker.browse(candidates);
        assert_eq!(result.listings[0].listing.id, "2");
        assert!(result.listings.iter().all(|l| l.match_score == 0));
    }
}
