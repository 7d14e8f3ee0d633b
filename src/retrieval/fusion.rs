//! Reciprocal Rank Fusion
//!
//! Rank-based merging of the vector and graph result lists. RRF only looks
//! at rank positions, so cosine similarities and the graph's fixed 1.0
//! scores never need cross-source normalization.

use crate::models::Candidate;
use std::collections::HashMap;

/// Standard RRF constant from Cormack, Clarke & Buettcher (SIGIR 2009).
pub const RRF_K: usize = 60;

struct FusedEntry {
    candidate: Candidate,
    score: f32,
    first_seen: usize,
}

/// Merge two independently ranked candidate lists.
///
/// Each candidate at 0-based rank `r` contributes `1/(k + r + 1)` to an
/// accumulator keyed by its exact content string; a candidate present in
/// both lists accumulates both contributions into one merged entry. Output
/// is sorted by descending fused score, ties broken by first-seen order,
/// truncated to `top_k`. The merged candidate carries the fused score.
pub fn reciprocal_rank_fusion(
    vector_results: Vec<Candidate>,
    graph_results: Vec<Candidate>,
    k: usize,
    top_k: usize,
) -> Vec<Candidate> {
    let mut entries: Vec<FusedEntry> = Vec::new();
    let mut index_by_content: HashMap<String, usize> = HashMap::new();
    let mut seen = 0usize;

    for list in [vector_results, graph_results] {
        for (rank, candidate) in list.into_iter().enumerate() {
            let contribution = 1.0 / (k as f32 + rank as f32 + 1.0);

            match index_by_content.get(&candidate.content) {
                Some(&idx) => entries[idx].score += contribution,
                None => {
                    index_by_content.insert(candidate.content.clone(), entries.len());
                    entries.push(FusedEntry {
                        candidate,
                        score: contribution,
                        first_seen: seen,
                    });
                    seen += 1;
                }
            }
        }
    }

    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.first_seen.cmp(&b.first_seen))
    });

    entries
        .into_iter()
        .take(top_k)
        .map(|entry| {
            let mut candidate = entry.candidate;
            candidate.score = entry.score;
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CandidateOrigin;

    fn vector(content: &str, score: f32) -> Candidate {
        Candidate::new(content, score, CandidateOrigin::Vector)
    }

    fn graph(content: &str) -> Candidate {
        Candidate::new(content, 1.0, CandidateOrigin::Graph)
    }

    #[test]
    fn test_rank_one_in_both_lists_scores_two_over_k_plus_one() {
        let fused = reciprocal_rank_fusion(
            vec![vector("shared", 0.9)],
            vec![graph("shared")],
            RRF_K,
            5,
        );

        assert_eq!(fused.len(), 1);
        let expected = 2.0 / (RRF_K as f32 + 1.0);
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_single_list_rank_r_scores_reciprocal() {
        let fused = reciprocal_rank_fusion(
            vec![vector("a", 0.9), vector("b", 0.8), vector("c", 0.7)],
            vec![],
            RRF_K,
            5,
        );

        // 0-based rank r contributes 1/(k + r + 1)
        for (r, candidate) in fused.iter().enumerate() {
            let expected = 1.0 / (RRF_K as f32 + r as f32 + 1.0);
            assert!((candidate.score - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_identical_content_merges_and_sums() {
        let fused = reciprocal_rank_fusion(
            vec![vector("dup", 0.9), vector("only-vector", 0.5)],
            vec![graph("dup")],
            RRF_K,
            5,
        );

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].content, "dup");
        let expected = 1.0 / (RRF_K as f32 + 1.0) + 1.0 / (RRF_K as f32 + 1.0);
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_ties_break_by_first_seen_order() {
        // Rank 0 of each list scores identically; the vector candidate was
        // seen first and must stay first.
        let fused = reciprocal_rank_fusion(
            vec![vector("from-vector", 0.9)],
            vec![graph("from-graph")],
            RRF_K,
            5,
        );

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].content, "from-vector");
        assert_eq!(fused[1].content, "from-graph");
    }

    #[test]
    fn test_deterministic_across_runs() {
        let build = || {
            reciprocal_rank_fusion(
                vec![vector("x", 0.9), vector("y", 0.8), vector("z", 0.7)],
                vec![graph("z"), graph("w")],
                RRF_K,
                5,
            )
        };

        let first = build();
        let second = build();

        let ordering: Vec<(&str, f32)> =
            first.iter().map(|c| (c.content.as_str(), c.score)).collect();
        let again: Vec<(&str, f32)> =
            second.iter().map(|c| (c.content.as_str(), c.score)).collect();
        assert_eq!(ordering, again);
    }

    #[test]
    fn test_truncates_to_top_k() {
        let fused = reciprocal_rank_fusion(
            vec![vector("a", 0.9), vector("b", 0.8), vector("c", 0.7)],
            vec![graph("d"), graph("e")],
            RRF_K,
            3,
        );
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_both_empty() {
        let fused = reciprocal_rank_fusion(vec![], vec![], RRF_K, 5);
        assert!(fused.is_empty());
    }
}
