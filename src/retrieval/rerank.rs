//! LLM-as-judge relevance reranker
//!
//! Reorders and optionally filters the fused candidate list. Every failure
//! path falls back to the pre-rerank order: the reranker must never empty
//! the context as a side effect of its own failure.

use crate::llm::ChatModel;
use crate::models::Candidate;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 200;

const JUDGE_SYSTEM_PROMPT: &str = "You are a relevance judge. Given a query and a list of document snippets, \
select the indices of the documents that are most relevant to the query. \
Return only the indices (0-indexed) of the relevant documents in order of \
relevance, separated by commas. If none are relevant, return nothing.";

pub struct RelevanceReranker {
    judge: Arc<dyn ChatModel>,
    call_timeout: Duration,
}

impl RelevanceReranker {
    pub fn new(judge: Arc<dyn ChatModel>, call_timeout: Duration) -> Self {
        Self {
            judge,
            call_timeout,
        }
    }

    /// Reorder `candidates` according to the judge's selection. The output
    /// may be shorter than the input; it is never empty unless the input was.
    pub async fn rerank(&self, query: &str, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let listing = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i, preview(&c.content)))
            .collect::<Vec<_>>()
            .join("\n\n");
        let user_prompt = format!("Query: {}\n\nDocuments:\n{}", query, listing);

        let reply = match timeout(
            self.call_timeout,
            self.judge.complete(JUDGE_SYSTEM_PROMPT, &user_prompt),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(stage = "rerank", "Judge call failed, keeping fused order: {}", e);
                return candidates;
            }
            Err(_) => {
                warn!(stage = "rerank", "Judge call timed out, keeping fused order");
                return candidates;
            }
        };

        match parse_judge_indices(&reply, candidates.len()) {
            Some(indices) => {
                debug!(selected = indices.len(), "Judge reordered candidates");
                reorder(candidates, &indices)
            }
            None => {
                warn!(
                    stage = "rerank",
                    "Judge returned no usable indices, keeping fused order"
                );
                candidates
            }
        }
    }
}

/// Strict parser for the judge's comma-separated index list.
///
/// Non-numeric tokens, out-of-range indices and repeats are discarded.
/// Returns `None` when nothing usable remains, so callers can fall back
/// explicitly instead of relying on exception-style control flow.
pub fn parse_judge_indices(reply: &str, len: usize) -> Option<Vec<usize>> {
    let mut indices: Vec<usize> = Vec::new();
    for token in reply.split(',') {
        if let Ok(idx) = token.trim().parse::<usize>() {
            if idx < len && !indices.contains(&idx) {
                indices.push(idx);
            }
        }
    }

    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}

fn reorder(candidates: Vec<Candidate>, indices: &[usize]) -> Vec<Candidate> {
    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    indices
        .iter()
        .filter_map(|&idx| slots[idx].take())
        .collect()
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatModel;
    use crate::models::CandidateOrigin;

    fn candidates(names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|n| Candidate::new(*n, 0.5, CandidateOrigin::Vector))
            .collect()
    }

    #[test]
    fn test_parser_discards_garbage_and_out_of_range() {
        assert_eq!(parse_judge_indices("2, 0, 1", 3), Some(vec![2, 0, 1]));
        assert_eq!(parse_judge_indices("1, foo, 9, 0", 3), Some(vec![1, 0]));
        assert_eq!(parse_judge_indices("0, 0, 1", 3), Some(vec![0, 1]));
        assert_eq!(parse_judge_indices("", 3), None);
        assert_eq!(parse_judge_indices("none relevant", 3), None);
        assert_eq!(parse_judge_indices("7, 8", 3), None);
    }

    #[tokio::test]
    async fn test_judge_selection_reorders_and_filters() {
        let judge = Arc::new(MockChatModel::always("2, 0"));
        let reranker = RelevanceReranker::new(judge, Duration::from_secs(1));

        let reranked = reranker
            .rerank("query", candidates(&["a", "b", "c"]))
            .await;

        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].content, "c");
        assert_eq!(reranked[1].content, "a");
    }

    #[tokio::test]
    async fn test_empty_judge_reply_keeps_fused_order() {
        let judge = Arc::new(MockChatModel::always(""));
        let reranker = RelevanceReranker::new(judge, Duration::from_secs(1));

        let reranked = reranker
            .rerank("query", candidates(&["a", "b"]))
            .await;

        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].content, "a");
        assert_eq!(reranked[1].content, "b");
    }

    #[tokio::test]
    async fn test_malformed_judge_reply_keeps_fused_order() {
        let judge = Arc::new(MockChatModel::always("the most relevant is clearly B"));
        let reranker = RelevanceReranker::new(judge, Duration::from_secs(1));

        let reranked = reranker
            .rerank("query", candidates(&["a", "b"]))
            .await;

        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].content, "a");
    }

    #[tokio::test]
    async fn test_judge_error_keeps_fused_order() {
        let judge = Arc::new(MockChatModel::failing("rate limited"));
        let reranker = RelevanceReranker::new(judge, Duration::from_secs(1));

        let reranked = reranker
            .rerank("query", candidates(&["a", "b"]))
            .await;

        assert_eq!(reranked.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_stays_empty() {
        let judge = Arc::new(MockChatModel::always("0"));
        let reranker = RelevanceReranker::new(judge, Duration::from_secs(1));
        assert!(reranker.rerank("query", vec![]).await.is_empty());
    }
}
