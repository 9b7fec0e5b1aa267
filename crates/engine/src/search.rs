//! Answer ranking over a working set.

use crate::embed::EmbeddingEngine;
use crate::error::EngineResult;
use doclink_core::embedding::cosine_similarity;
use doclink_core::working_set::WorkingSetUnit;
use doclink_core::{FileId, WorkingSet};
use serde::Serialize;
use std::sync::Arc;

/// A prepared, file-filtered search index over a working set.
///
/// Bundles the filtered rows, their embedding matrix, and per-row boost
/// factors into one owner.
#[derive(Clone, Debug)]
pub struct SearchIndex {
    rows: Vec<WorkingSetUnit>,
    matrix: Vec<Vec<f32>>,
    boosts: Vec<f32>,
}

impl SearchIndex {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A source reference backing an answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnswerResource {
    pub file_name: String,
    pub page_number: i32,
}

/// A ranked answer with its supporting sources.
#[derive(Clone, Debug, Serialize)]
pub struct Answer {
    pub answer: String,
    pub resources: Vec<AnswerResource>,
    pub resource_sentences: Vec<String>,
}

/// Ranks a query against the selected domain's working set.
///
/// The caller guarantees that the working set passed in is the
/// currently consistent one and that `file_ids` is a subset of its
/// membership; this engine only filters and scores.
pub trait AnswerEngine: Send + Sync {
    /// Restrict a working set to the given files and build an index.
    /// Returns `None` when nothing remains to search.
    fn filter_search(&self, working_set: &WorkingSet, file_ids: &[FileId]) -> Option<SearchIndex>;

    /// Rank the query against a prepared index.
    fn search(&self, query: &str, index: &SearchIndex) -> EngineResult<Answer>;
}

/// Cosine-similarity searcher with a small boost for header rows.
pub struct CosineSearcher {
    embedder: Arc<dyn EmbeddingEngine>,
    /// Number of sentences assembled into an answer.
    top_k: usize,
    /// Multiplier applied to header rows.
    header_boost: f32,
    /// Scores at or below this are treated as no match.
    min_score: f32,
}

impl CosineSearcher {
    pub fn new(embedder: Arc<dyn EmbeddingEngine>) -> Self {
        Self {
            embedder,
            top_k: 5,
            header_boost: 1.15,
            min_score: 0.0,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

impl AnswerEngine for CosineSearcher {
    fn filter_search(&self, working_set: &WorkingSet, file_ids: &[FileId]) -> Option<SearchIndex> {
        let mut rows = Vec::new();
        let mut matrix = Vec::new();
        let mut boosts = Vec::new();

        for (unit, embedding) in working_set.units.iter().zip(&working_set.embeddings) {
            if !file_ids.contains(&unit.file_id) {
                continue;
            }
            boosts.push(if unit.is_header { self.header_boost } else { 1.0 });
            rows.push(unit.clone());
            matrix.push(embedding.clone());
        }

        if rows.is_empty() {
            None
        } else {
            Some(SearchIndex {
                rows,
                matrix,
                boosts,
            })
        }
    }

    fn search(&self, query: &str, index: &SearchIndex) -> EngineResult<Answer> {
        let query_vec = self
            .embedder
            .embed(std::slice::from_ref(&query.to_string()))?
            .remove(0);

        let mut scored: Vec<(usize, f32)> = index
            .matrix
            .iter()
            .enumerate()
            .map(|(i, row)| (i, cosine_similarity(&query_vec, row) * index.boosts[i]))
            .filter(|(_, score)| *score > self.min_score)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k);

        if scored.is_empty() {
            return Ok(Answer {
                answer: "No relevant content found for this question in the selected files."
                    .to_string(),
                resources: Vec::new(),
                resource_sentences: Vec::new(),
            });
        }

        let mut resources: Vec<AnswerResource> = Vec::new();
        let mut resource_sentences = Vec::new();
        for (i, _) in &scored {
            let row = &index.rows[*i];
            let resource = AnswerResource {
                file_name: row.file_name.clone(),
                page_number: row.page_number,
            };
            if !resources.contains(&resource) {
                resources.push(resource);
            }
            resource_sentences.push(row.sentence.clone());
        }

        Ok(Answer {
            answer: resource_sentences.join(" "),
            resources,
            resource_sentences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbedder;
    use doclink_core::working_set::WorkingSetFile;
    use doclink_core::DomainId;

    fn build_working_set(embedder: &dyn EmbeddingEngine) -> (WorkingSet, FileId, FileId) {
        let cats = FileId::new();
        let finance = FileId::new();
        let sentences = [
            (cats, "cats.txt", "Cats chase mice in the garden."),
            (cats, "cats.txt", "Kittens sleep most of the day."),
            (finance, "report.txt", "Quarterly revenue exceeded projections."),
        ];

        let units: Vec<WorkingSetUnit> = sentences
            .iter()
            .map(|(file_id, name, s)| WorkingSetUnit {
                file_id: *file_id,
                file_name: name.to_string(),
                sentence: s.to_string(),
                page_number: 1,
                is_header: false,
                is_table: false,
            })
            .collect();
        let embeddings = embedder
            .embed(&units.iter().map(|u| u.sentence.clone()).collect::<Vec<_>>())
            .unwrap();

        let ws = WorkingSet::new(
            DomainId::new(),
            vec![
                WorkingSetFile {
                    file_id: cats,
                    file_name: "cats.txt".to_string(),
                },
                WorkingSetFile {
                    file_id: finance,
                    file_name: "report.txt".to_string(),
                },
            ],
            units,
            embeddings,
        )
        .unwrap();
        (ws, cats, finance)
    }

    #[test]
    fn test_filter_restricts_to_requested_files() {
        let embedder: Arc<dyn EmbeddingEngine> = Arc::new(HashEmbedder::new(128));
        let searcher = CosineSearcher::new(embedder.clone());
        let (ws, cats, finance) = build_working_set(embedder.as_ref());

        let index = searcher.filter_search(&ws, &[cats]).unwrap();
        assert_eq!(index.len(), 2);

        let index = searcher.filter_search(&ws, &[cats, finance]).unwrap();
        assert_eq!(index.len(), 3);

        assert!(searcher.filter_search(&ws, &[]).is_none());
    }

    #[test]
    fn test_search_ranks_matching_sentence_first() {
        let embedder: Arc<dyn EmbeddingEngine> = Arc::new(HashEmbedder::new(128));
        let searcher = CosineSearcher::new(embedder.clone()).with_top_k(1);
        let (ws, cats, finance) = build_working_set(embedder.as_ref());

        let index = searcher.filter_search(&ws, &[cats, finance]).unwrap();
        let answer = searcher
            .search("what do cats chase in the garden", &index)
            .unwrap();
        assert_eq!(answer.resource_sentences.len(), 1);
        assert!(answer.resource_sentences[0].contains("Cats chase mice"));
        assert_eq!(answer.resources[0].file_name, "cats.txt");
    }

    #[test]
    fn test_search_outside_filtered_files_finds_nothing_relevant() {
        let embedder: Arc<dyn EmbeddingEngine> = Arc::new(HashEmbedder::new(128));
        let searcher = CosineSearcher::new(embedder.clone()).with_top_k(1);
        let (ws, _cats, finance) = build_working_set(embedder.as_ref());

        // Only the finance file is selected; the cat sentence cannot appear.
        let index = searcher.filter_search(&ws, &[finance]).unwrap();
        let answer = searcher.search("cats chase mice", &index).unwrap();
        for sentence in &answer.resource_sentences {
            assert!(!sentence.contains("Cats chase mice"));
        }
    }
}
