//! Bounded-vocabulary TF-IDF vectorizer
//!
//! Documents are already-cleaned texts: tokens are separated by whitespace.
//! The vocabulary keeps the `max_features` terms with the highest document
//! frequency (ties broken by term order) and lays them out in lexicographic
//! order. Weights are raw term counts times the smoothed inverse document
//! frequency `ln((1 + n) / (1 + df)) + 1`, L2-normalized per document.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Fitted TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_features: usize,
    /// term -> column index
    vocabulary: BTreeMap<String, usize>,
    /// column index -> term
    terms: Vec<String>,
    /// column index -> idf weight
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit on a corpus of cleaned documents
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Result<Self> {
        if max_features == 0 {
            return Err(PipelineError::config("max_features must be > 0"));
        }
        if documents.is_empty() {
            return Err(PipelineError::feature("Cannot fit a vectorizer on an empty corpus"));
        }

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<&str> = doc.as_ref().split_whitespace().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Rank by document frequency, then term
        let mut ranked: Vec<(&str, usize)> = doc_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let n_docs = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut terms = Vec::with_capacity(ranked.len());
        let mut idf = Vec::with_capacity(ranked.len());

        for (idx, (term, df)) in ranked.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), idx);
            terms.push(term.to_string());
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        Ok(Self {
            max_features,
            vocabulary,
            terms,
            idf,
        })
    }

    /// Transform one document into a dense, L2-normalized row
    pub fn transform_one(&self, document: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.terms.len()];
        for token in document.split_whitespace() {
            if let Some(&idx) = self.vocabulary.get(token) {
                row[idx] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in row.iter_mut() {
                *value /= norm;
            }
        }
        row
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Vec<Vec<f64>> {
        documents.iter().map(|d| self.transform_one(d.as_ref())).collect()
    }

    /// Terms in column order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn n_features(&self) -> usize {
        self.terms.len()
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }
}
