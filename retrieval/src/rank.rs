//! Cosine ranking under the lnc.ltc scheme.
//!
//! Documents are weighted by log-tf and cosine-normalized without idf (see
//! [`DocumentNorms`]); queries by log-tf times idf, cosine-normalized. The
//! asymmetry is deliberate and changes scores if made symmetric.

use crate::error::{Error, Result};
use crate::index::{log_tf, DocumentId, DocumentNorms, InvertedIndex};
use crate::Term;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub doc_id: DocumentId,
    pub score: f64,
}

/// Top-k hits plus the number of documents that scored at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedList {
    pub total_hits: usize,
    pub hits: Vec<ScoredDocument>,
}

/// Normalized ltc query weights keyed by term. Out-of-vocabulary terms weigh 0.
fn query_weights<'q>(query_terms: &'q [Term], index: &InvertedIndex, n: usize) -> BTreeMap<&'q str, f64> {
    let mut tf_q: BTreeMap<&'q str, u32> = BTreeMap::new();
    for t in query_terms {
        *tf_q.entry(t.as_str()).or_insert(0) += 1;
    }

    let mut weights: BTreeMap<&'q str, f64> = tf_q
        .into_iter()
        .map(|(term, tf)| {
            let w = match index.get(term) {
                Some(entry) => {
                    let df = entry.document_frequency;
                    let idf = if df > 0 { (n as f64 / f64::from(df)).log10() } else { 0.0 };
                    log_tf(tf) * idf
                }
                None => 0.0,
            };
            (term, w)
        })
        .collect();

    let qlen = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if qlen > 0.0 {
        for w in weights.values_mut() {
            *w /= qlen;
        }
    }
    weights
}

/// Rank documents against already-normalized query terms.
///
/// Ties break by ascending `DocumentId`. A query sharing no weighted term with
/// the corpus yields an empty list.
pub fn rank(query_terms: &[Term], index: &InvertedIndex, norms: &DocumentNorms, top_k: usize) -> Result<RankedList> {
    if top_k == 0 {
        return Err(Error::InvalidInput("top_k must be at least 1".into()));
    }

    let weights = query_weights(query_terms, index, norms.len());
    let mut scores: HashMap<&DocumentId, f64> = HashMap::new();
    for (term, q_w) in &weights {
        if *q_w <= 0.0 {
            continue;
        }
        let Some(entry) = index.get(term) else { continue };
        for p in &entry.postings {
            let norm = norms
                .get(&p.doc_id)
                .ok_or_else(|| Error::Inconsistent(format!("posting for {term:?} references {} which has no norm", p.doc_id)))?;
            let divisor = if norm > 0.0 { norm } else { 1.0 };
            let d_w = log_tf(p.term_frequency) / divisor;
            *scores.entry(&p.doc_id).or_insert(0.0) += q_w * d_w;
        }
    }

    let mut scored: Vec<ScoredDocument> = scores
        .into_iter()
        .map(|(doc_id, score)| ScoredDocument { doc_id: doc_id.clone(), score })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    let total_hits = scored.len();
    scored.truncate(top_k);
    Ok(RankedList { total_hits, hits: scored })
}
