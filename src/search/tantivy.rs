//! Tantivy BM25 lexical index
//!
//! The corpus is the tokenized full text of every active listing (title
//! repeated three times, then description). Term statistics such as document
//! frequency and average length are corpus-wide, so the index is never patched:
//! any change to the listing set builds a fresh in-RAM index.
//!
//! Text is tokenized by [`tokenize`](crate::search::text::tokenize) before
//! indexing and the field uses a whitespace analyzer, so the index and the
//! query side agree on tokens exactly.

use std::collections::HashMap;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{TextAnalyzer, WhitespaceTokenizer};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::error::{ExoError, Result};
use crate::search::text::{full_text, tokenize};
use crate::storage::{ListingDocument, ListingId};

const TOKENIZER_NAME: &str = "exo_whitespace";

/// Writer heap for one indexing thread.
const WRITER_HEAP_BYTES: usize = 20_000_000;

/// Max-normalized BM25 scores keyed by listing id. Listings matching no query
/// term are absent and score zero.
pub type LexicalScores = HashMap<ListingId, f32>;

/// BM25 index over one snapshot of the active listings
pub struct Bm25Index {
    reader: IndexReader,
    fields: Bm25Fields,
    ids: Vec<ListingId>,
}

impl std::fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Index")
            .field("docs", &self.ids.len())
            .finish_non_exhaustive()
    }
}

/// Field handles for the BM25 schema
#[derive(Clone, Copy)]
struct Bm25Fields {
    id: Field,
    body: Field,
}

impl Bm25Index {
    /// Build a fresh index over the given listings.
    pub fn build(listings: &[ListingDocument]) -> Result<Self> {
        let schema = build_schema();
        let fields = extract_fields(&schema)?;

        let index = Index::create_in_ram(schema);
        index.tokenizers().register(
            TOKENIZER_NAME,
            TextAnalyzer::from(WhitespaceTokenizer::default()),
        );

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let mut ids = Vec::with_capacity(listings.len());
        for listing in listings {
            let mut doc = TantivyDocument::new();
            doc.add_i64(fields.id, listing.id);
            doc.add_text(fields.body, tokenize(&full_text(listing)).join(" "));
            writer.add_document(doc)?;
            ids.push(listing.id);
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            reader,
            fields,
            ids,
        })
    }

    /// Listing ids in indexing order
    pub fn ids(&self) -> &[ListingId] {
        &self.ids
    }

    /// Get total number of indexed documents
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Raw BM25 score of every listing matching at least one query token.
    pub fn raw_scores(&self, query_tokens: &[String]) -> Result<LexicalScores> {
        let searcher = self.reader.searcher();
        let limit = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if limit == 0 || query_tokens.is_empty() {
            return Ok(LexicalScores::new());
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = query_tokens
            .iter()
            .map(|token| {
                let term = Term::from_field_text(self.fields.body, token);
                let query: Box<dyn Query> =
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        let query = BooleanQuery::new(clauses);

        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut scores = LexicalScores::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_i64())
                .ok_or_else(|| {
                    ExoError::SearchIndex(tantivy::TantivyError::InternalError(
                        "indexed document without listing id".to_string(),
                    ))
                })?;
            *scores.entry(id).or_insert(0.0) += score.max(0.0);
        }

        Ok(scores)
    }

    /// BM25 scores divided by the best score of this query, in `[0, 1]`.
    ///
    /// Empty when no query token occurs in the corpus.
    pub fn score(&self, query_tokens: &[String]) -> Result<LexicalScores> {
        let mut scores = self.raw_scores(query_tokens)?;
        let max = scores.values().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return Ok(LexicalScores::new());
        }
        for value in scores.values_mut() {
            *value /= max;
        }
        Ok(scores)
    }
}

/// Build the Tantivy schema for listing indexing
fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(TOKENIZER_NAME)
            .set_index_option(IndexRecordOption::WithFreqs),
    );

    builder.add_i64_field("id", INDEXED | STORED | FAST);
    builder.add_text_field("body", text_options);

    builder.build()
}

/// Extract field handles from schema
fn extract_fields(schema: &Schema) -> Result<Bm25Fields> {
    Ok(Bm25Fields {
        id: schema.get_field("id").map_err(|_| {
            ExoError::SearchIndex(tantivy::TantivyError::SchemaError("missing id field".into()))
        })?,
        body: schema.get_field("body").map_err(|_| {
            ExoError::SearchIndex(tantivy::TantivyError::SchemaError("missing body field".into()))
        })?,
    })
}
