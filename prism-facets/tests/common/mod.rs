//! Shared fixtures: a small product catalogue spread over several segments.

#![allow(dead_code)]

use prism_facets::config::SearchConfig;
use prism_facets::facet::SearchContextFacets;
use prism_facets::index::Filter;
use prism_facets::search::{ContextId, SearchContext};
use tantivy::indexer::NoMergePolicy;
use tantivy::query::Query;
use tantivy::schema::{Schema, FAST, INDEXED, STORED, STRING};
use tantivy::{Index, IndexWriter, Searcher, TantivyDocument, Term};

pub struct Product {
    pub id: u64,
    pub kind: &'static str,
    pub color: &'static str,
    pub price: u64,
}

pub fn product(id: u64, color: &'static str, price: u64) -> Product {
    Product {
        id,
        kind: "product",
        color,
        price,
    }
}

pub fn bundle(id: u64, color: &'static str, price: u64) -> Product {
    Product {
        id,
        kind: "bundle",
        color,
        price,
    }
}

pub fn schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_u64_field("id", INDEXED | STORED);
    builder.add_text_field("_type", STRING | FAST);
    builder.add_text_field("color", STRING | FAST | STORED);
    builder.add_u64_field("price", INDEXED | FAST | STORED);
    builder.build()
}

/// One commit per segment, then a final commit deleting `deleted` ids.
pub fn searcher(segments: &[&[Product]], deleted: &[u64]) -> Searcher {
    let schema = schema();
    let id = schema.get_field("id").unwrap();
    let kind = schema.get_field("_type").unwrap();
    let color = schema.get_field("color").unwrap();
    let price = schema.get_field("price").unwrap();

    let index = Index::create_in_ram(schema);
    let mut writer: IndexWriter = index.writer_with_num_threads(1, 15_000_000).unwrap();
    writer.set_merge_policy(Box::new(NoMergePolicy));

    for segment in segments {
        for p in segment.iter() {
            let mut doc = TantivyDocument::default();
            doc.add_u64(id, p.id);
            doc.add_text(kind, p.kind);
            doc.add_text(color, p.color);
            doc.add_u64(price, p.price);
            writer.add_document(doc).unwrap();
        }
        writer.commit().unwrap();
    }
    if !deleted.is_empty() {
        for doc_id in deleted {
            writer.delete_term(Term::from_field_u64(id, *doc_id));
        }
        writer.commit().unwrap();
    }

    index.reader().unwrap().searcher()
}

/// Five products in two segments: three red, two blue.
pub fn catalogue() -> Searcher {
    searcher(
        &[
            &[
                product(1, "red", 10),
                product(2, "blue", 20),
                product(3, "red", 30),
            ],
            &[product(4, "red", 40), product(5, "blue", 50)],
        ],
        &[],
    )
}

pub fn query(searcher: &Searcher, filter: Filter) -> Box<dyn Query> {
    filter.to_query(searcher.schema()).unwrap()
}

pub fn context(searcher: Searcher, facets: SearchContextFacets) -> SearchContext {
    SearchContext::new(ContextId::new("catalogue", 0, 1), searcher, &SearchConfig::default())
        .with_facets(facets)
}
