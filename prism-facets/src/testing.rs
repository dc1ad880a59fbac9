//! In-memory index fixtures for unit tests.

use tantivy::indexer::NoMergePolicy;
use tantivy::schema::{Schema, FAST, INDEXED, STORED, STRING};
use tantivy::{Index, IndexWriter, Searcher, TantivyDocument, Term};

pub(crate) struct TestDoc {
    pub id: u64,
    pub kind: &'static str,
    pub color: Option<&'static str>,
    pub price: u64,
}

impl TestDoc {
    pub fn new(id: u64, color: &'static str, price: u64) -> Self {
        Self {
            id,
            kind: "product",
            color: Some(color),
            price,
        }
    }

    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    pub fn without_color(mut self) -> Self {
        self.color = None;
        self
    }
}

pub(crate) fn test_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_u64_field("id", INDEXED | STORED);
    builder.add_text_field("_type", STRING | FAST);
    builder.add_text_field("color", STRING | FAST | STORED);
    builder.add_u64_field("price", INDEXED | FAST | STORED);
    builder.build()
}

/// Builds an index with one segment per slice, then deletes the given ids.
pub(crate) fn build_searcher(segments: &[&[TestDoc]], deleted: &[u64]) -> Searcher {
    let schema = test_schema();
    let id = schema.get_field("id").unwrap();
    let kind = schema.get_field("_type").unwrap();
    let color = schema.get_field("color").unwrap();
    let price = schema.get_field("price").unwrap();

    let index = Index::create_in_ram(schema);
    let mut writer: IndexWriter = index.writer_with_num_threads(1, 15_000_000).unwrap();
    writer.set_merge_policy(Box::new(NoMergePolicy));

    for segment in segments {
        for doc in segment.iter() {
            let mut document = TantivyDocument::default();
            document.add_u64(id, doc.id);
            document.add_text(kind, doc.kind);
            if let Some(value) = doc.color {
                document.add_text(color, value);
            }
            document.add_u64(price, doc.price);
            writer.add_document(document).unwrap();
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
