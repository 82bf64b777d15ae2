use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

/// Composite (type tag, id) term, the upsert/delete key.
pub const KEY_FIELD: &str = "key";
pub const ID_FIELD: &str = "id";
pub const RECORD_TYPE_FIELD: &str = "record_type";
/// Full source map, stored as one JSON string.
pub const SOURCE_FIELD: &str = "source";
/// Concatenated scalar source values, the default query target.
pub const TEXT_FIELD: &str = "text";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _key_field = schema_builder.add_text_field(KEY_FIELD, STRING);
    let _id_field = schema_builder.add_text_field(ID_FIELD, STRING | STORED);
    let _record_type_field = schema_builder.add_text_field(RECORD_TYPE_FIELD, STRING | STORED);
    let _source_field = schema_builder.add_text_field(SOURCE_FIELD, STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer("text_with_stopwords")
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
    let _text_field = schema_builder.add_text_field(TEXT_FIELD, text_options);
    schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
    let stop_words = vec![
        "a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
    ];
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
        .build();
    index.tokenizers().register("text_with_stopwords", tokenizer);
}

/// Term value identifying one document: the type tag and id joined by a NUL
/// separator.
pub fn doc_key(record_type: &str, id: &str) -> String {
    format!("{record_type}\u{0}{id}")
}
