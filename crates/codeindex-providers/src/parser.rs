//! A stub parser fake: produces exactly one whole-file block per input,
//! named after the file's stem. Good enough to drive the pipeline's
//! hash/batch/embed/upsert plumbing without a real language grammar.

use std::path::Path;

use async_trait::async_trait;
use codeindex_domain::entities::{CodeBlock, NodeType};
use codeindex_domain::error::Result;
use codeindex_domain::ports::Parser;

#[derive(Default)]
pub struct SingleBlockParser;

impl SingleBlockParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Parser for SingleBlockParser {
    async fn parse_file(&self, file_path: &str, content: &str, file_hash: &str) -> Result<Vec<CodeBlock>> {
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let identifier = Path::new(file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_path)
            .to_owned();
        let line_count = content.lines().count().max(1) as u32;
        Ok(vec![CodeBlock {
            segment_hash: format!("{file_hash}:0"),
            file_path: file_path.to_owned(),
            content: content.to_owned(),
            start_line: 0,
            end_line: line_count.saturating_sub(1),
            file_hash: file_hash.to_owned(),
            identifier,
            kind: NodeType::File,
            language: None,
            symbol_metadata: None,
            documentation: None,
            lsp_type_info: None,
            imports: Vec::new(),
            exports: Vec::new(),
        }])
    }
}
