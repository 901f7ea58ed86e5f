//! Source map generation. One token per analyzed node start, mapped from
//! the original source to its position in the edited output.

use oxc_sourcemap::SourceMapBuilder;

use crate::fragments::{self, Fragment};

/// Line starts of a text, for offset to line/column conversion. Columns
/// are UTF-16 code units, as source map consumers expect.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn line_col(&self, text: &str, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&s| s <= offset) - 1;
        let col = text[self.starts[line]..offset].encode_utf16().count();
        (line as u32, col as u32)
    }
}

/// Build a JSON source map for `out`, the result of applying the sorted
/// `fragments` to `src`. `positions` are original byte offsets in node
/// visit order; positions inside replaced spans carry no token.
pub fn build(
    source_name: &str,
    src: &str,
    out: &str,
    positions: &[usize],
    fragments: &[Fragment],
) -> String {
    let mut builder = SourceMapBuilder::default();
    let source_id = builder.add_source_and_content(source_name, src);

    let src_lines = LineIndex::new(src);
    let out_lines = LineIndex::new(out);

    let mut last_dst: Option<usize> = None;
    for &pos in positions {
        let Some(dst) = fragments::output_offset(fragments, pos) else {
            continue;
        };
        if last_dst == Some(dst) {
            continue;
        }
        last_dst = Some(dst);
        let (src_line, src_col) = src_lines.line_col(src, pos);
        let (dst_line, dst_col) = out_lines.line_col(out, dst);
        builder.add_token(dst_line, dst_col, src_line, src_col, Some(source_id), None);
    }

    builder.into_sourcemap().to_json_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::Fragment;

    #[test]
    fn line_index_counts_utf16_columns() {
        let text = "aé✓b\ncd";
        let index = LineIndex::new(text);
        let b_offset = text.find('b').unwrap();
        assert_eq!(index.line_col(text, b_offset), (0, 3));
        let d_offset = text.find('d').unwrap();
        assert_eq!(index.line_col(text, d_offset), (1, 1));
    }

    #[test]
    fn map_carries_source_and_tokens() {
        let src = "var x = f;\nvar y = g;\n";
        let fragments = vec![Fragment {
            start: 0,
            end: 0,
            text: "\"use strict\";\n".to_string(),
        }];
        let out = "\"use strict\";\nvar x = f;\nvar y = g;\n";
        let json = build("in.js", src, out, &[0, 11], &fragments);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["sources"][0], "in.js");
        assert!(!value["mappings"].as_str().unwrap().is_empty());
    }

    #[test]
    fn positions_inside_replaced_spans_are_dropped() {
        let fragments = vec![Fragment {
            start: 4,
            end: 8,
            text: String::new(),
        }];
        let src = "abcdWXYZefgh";
        let out = "abcdefgh";
        let json = build("in.js", src, out, &[0, 5, 9], &fragments);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        // offsets 0 and 9 survive, 5 is inside the removed span
        let mappings = value["mappings"].as_str().unwrap();
        assert_eq!(mappings.split(',').count(), 2);
    }
}
