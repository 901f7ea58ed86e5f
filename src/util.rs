use anyhow::{Context, Result};
use std::path::Path;

/// Read a file into a string with a path-bearing error message.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Line terminator used when synthesizing new statements, detected from the
/// last line break in the source. Sources without line breaks get "\n".
pub fn detect_eol(src: &str) -> &'static str {
    match src.rfind('\n') {
        Some(i) if i >= 1 && src.as_bytes()[i - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

/// Leading spaces and tabs of the line containing `pos`.
pub fn line_indent(src: &str, pos: usize) -> &str {
    let line_start = src[..pos.min(src.len())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let rest = &src[line_start..];
    let end = rest
        .bytes()
        .position(|b| b != b' ' && b != b'\t')
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Widen a deletion that starts at `pos` to also cover the preceding line
/// break and indentation, so removing a whole statement does not leave a
/// blank line behind. Returns `pos` unchanged when anything but whitespace
/// sits between the previous line break and `pos`.
pub fn skip_prev_newline(src: &str, pos: usize) -> usize {
    let Some(mut lf) = src[..pos.min(src.len())].rfind('\n') else {
        return pos;
    };
    if lf >= 1 && src.as_bytes()[lf - 1] == b'\r' {
        lf -= 1;
    }
    if src[lf..pos].chars().any(|c| !c.is_whitespace()) {
        return pos;
    }
    lf
}

/// 1-based line number of a byte offset, for diagnostics.
pub fn line_of(src: &str, pos: usize) -> usize {
    src[..pos.min(src.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eol_detection() {
        assert_eq!(detect_eol("a\nb\n"), "\n");
        assert_eq!(detect_eol("a\r\nb\r\n"), "\r\n");
        assert_eq!(detect_eol("no newline"), "\n");
        assert_eq!(detect_eol("\n"), "\n");
    }

    #[test]
    fn indent_of_line() {
        let src = "function f() {\n    var x = 1;\n}\n";
        let pos = src.find("var").unwrap();
        assert_eq!(line_indent(src, pos), "    ");
        assert_eq!(line_indent(src, 0), "");
    }

    #[test]
    fn indent_with_tabs() {
        let src = "{\n\t\tcall();\n}";
        let pos = src.find("call").unwrap();
        assert_eq!(line_indent(src, pos), "\t\t");
    }

    #[test]
    fn skip_newline_before_statement() {
        let src = "var a = 1;\n  a.$inject = [];";
        let pos = src.find("a.$inject").unwrap();
        assert_eq!(skip_prev_newline(src, pos), src.find('\n').unwrap());
    }

    #[test]
    fn skip_newline_crlf() {
        let src = "var a = 1;\r\na.$inject = [];";
        let pos = src.find("a.$inject").unwrap();
        assert_eq!(skip_prev_newline(src, pos), src.find('\r').unwrap());
    }

    #[test]
    fn skip_newline_stays_put_when_line_is_shared() {
        let src = "var a = 1; a.$inject = [];";
        let pos = src.find("a.$inject").unwrap();
        assert_eq!(skip_prev_newline(src, pos), pos);
    }

    #[test]
    fn line_numbers() {
        let src = "a\nb\nc";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 2), 2);
        assert_eq!(line_of(src, 4), 3);
    }
}
