use std::collections::HashSet;

/// One source edit: the byte range `start..end` is replaced by `text`.
/// Insertions use `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Drop exact duplicate edits, keeping the first occurrence. Different
/// detection paths can surface the same node twice and both emit the same
/// fragment; applying it twice would corrupt the output.
pub fn uniq(fragments: &mut Vec<Fragment>) {
    let mut seen: HashSet<(usize, usize, String)> = HashSet::new();
    fragments.retain(|f| seen.insert((f.start, f.end, f.text.clone())));
}

/// Apply the edits to `src`. Fragments must be sorted by `(start, end)` and
/// non-overlapping; zero-width insertions may share a position with the
/// start of a following replacement.
pub fn splice(src: &str, fragments: &[Fragment]) -> String {
    let mut out = String::with_capacity(src.len() + 64);
    let mut cursor = 0usize;
    for f in fragments {
        debug_assert!(f.start >= cursor, "fragments overlap or are unsorted");
        out.push_str(&src[cursor..f.start]);
        out.push_str(&f.text);
        cursor = f.end;
    }
    out.push_str(&src[cursor..]);
    out
}

/// Map a byte offset in the original source to its offset in the spliced
/// output. Offsets inside a replaced span have no output position. The
/// fragment slice must be sorted by `(start, end)`.
pub fn output_offset(fragments: &[Fragment], pos: usize) -> Option<usize> {
    let mut delta: isize = 0;
    for f in fragments {
        if f.end <= pos {
            delta += f.text.len() as isize - (f.end - f.start) as isize;
        } else if f.start < pos {
            return None;
        } else {
            break;
        }
    }
    Some((pos as isize + delta) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(start: usize, end: usize, text: &str) -> Fragment {
        Fragment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn splice_inserts_and_replaces() {
        let src = "abcdef";
        let frags = vec![frag(1, 1, "X"), frag(3, 5, "Y")];
        assert_eq!(splice(src, &frags), "aXbcYf");
    }

    #[test]
    fn splice_deletes() {
        let src = "keep drop keep";
        let frags = vec![frag(4, 9, "")];
        assert_eq!(splice(src, &frags), "keep keep");
    }

    #[test]
    fn splice_insert_at_replacement_start() {
        let src = "abc";
        let frags = vec![frag(1, 1, "<"), frag(1, 2, "B")];
        assert_eq!(splice(src, &frags), "a<Bc");
    }

    #[test]
    fn uniq_drops_exact_duplicates() {
        let mut frags = vec![frag(0, 0, "x"), frag(0, 0, "x"), frag(0, 0, "y")];
        uniq(&mut frags);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].text, "x");
        assert_eq!(frags[1].text, "y");
    }

    #[test]
    fn output_offset_shifts_past_edits() {
        // "abcdef" -> "aXbcf" (insert X at 1, delete [4,5))
        let frags = vec![frag(1, 1, "X"), frag(4, 5, "")];
        assert_eq!(output_offset(&frags, 0), Some(0));
        assert_eq!(output_offset(&frags, 1), Some(2));
        assert_eq!(output_offset(&frags, 3), Some(4));
        assert_eq!(output_offset(&frags, 5), Some(5));
    }

    #[test]
    fn output_offset_inside_replacement_is_gone() {
        let frags = vec![frag(2, 6, "zz")];
        assert_eq!(output_offset(&frags, 4), None);
        assert_eq!(output_offset(&frags, 2), Some(2));
        assert_eq!(output_offset(&frags, 6), Some(4));
    }
}
