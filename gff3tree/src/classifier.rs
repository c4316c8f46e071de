//! Comment / FASTA classifier (`spec.md` §4.2).

/// The category a raw input line falls into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    /// `#`-prefixed line with `depth < 2`.
    Comment(usize),
    /// `#`-prefixed line with `depth >= 2` (e.g. `##gff-version 3`).
    Directive(usize),
    /// `>name` FASTA header.
    FastaHeader(String),
    Data,
}

/// An inline comment delimiter declared via `Reader::has_comments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentPattern {
    /// Strip from the delimiter to end-of-line.
    Single(String),
    /// Strip matched enclosed spans (e.g. `/* ... */`).
    Pair(String, String),
}

/// Classifies a single input line.
pub fn classify(line: &str) -> LineClass {
    if line.trim().is_empty() {
        return LineClass::Blank;
    }
    if let Some(rest) = line.strip_prefix('>') {
        let name = rest.trim().split_whitespace().next().unwrap_or("").to_owned();
        return LineClass::FastaHeader(name);
    }
    if line.starts_with('#') {
        let depth = line.chars().take_while(|&c| c == '#').count();
        return if depth >= 2 {
            LineClass::Directive(depth)
        } else {
            LineClass::Comment(depth)
        };
    }
    LineClass::Data
}

/// Strips every declared inline comment pattern from `line` before
/// tokenization.
///
/// Pair patterns are applied first (removing every matched span), then
/// single delimiters cut the remainder from their first occurrence to
/// end-of-line. `spec.md` §9 leaves the interaction between inline
/// stripping and quoted `=`/`;` inside attribute values undefined; this
/// crate resolves it by stripping unconditionally, before the tokenizer
/// ever sees the line, so a quoted delimiter inside an attribute value is
/// indistinguishable from a real one and will still be stripped.
pub fn strip_inline_comments(line: &str, patterns: &[CommentPattern]) -> String {
    let mut out = line.to_owned();
    for pattern in patterns {
        if let CommentPattern::Pair(open, close) = pattern {
            out = strip_pair(&out, open, close);
        }
    }
    for pattern in patterns {
        if let CommentPattern::Single(delim) = pattern {
            if let Some(idx) = out.find(delim.as_str()) {
                out.truncate(idx);
            }
        }
    }
    out
}

fn strip_pair(line: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        match rest.find(open) {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => {
                out.push_str(&rest[..start]);
                let after_open = &rest[start + open.len()..];
                match after_open.find(close) {
                    None => break,
                    Some(end) => {
                        rest = &after_open[end + close.len()..];
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_variants() {
        assert_eq!(classify(""), LineClass::Blank);
        assert_eq!(classify("   "), LineClass::Blank);
        assert_eq!(classify("# a comment"), LineClass::Comment(1));
        assert_eq!(classify("##gff-version 3"), LineClass::Directive(2));
        assert_eq!(
            classify(">chr1 description"),
            LineClass::FastaHeader("chr1".into())
        );
        assert_eq!(
            classify("chr1\t.\tgene\t1\t2\t.\t+\t.\tID=a"),
            LineClass::Data
        );
    }

    #[test]
    fn strip_single_delimiter() {
        let patterns = vec![CommentPattern::Single("//".into())];
        let stripped = strip_inline_comments("data here // trailing note", &patterns);
        assert_eq!(stripped, "data here ");
    }

    #[test]
    fn strip_pair_delimiter() {
        let patterns = vec![CommentPattern::Pair("/*".into(), "*/".into())];
        let stripped = strip_inline_comments("a /* dropped */ b", &patterns);
        assert_eq!(stripped, "a  b");
    }
}
