//! Emitter (`spec.md` §4.7): renders a feature (or subtree) back to GFF3
//! text, re-expanding coalesced multi-line features.

use crate::attrs::{AttrMap, AttrValue};
use crate::store::{Forest, Node, NodeId, ROOT};
use crate::strand::Phase;
use crate::tokenizer::percent_encode;

fn is_hidden(key: &str) -> bool {
    key.starts_with('_') || key.ends_with("_array")
}

fn encode_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Scalar(s) => percent_encode(s),
        AttrValue::List(vs) => vs.iter().map(|s| percent_encode(s)).collect::<Vec<_>>().join(","),
    }
}

fn column_from_pairs<'a>(pairs: impl Iterator<Item = (&'a str, &'a AttrValue)>) -> String {
    pairs
        .filter(|(k, _)| !is_hidden(k))
        .map(|(k, v)| format!("{}={}", k, encode_value(v)))
        .collect::<Vec<_>>()
        .join(";")
}

fn render_line(node: &Node, start: u64, end: u64, score: &str, phase: Phase, column9: &str) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        node.seq_name, node.source, node.feature_type, start, end, score, node.strand, phase, column9
    )
}

/// `spec.md` §4.7 `as_string`: one line per segment, or one line for a
/// single-line feature. Returns an empty string for a suppressed
/// duplicate (`skip_duplicates`), so callers can filter blank results.
pub fn as_string(forest: &Forest, node_id: NodeId, skip_duplicates: bool) -> String {
    let node = forest.get(node_id);
    if skip_duplicates && node.is_duplicate {
        return String::new();
    }

    match &node.segments {
        None => {
            let column9 = column_from_pairs(node.attributes.iter().map(|(k, v)| (k.as_str(), v)));
            render_line(node, node.start, node.end, &node.score, node.phase, &column9)
        }
        Some(segs) => {
            let mut lines = Vec::with_capacity(segs.start_array.len());
            for i in 0..segs.start_array.len() {
                let pairs = segs
                    .attr_arrays
                    .iter()
                    .filter_map(|(k, values)| values[i].as_ref().map(|v| (k.as_str(), v)));
                let column9 = column_from_pairs(pairs);
                lines.push(render_line(
                    node,
                    segs.start_array[i],
                    segs.end_array[i],
                    &segs.score_array[i],
                    segs.phase_array[i],
                    &column9,
                ));
            }
            lines.join("\n")
        }
    }
}

/// `spec.md` §4.7 `structured_output`: depth-first, insertion order;
/// a subtree rooted at a `_skip`-marked node is elided entirely.
pub fn structured_output(forest: &Forest, node_id: NodeId, skip_duplicates: bool) -> String {
    let mut out = String::new();
    write_subtree(forest, node_id, skip_duplicates, &mut out);
    out
}

fn write_subtree(forest: &Forest, node_id: NodeId, skip_duplicates: bool, out: &mut String) {
    let node = forest.get(node_id);
    if node.is_skipped {
        return;
    }
    if node_id != ROOT {
        let line = as_string(forest, node_id, skip_duplicates);
        if !line.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&line);
        }
    }
    for &child in &node.children {
        write_subtree(forest, child, skip_duplicates, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttrMap;
    use crate::strand::Strand;

    fn leaf(id: &str) -> Node {
        let mut attrs = AttrMap::new();
        let _ = attrs.insert("ID".to_owned(), AttrValue::Scalar(id.to_owned()));
        Node {
            seq_name: "chr1".to_owned(),
            source: ".".to_owned(),
            feature_type: "gene".to_owned(),
            start: 10,
            end: 100,
            score: ".".to_owned(),
            strand: Strand::Forward,
            phase: Phase::Unspecified,
            attributes: attrs,
            id: Some(id.to_owned()),
            name: Some(id.to_owned()),
            parent: ROOT,
            children: Vec::new(),
            segments: None,
            is_duplicate: false,
            is_skipped: false,
            sequence: None,
        }
    }

    #[test]
    fn percent_escapes_reserved_characters() {
        let mut forest = Forest::new();
        let mut node = leaf("g1");
        let _ = node
            .attributes
            .insert("Note".to_owned(), AttrValue::Scalar("bar;baz".to_owned()));
        let id = forest.insert_child(ROOT, node);
        let line = as_string(&forest, id, false);
        assert!(line.ends_with("ID=g1;Note=bar%3Bbaz"));
    }

    #[test]
    fn duplicate_is_suppressed_when_requested() {
        let mut forest = Forest::new();
        let mut dup = leaf("x._1");
        dup.is_duplicate = true;
        let id = forest.insert_child(ROOT, dup);
        assert_eq!(as_string(&forest, id, true), "");
        assert!(!as_string(&forest, id, false).is_empty());
    }

    #[test]
    fn structured_output_elides_skipped_subtree() {
        let mut forest = Forest::new();
        let mut gene = leaf("g1");
        gene.is_skipped = true;
        let gene_id = forest.insert_child(ROOT, gene);
        let child_id = forest.insert_child(gene_id, leaf("m1"));
        let _ = child_id;
        let out = structured_output(&forest, ROOT, false);
        assert!(out.is_empty());
    }
}
