//! Sister/child locator (`spec.md` §4.6): finds or constructs a companion
//! feature respecting multi-line coalescing, using the twin/little/big
//! matching order.

use crate::attrs::AttrValue;
use crate::error::ValidationError;
use crate::store::{Forest, Node, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    /// Identical `start`/`end`.
    Twin,
    /// Self contains the candidate.
    Little,
    /// The candidate contains self.
    Big,
}

fn classify(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> Option<Match> {
    if a_start == b_start && a_end == b_end {
        Some(Match::Twin)
    } else if a_start <= b_start && a_end >= b_end {
        Some(Match::Little)
    } else if b_start <= a_start && b_end >= a_end {
        Some(Match::Big)
    } else {
        None
    }
}

fn siblings_of_type(forest: &Forest, parent: NodeId, type_lc: &str) -> Vec<NodeId> {
    forest
        .get(parent)
        .children
        .iter()
        .copied()
        .filter(|&c| forest.get(c).type_lc() == type_lc)
        .collect()
}

/// `spec.md` §4.6: the twin/little/big search order, branching on the
/// multi-line-ness of `self` vs. `alt`.
pub fn find_sister(forest: &Forest, node_id: NodeId, alt_type_lc: &str) -> Option<NodeId> {
    let node = forest.get(node_id);
    let candidates = siblings_of_type(forest, node.parent, alt_type_lc);
    if candidates.is_empty() {
        return None;
    }

    let alt_is_multiline = candidates.iter().any(|&c| forest.get(c).is_multiline());

    if !node.is_multiline() {
        return if alt_is_multiline {
            find_against_candidate_segments(forest, node.start, node.end, &candidates)
        } else {
            find_against_candidates(forest, node.start, node.end, &candidates)
        };
    }

    if alt_is_multiline {
        return find_against_candidates(forest, node.start, node.end, &candidates);
    }

    // self multi-line, alt single-line: every segment must find a match.
    let segments = node.segments.as_ref()?;
    let mut representative = None;
    for i in 0..segments.start_array.len() {
        let hit = find_against_candidates(
            forest,
            segments.start_array[i],
            segments.end_array[i],
            &candidates,
        )?;
        representative = representative.or(Some(hit));
    }
    representative
}

fn find_against_candidates(
    forest: &Forest,
    start: u64,
    end: u64,
    candidates: &[NodeId],
) -> Option<NodeId> {
    let mut best = None;
    for &cand in candidates {
        let cnode = forest.get(cand);
        match classify(start, end, cnode.start, cnode.end) {
            Some(Match::Twin) => return Some(cand),
            Some(_) => best = best.or(Some(cand)),
            None => {}
        }
    }
    best
}

/// Like [`find_against_candidates`], but a multi-line candidate is tested
/// segment-by-segment rather than against its aggregate `start`/`end`
/// envelope, which can span a gap none of its actual segments cover.
fn find_against_candidate_segments(
    forest: &Forest,
    start: u64,
    end: u64,
    candidates: &[NodeId],
) -> Option<NodeId> {
    let mut best = None;
    for &cand in candidates {
        let cnode = forest.get(cand);
        let Some(segments) = cnode.segments.as_ref() else {
            match classify(start, end, cnode.start, cnode.end) {
                Some(Match::Twin) => return Some(cand),
                Some(_) => best = best.or(Some(cand)),
                None => {}
            }
            continue;
        };
        for i in 0..segments.start_array.len() {
            match classify(start, end, segments.start_array[i], segments.end_array[i]) {
                Some(Match::Twin) => return Some(cand),
                Some(_) => best = best.or(Some(cand)),
                None => {}
            }
        }
    }
    best
}

fn mint_sibling(forest: &mut Forest, template: &Node, feature_type: &str, start: u64, end: u64) -> NodeId {
    let parent = template.parent;
    let id = forest.mint_id(feature_type);
    let mut attributes = template.attributes.clone();
    let _ = attributes.insert("ID".to_owned(), AttrValue::Scalar(id.clone()));
    let node = Node {
        seq_name: template.seq_name.clone(),
        source: template.source.clone(),
        feature_type: feature_type.to_owned(),
        start,
        end,
        score: ".".to_owned(),
        strand: template.strand,
        phase: crate::strand::Phase::Unspecified,
        attributes,
        id: Some(id.clone()),
        name: Some(id.clone()),
        parent,
        children: Vec::new(),
        segments: None,
        is_duplicate: false,
        is_skipped: false,
        sequence: None,
    };
    let new_id = forest.insert_child(parent, node);
    forest.index_id(id, new_id);
    forest.index_pos(&template.seq_name, &feature_type.to_lowercase(), start, new_id);
    new_id
}

/// `spec.md` §4.6 `make_sister`: mirrors `find_sister`'s branch structure.
pub fn make_sister(
    forest: &mut Forest,
    node_id: NodeId,
    alt_type_lc: &str,
    alt_is_multiline: bool,
) -> Result<Vec<NodeId>, ValidationError> {
    let node = forest.get(node_id).clone();
    let self_multiline = node.is_multiline();

    if self_multiline == alt_is_multiline {
        // Whole-node clone, relabeled.
        let new_id = mint_sibling(forest, &node, alt_type_lc, node.start, node.end);
        if let Some(segments) = node.segments.clone() {
            forest.get_mut(new_id).segments = Some(segments);
        }
        return Ok(vec![new_id]);
    }

    if self_multiline && !alt_is_multiline {
        let segments = node
            .segments
            .as_ref()
            .ok_or_else(|| ValidationError::UnsupportedRepair("multiline node has no segments".into()))?;
        let mut made = Vec::with_capacity(segments.start_array.len());
        for i in 0..segments.start_array.len() {
            made.push(mint_sibling(
                forest,
                &node,
                alt_type_lc,
                segments.start_array[i],
                segments.end_array[i],
            ));
        }
        return Ok(made);
    }

    Err(ValidationError::UnsupportedRepair(format!(
        "cannot create a multi-line sister '{}' from a single-line feature",
        alt_type_lc
    )))
}

/// `spec.md` §4.5.2 `hasChild`: looks among self's descendants.
pub fn find_child(forest: &Forest, node_id: NodeId, alt_type_lc: &str) -> Option<NodeId> {
    forest.by_type(node_id, alt_type_lc, false).into_iter().next()
}

/// `spec.md` §4.5.2 `hasChild` `make`: clones self's positions under self
/// as a new child of type `alt`.
pub fn make_child(forest: &mut Forest, node_id: NodeId, alt_type_lc: &str) -> NodeId {
    let node = forest.get(node_id).clone();
    let id = forest.mint_id(alt_type_lc);
    let mut attributes = node.attributes.clone();
    let _ = attributes.insert("ID".to_owned(), AttrValue::Scalar(id.clone()));
    let parent_id = node.id.clone().unwrap_or_default();
    let _ = attributes.insert("Parent".to_owned(), AttrValue::Scalar(parent_id));
    let child = Node {
        seq_name: node.seq_name.clone(),
        source: node.source.clone(),
        feature_type: alt_type_lc.to_owned(),
        start: node.start,
        end: node.end,
        score: ".".to_owned(),
        strand: node.strand,
        phase: crate::strand::Phase::Unspecified,
        attributes,
        id: Some(id.clone()),
        name: Some(id.clone()),
        parent: node_id,
        children: Vec::new(),
        segments: node.segments.clone(),
        is_duplicate: false,
        is_skipped: false,
        sequence: None,
    };
    let child_id = forest.insert_child(node_id, child);
    forest.index_id(id, child_id);
    forest.index_pos(&node.seq_name, alt_type_lc, node.start, child_id);
    child_id
}
