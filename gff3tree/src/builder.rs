//! Feature builder (`spec.md` §4.3): drives the parse state machine,
//! resolves parents, mints IDs, coalesces multi-line segments, and
//! resolves orphans once the stream ends.

use std::collections::HashSet;
use std::io;

use crate::attrs::AttrValue;
use crate::classifier::{self, LineClass};
use crate::config::{IdPolicy, ParentPolicy, ReaderConfig};
use crate::diagnostic::Diagnostic;
use crate::error::BuildError;
use crate::store::{Forest, Node, NodeId, Segments, ROOT};
use crate::tokenizer::{self, RawFields};
use crate::Result;

enum State {
    Scan,
    Fasta(String),
}

/// Parses `lines` into a [`Forest`] (`spec.md` §4.3, §4.3.2). Each item is
/// one raw input line, as yielded by `io::BufRead::lines`.
pub fn build<I>(lines: I, config: &ReaderConfig) -> Result<Forest>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut forest = Forest::new();
    let mut diagnostics = Vec::new();
    let mut state = State::Scan;

    for (idx, line) in lines.enumerate() {
        let line_no = idx + 1;
        let raw_line = line?;
        match classifier::classify(&raw_line) {
            LineClass::Blank => state = State::Scan,
            LineClass::Comment(_) => state = State::Scan,
            LineClass::Directive(_) => state = State::Scan,
            LineClass::FastaHeader(name) => state = State::Fasta(name),
            LineClass::Data => {
                let fasta_name = match &state {
                    State::Fasta(name) if !looks_like_record(&raw_line, config.separator) => {
                        Some(name.clone())
                    }
                    _ => None,
                };
                match fasta_name {
                    Some(name) => append_fasta(&mut forest, &name, &raw_line),
                    None => {
                        state = State::Scan;
                        build_line(&mut forest, config, &raw_line, line_no, &mut diagnostics)?;
                    }
                }
            }
        }
    }

    resolve_orphans(&mut forest, config.undefined_parent)?;
    Ok(forest)
}

fn looks_like_record(line: &str, sep: char) -> bool {
    line.split(sep).count() >= 8
}

/// Returns the `region` node for `seq_name`, minting one if needed and
/// reparenting every other top-level feature already on that `seq_name`
/// under it (mirrors `expect::make_region_parent`'s reuse logic).
fn ensure_region(forest: &mut Forest, seq_name: &str) -> NodeId {
    if let Some(existing) = forest
        .get(ROOT)
        .children
        .iter()
        .copied()
        .find(|&c| forest.get(c).type_lc() == "region" && forest.get(c).seq_name == seq_name)
    {
        return existing;
    }
    let id = forest.mint_id("region");
    let mut attrs = crate::attrs::AttrMap::new();
    let _ = attrs.insert("ID".to_owned(), AttrValue::Scalar(id.clone()));
    let node = Node {
        seq_name: seq_name.to_owned(),
        source: ".".to_owned(),
        feature_type: "region".to_owned(),
        start: 1,
        end: 0,
        score: ".".to_owned(),
        strand: crate::strand::Strand::Forward,
        phase: crate::strand::Phase::Unspecified,
        attributes: attrs,
        id: Some(id.clone()),
        name: Some(id.clone()),
        parent: ROOT,
        children: Vec::new(),
        segments: None,
        is_duplicate: false,
        is_skipped: false,
        sequence: None,
    };
    let node_id = forest.insert_child(ROOT, node);
    forest.index_id(id.clone(), node_id);
    forest.index_pos(seq_name, "region", 1, node_id);

    let siblings: Vec<NodeId> = forest
        .get(ROOT)
        .children
        .iter()
        .copied()
        .filter(|&c| c != node_id && forest.get(c).seq_name == seq_name)
        .collect();
    for sib in siblings {
        forest.reparent(sib, node_id);
        let _ = forest
            .get_mut(sib)
            .attributes
            .insert("Parent".to_owned(), AttrValue::Scalar(id.clone()));
    }
    node_id
}

fn append_fasta(forest: &mut Forest, seq_name: &str, line: &str) {
    let region_id = ensure_region(forest, seq_name);
    let node = forest.get_mut(region_id);
    let buf = node.sequence.get_or_insert_with(String::new);
    buf.push_str(line.trim());
    node.end = node.end.max(buf.len() as u64);
}

fn build_line(
    forest: &mut Forest,
    config: &ReaderConfig,
    raw_line: &str,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let stripped = if config.comment_patterns.is_empty() {
        raw_line.to_owned()
    } else {
        classifier::strip_inline_comments(raw_line, &config.comment_patterns)
    };

    let fields = match tokenizer::tokenize(
        &stripped,
        config.separator,
        config.expect_columns,
        line_no,
        diagnostics,
    )? {
        Some(f) => f,
        None => return Ok(()),
    };

    let feature_type = config
        .type_map
        .get(&fields.feature_type.to_lowercase())
        .cloned()
        .unwrap_or_else(|| fields.feature_type.clone());
    let type_lc = feature_type.to_lowercase();

    let parent_ids: Vec<String> = fields
        .attributes
        .get("Parent")
        .map(|v| v.as_list().into_iter().map(str::to_owned).collect())
        .unwrap_or_default();

    if parent_ids.len() > 1 {
        build_multi_parent(
            forest,
            config,
            &fields,
            &feature_type,
            &type_lc,
            &parent_ids,
            line_no,
            diagnostics,
        )?;
        return Ok(());
    }

    let resolved_parent = parent_ids
        .first()
        .and_then(|pid| forest.by_id(pid))
        .unwrap_or(ROOT);

    let Some(mut id) = resolve_id(forest, config, &type_lc, resolved_parent, &fields, line_no, diagnostics)?
    else {
        return Ok(());
    };
    sanitize_id(&mut id);

    if let Some(existing) = forest.by_id(&id) {
        if !config.multiline.contains(&type_lc) {
            return Err(BuildError::IdClash(id, line_no).into());
        }

        let existing_node = forest.get(existing);
        let existing_parent_attr = existing_node
            .attributes
            .get("Parent")
            .and_then(AttrValue::first)
            .map(str::to_owned);
        let matches = existing_node.seq_name == fields.seq_name
            && existing_node.type_lc() == type_lc
            && existing_node.strand == fields.strand
            && existing_parent_attr == parent_ids.first().cloned();

        if matches {
            coalesce_segment(forest, existing, &fields, &type_lc);
            return Ok(());
        }
        return Err(BuildError::MultilineMismatch(id, line_no).into());
    }

    create_node(forest, &fields, &feature_type, &type_lc, resolved_parent, id, false);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_multi_parent(
    forest: &mut Forest,
    config: &ReaderConfig,
    fields: &RawFields,
    feature_type: &str,
    type_lc: &str,
    parent_ids: &[String],
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let base_parent = forest.by_id(&parent_ids[0]).unwrap_or(ROOT);
    let Some(mut base_id) = resolve_id(forest, config, type_lc, base_parent, fields, line_no, diagnostics)?
    else {
        return Ok(());
    };
    sanitize_id(&mut base_id);

    for (i, parent_id) in parent_ids.iter().enumerate() {
        let parent = forest.by_id(parent_id).unwrap_or(ROOT);
        let id = if i == 0 {
            base_id.clone()
        } else {
            format!("{}._{}", base_id, i)
        };
        if forest.by_id(&id).is_some() {
            return Err(BuildError::IdClash(id, line_no).into());
        }
        create_node(forest, fields, feature_type, type_lc, parent, id, i > 0);
    }
    Ok(())
}

fn create_node(
    forest: &mut Forest,
    fields: &RawFields,
    feature_type: &str,
    type_lc: &str,
    parent: NodeId,
    id: String,
    is_duplicate: bool,
) -> NodeId {
    let name = fields
        .attributes
        .get("Name")
        .and_then(AttrValue::first)
        .map(str::to_owned)
        .unwrap_or_else(|| id.clone());

    let node = Node {
        seq_name: fields.seq_name.clone(),
        source: fields.source.clone(),
        feature_type: feature_type.to_owned(),
        start: fields.start,
        end: fields.end,
        score: fields.score.clone(),
        strand: fields.strand,
        phase: fields.phase,
        attributes: fields.attributes.clone(),
        id: Some(id.clone()),
        name: Some(name),
        parent,
        children: Vec::new(),
        segments: None,
        is_duplicate,
        is_skipped: false,
        sequence: None,
    };
    let node_id = forest.insert_child(parent, node);
    forest.index_id(id, node_id);
    forest.index_pos(&fields.seq_name, type_lc, fields.start, node_id);
    node_id
}

/// `spec.md` §4.3 step 4: resolves the `ID` for a line, minting or
/// dropping per the configured policy. `Ok(None)` means the caller should
/// silently drop the line.
fn resolve_id(
    forest: &mut Forest,
    config: &ReaderConfig,
    type_lc: &str,
    parent: NodeId,
    fields: &RawFields,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<String>> {
    if let Some(id) = fields.attributes.get("ID").and_then(AttrValue::first) {
        return Ok(Some(id.to_owned()));
    }

    let policy = config.lacks_id_policy(type_lc);
    resolve_missing_id(forest, config, policy, type_lc, parent, fields, line_no, diagnostics)
}

#[allow(clippy::too_many_arguments)]
fn resolve_missing_id(
    forest: &mut Forest,
    config: &ReaderConfig,
    policy: &IdPolicy,
    type_lc: &str,
    parent: NodeId,
    fields: &RawFields,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<String>> {
    match policy {
        IdPolicy::Ignore => Ok(None),
        IdPolicy::Warn => {
            let diag = Diagnostic::warning(format!(
                "line {}: feature of type '{}' has no ID",
                line_no, type_lc
            ))
            .with_line(line_no);
            diag.emit();
            diagnostics.push(diag);
            Ok(None)
        }
        IdPolicy::Die => Err(BuildError::MissingId(type_lc.to_owned(), line_no).into()),
        IdPolicy::Make => Ok(Some(mint_for(forest, config, type_lc, parent))),
        IdPolicy::Attr(alt) => match fields.attributes.get(alt).and_then(AttrValue::first) {
            Some(v) => Ok(Some(v.to_owned())),
            None => Ok(Some(mint_for(forest, config, type_lc, parent))),
        },
    }
}

fn mint_for(forest: &mut Forest, config: &ReaderConfig, type_lc: &str, parent: NodeId) -> String {
    if config.multiline.contains(type_lc) {
        if let Some(existing) = forest
            .get(parent)
            .children
            .iter()
            .copied()
            .find(|&c| forest.get(c).type_lc() == type_lc && forest.get(c).is_multiline())
        {
            if let Some(id) = &forest.get(existing).id {
                return id.clone();
            }
        }
    }
    forest.mint_id(type_lc)
}

fn sanitize_id(id: &mut String) {
    if id.contains('\'') {
        *id = id.replace('\'', "");
    }
}

/// `spec.md` §4.3.1: expands arrays lazily, inserts the new segment at its
/// sorted position, and maintains the position index.
fn coalesce_segment(forest: &mut Forest, existing: NodeId, fields: &RawFields, type_lc: &str) {
    let old_start = forest.get(existing).start;
    let seq_name = fields.seq_name.clone();

    {
        let node = forest.get_mut(existing);
        if node.segments.is_none() {
            let mut tracked = HashSet::new();
            let mut attr_arrays = linked_hash_map::LinkedHashMap::new();
            for (k, v) in node.attributes.iter() {
                let _ = tracked.insert(k.clone());
                let _ = attr_arrays.insert(k.clone(), vec![Some(v.clone())]);
            }
            node.segments = Some(Segments {
                start_array: vec![node.start],
                end_array: vec![node.end],
                score_array: vec![node.score.clone()],
                phase_array: vec![node.phase],
                tracked_attrs: tracked,
                attr_arrays,
            });
        }
    }

    let node = forest.get_mut(existing);
    let segs = node.segments.as_mut().expect("segments initialized above");
    let old_len = segs.start_array.len();
    let i = segs.start_array.partition_point(|&s| s <= fields.start);

    segs.start_array.insert(i, fields.start);
    segs.end_array.insert(i, fields.end);
    segs.score_array.insert(i, fields.score.clone());
    segs.phase_array.insert(i, fields.phase);

    let new_keys: Vec<String> = fields
        .attributes
        .keys()
        .filter(|k| !segs.tracked_attrs.contains(*k))
        .cloned()
        .collect();
    for key in new_keys {
        let _ = segs.tracked_attrs.insert(key.clone());
        let _ = segs.attr_arrays.insert(key, vec![None; old_len]);
    }

    let tracked: Vec<String> = segs.tracked_attrs.iter().cloned().collect();
    for key in tracked {
        let value = fields.attributes.get(&key).cloned();
        let arr = segs
            .attr_arrays
            .entry(key)
            .or_insert_with(|| vec![None; old_len]);
        arr.insert(i, value);
    }

    node.start = node.start.min(fields.start);
    node.end = node.end.max(fields.end);
    let new_start = node.start;

    if new_start != old_start {
        forest.remove_pos(&seq_name, type_lc, old_start, existing);
        forest.index_pos(&seq_name, type_lc, new_start, existing);
    }
}

/// `spec.md` §4.3.2: repeatedly reparents root's direct children whose
/// `Parent` now resolves, until no more progress is made.
fn resolve_orphans(forest: &mut Forest, policy: ParentPolicy) -> Result<()> {
    loop {
        let mut changed = false;
        let candidates = forest.get(ROOT).children.clone();
        for node_id in candidates {
            let parent_id = forest
                .get(node_id)
                .attributes
                .get("Parent")
                .and_then(AttrValue::first)
                .map(str::to_owned);
            let Some(pid) = parent_id else { continue };
            if let Some(target) = forest.by_id(&pid) {
                if target != node_id {
                    forest.reparent(node_id, target);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    if policy == ParentPolicy::Die {
        for node_id in forest.get(ROOT).children.clone() {
            let node = forest.get(node_id);
            if let Some(pid) = node.attributes.get("Parent").and_then(AttrValue::first) {
                if forest.by_id(pid).is_none() {
                    return Err(BuildError::UndefinedParent(
                        node.id.clone().unwrap_or_else(|| crate::DEF_ID.to_owned()),
                    )
                    .into());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;

    fn run(text: &str, configure: impl FnOnce(&mut ReaderConfig)) -> Forest {
        let mut config = ReaderConfig::default();
        configure(&mut config);
        let lines = text.lines().map(|l| Ok(l.to_owned()));
        build(lines, &config).unwrap()
    }

    #[test]
    fn single_gene_mrna_exon_chain() {
        let text = "\
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1
chr1\t.\tmRNA\t10\t100\t.\t+\t.\tID=m1;Parent=g1
chr1\t.\texon\t10\t50\t.\t+\t.\tID=e1;Parent=m1";
        let forest = run(text, |_| {});
        let e1 = forest.by_id("e1").unwrap();
        let m1 = forest.get(e1).parent;
        let g1 = forest.get(m1).parent;
        assert_eq!(forest.get(g1).id.as_deref(), Some("g1"));
        assert_eq!(forest.by_type(crate::store::ROOT, "exon", false).len(), 1);
    }

    #[test]
    fn multiline_cds_coalesces() {
        let text = "\
chr1\t.\tCDS\t10\t80\t.\t+\t0\tID=c1;Parent=m1
chr1\t.\tCDS\t200\t300\t.\t+\t0\tID=c1;Parent=m1";
        let forest = run(text, |c| {
            c.multiline = crate::config::MultilineSet::All;
        });
        let c1 = forest.by_id("c1").unwrap();
        let node = forest.get(c1);
        let segs = node.segments.as_ref().unwrap();
        assert_eq!(segs.start_array, vec![10, 200]);
        assert_eq!(segs.end_array, vec![80, 300]);
        assert_eq!(node.start, 10);
        assert_eq!(node.end, 300);
    }

    #[test]
    fn multi_parent_splitting() {
        let text = "\
chr1\t.\tgene\t1\t500\t.\t+\t.\tID=a
chr1\t.\tgene\t1\t500\t.\t+\t.\tID=b
chr1\t.\texon\t5\t9\t.\t+\t.\tID=x;Parent=a,b";
        let forest = run(text, |_| {});
        let x = forest.by_id("x").unwrap();
        let x1 = forest.by_id("x._1").unwrap();
        assert!(!forest.get(x).is_duplicate);
        assert!(forest.get(x1).is_duplicate);
        assert_eq!(forest.get(x).parent, forest.by_id("a").unwrap());
        assert_eq!(forest.get(x1).parent, forest.by_id("b").unwrap());
    }

    #[test]
    fn orphan_resolution_reparents_after_child_seen_first() {
        let text = "\
chr1\t.\tmRNA\t10\t100\t.\t+\t.\tID=m1;Parent=g1
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1";
        let forest = run(text, |_| {});
        let m1 = forest.by_id("m1").unwrap();
        let g1 = forest.by_id("g1").unwrap();
        assert_eq!(forest.get(m1).parent, g1);
    }

    #[test]
    fn self_referencing_parent_does_not_cycle() {
        let text = "chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1;Parent=g1";
        let forest = run(text, |_| {});
        let g1 = forest.by_id("g1").unwrap();
        assert_eq!(forest.get(g1).parent, ROOT);
    }

    #[test]
    fn id_clash_on_non_multiline_type_is_fatal() {
        let text = "\
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1";
        let config = ReaderConfig::default();
        let lines = text.lines().map(|l| Ok(l.to_owned()));
        assert!(build(lines, &config).is_err());
    }
}
