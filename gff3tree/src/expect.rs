//! Expectation engine (`spec.md` §4.5): declarative structural rules and
//! the five repair actions that may mutate the graph.

use regex::Regex;

use crate::attrs::AttrValue;
use crate::config::ReaderConfig;
use crate::diagnostic::Diagnostic;
use crate::error::ValidationError;
use crate::sister;
use crate::store::{Forest, Node, NodeId, Walk, ROOT};
use crate::Result;

/// Which side of a comparison rule to read `attr_b` from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareSide {
    SelfNode,
    Parent,
}

/// `spec.md` §4.5: numeric ops compare numerically, the lexical family
/// compares strings directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    NumLt,
    NumGt,
    NumLe,
    NumGe,
    NumEq,
    NumNe,
    LexEq,
    LexNe,
    LexLt,
    LexGt,
}

impl CompareOp {
    pub fn parse(token: &str) -> Option<CompareOp> {
        Some(match token {
            "<" => CompareOp::NumLt,
            ">" => CompareOp::NumGt,
            "<=" => CompareOp::NumLe,
            ">=" => CompareOp::NumGe,
            "==" => CompareOp::NumEq,
            "!=" => CompareOp::NumNe,
            "eq" => CompareOp::LexEq,
            "ne" => CompareOp::LexNe,
            "lt" => CompareOp::LexLt,
            "gt" => CompareOp::LexGt,
            _ => return None,
        })
    }

    fn eval(&self, a: &str, b: &str) -> bool {
        match self {
            CompareOp::LexEq => a == b,
            CompareOp::LexNe => a != b,
            CompareOp::LexLt => a < b,
            CompareOp::LexGt => a > b,
            _ => {
                let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) else {
                    return false;
                };
                match self {
                    CompareOp::NumLt => x < y,
                    CompareOp::NumGt => x > y,
                    CompareOp::NumLe => x <= y,
                    CompareOp::NumGe => x >= y,
                    CompareOp::NumEq => x == y,
                    CompareOp::NumNe => x != y,
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// `spec.md` §4.5: the relation half of a rule. `alt` is folded into each
/// variant rather than kept as a separate field.
#[derive(Debug, Clone)]
pub enum Relation {
    HasParent(String),
    HasChild(String),
    HasSister(String),
    Compare {
        op: CompareOp,
        side: CompareSide,
        attr_a: String,
        attr_b: String,
    },
}

/// `spec.md` §4.5 action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFlag {
    Ignore,
    Warn,
    Die,
    Skip,
    Find,
    Make,
    Force,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub relation: Relation,
    pub flag: RuleFlag,
}

fn attr_str<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.attributes.get(key).and_then(AttrValue::first)
}

fn type_matches(alt_pattern: &str, type_lc: &str) -> bool {
    match Regex::new(&format!("(?i)^(?:{})$", alt_pattern)) {
        Ok(re) => re.is_match(type_lc),
        Err(_) => alt_pattern.eq_ignore_ascii_case(type_lc),
    }
}

/// Runs every registered rule against every node in `forest`
/// (`spec.md` §4.5). Returns the diagnostics collected along the way, or
/// the first `die`/unsupported-repair error.
pub fn validate(forest: &mut Forest, config: &ReaderConfig) -> Result<Vec<Diagnostic>> {
    let nodes = forest.walk_depth_first(ROOT, &mut |_, _| Walk::Include);
    let mut diagnostics = Vec::new();
    for node_id in nodes {
        let type_lc = forest.get(node_id).type_lc();
        let Some(rules) = config.rules.get(&type_lc) else {
            continue;
        };
        for rule in rules.clone() {
            apply_rule(forest, config, node_id, &rule, &mut diagnostics)?;
        }
    }
    Ok(diagnostics)
}

fn apply_rule(
    forest: &mut Forest,
    config: &ReaderConfig,
    node_id: NodeId,
    rule: &Rule,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    if satisfied(forest, node_id, &rule.relation) {
        return Ok(());
    }
    let node = forest.get(node_id);
    let feature_type = node.feature_type.clone();
    let feature_id = node.id.clone().unwrap_or_else(|| crate::DEF_ID.to_owned());
    let message = unmet_message(&rule.relation);

    match rule.flag {
        RuleFlag::Ignore => {}
        RuleFlag::Warn => {
            let mut diag = Diagnostic::warning(message).with_feature(feature_type, feature_id);
            diag = match &rule.relation {
                Relation::Compare { attr_a, .. } => diag.with_attribute(attr_a.clone()),
                Relation::HasParent(_) => {
                    let mother_id = forest.get(node.parent).id.clone().unwrap_or_default();
                    diag.with_mother(mother_id)
                }
                _ => diag,
            };
            diag.emit();
            diagnostics.push(diag);
        }
        RuleFlag::Die => {
            let diag = Diagnostic::fatal(message.clone()).with_feature(feature_type.clone(), feature_id.clone());
            diag.emit();
            return Err(ValidationError::Unsatisfied(feature_type, feature_id, message).into());
        }
        RuleFlag::Skip => {
            forest.get_mut(node_id).is_skipped = true;
            let diag = Diagnostic::warning(message).with_feature(feature_type, feature_id);
            diag.emit();
            diagnostics.push(diag);
        }
        RuleFlag::Find => {
            if find_repair(forest, node_id, &rule.relation).is_none() {
                let diag = Diagnostic::warning(format!("{} (no repair candidate found)", message))
                    .with_feature(feature_type, feature_id);
                diag.emit();
                diagnostics.push(diag);
            }
        }
        RuleFlag::Make => {
            make_repair(forest, config, node_id, &rule.relation)?;
        }
        RuleFlag::Force => {
            if find_repair(forest, node_id, &rule.relation).is_none() {
                make_repair(forest, config, node_id, &rule.relation)?;
            }
        }
    }
    Ok(())
}

fn unmet_message(relation: &Relation) -> String {
    match relation {
        Relation::HasParent(alt) => format!("expected a parent of type matching '{}'", alt),
        Relation::HasChild(alt) => format!("expected a descendant of type '{}'", alt),
        Relation::HasSister(alt) => format!("expected a sister of type '{}'", alt),
        Relation::Compare {
            op,
            side,
            attr_a,
            attr_b,
        } => format!(
            "comparison {:?} between '{}' and {:?}'s '{}' failed",
            op, attr_a, side, attr_b
        ),
    }
}

fn satisfied(forest: &Forest, node_id: NodeId, relation: &Relation) -> bool {
    let node = forest.get(node_id);
    match relation {
        Relation::HasParent(alt) => {
            let parent = forest.get(node.parent);
            node.parent != ROOT && type_matches(alt, &parent.type_lc())
        }
        Relation::HasChild(alt) => sister::find_child(forest, node_id, &alt.to_lowercase()).is_some(),
        Relation::HasSister(alt) => sister::find_sister(forest, node_id, &alt.to_lowercase()).is_some(),
        Relation::Compare {
            op,
            side,
            attr_a,
            attr_b,
        } => {
            let other = match side {
                CompareSide::SelfNode => node,
                CompareSide::Parent => forest.get(node.parent),
            };
            match (attr_str(node, attr_a), attr_str(other, attr_b)) {
                (Some(a), Some(b)) => op.eval(a, b),
                _ => false,
            }
        }
    }
}

/// `spec.md` §4.5.1: `find` only has a defined repair for `hasParent`;
/// every other relation is a documented no-op (`spec.md` §9 open
/// questions).
fn find_repair(forest: &mut Forest, node_id: NodeId, relation: &Relation) -> Option<NodeId> {
    let Relation::HasParent(alt) = relation else {
        return None;
    };
    let alt_lc = alt.to_lowercase();
    let node = forest.get(node_id);
    let (seq_name, start, end) = (node.seq_name.clone(), node.start, node.end);

    let candidate = forest
        .by_start(&seq_name, &alt_lc, start)
        .and_then(|bucket| bucket.iter().copied().find(|&c| forest.get(c).end == end))
        .or_else(|| {
            forest
                .nearest_start(&seq_name, &alt_lc, start)
                .and_then(|bucket| bucket.iter().copied().find(|&c| forest.get(c).end >= end))
        })?;

    forest.reparent(node_id, candidate);
    let candidate_id = forest.get(candidate).id.clone().unwrap_or_default();
    let _ = forest
        .get_mut(node_id)
        .attributes
        .insert("Parent".to_owned(), AttrValue::Scalar(candidate_id));
    Some(candidate)
}

/// `spec.md` §4.5.2: graph repair by construction.
fn make_repair(
    forest: &mut Forest,
    config: &ReaderConfig,
    node_id: NodeId,
    relation: &Relation,
) -> Result<()> {
    match relation {
        Relation::HasParent(alt) if alt.eq_ignore_ascii_case("region") => {
            make_region_parent(forest, node_id);
            Ok(())
        }
        Relation::HasParent(alt) => {
            make_typed_parent(forest, node_id, alt);
            Ok(())
        }
        Relation::HasSister(alt) => {
            let alt_lc = alt.to_lowercase();
            let alt_is_multiline = config.multiline.contains(&alt_lc);
            let _ = sister::make_sister(forest, node_id, &alt_lc, alt_is_multiline)
                .map_err(crate::error::Error::from)?;
            Ok(())
        }
        Relation::HasChild(alt) => {
            sister::make_child(forest, node_id, &alt.to_lowercase());
            Ok(())
        }
        Relation::Compare { .. } => Err(
            ValidationError::UnsupportedRepair("no 'make' repair defined for comparison rules".into())
                .into(),
        ),
    }
}

fn make_region_parent(forest: &mut Forest, node_id: NodeId) {
    let seq_name = forest.get(node_id).seq_name.clone();
    let parent = forest.get(node_id).parent;

    if let Some(existing) = forest
        .get(parent)
        .children
        .iter()
        .copied()
        .find(|&c| forest.get(c).type_lc() == "region" && forest.get(c).seq_name == seq_name)
    {
        forest.reparent(node_id, existing);
        let existing_id = forest.get(existing).id.clone().unwrap_or_default();
        let _ = forest
            .get_mut(node_id)
            .attributes
            .insert("Parent".to_owned(), AttrValue::Scalar(existing_id));
        return;
    }

    let max_end = forest
        .walk_depth_first(ROOT, &mut |_, n| {
            if n.seq_name == seq_name {
                Walk::Include
            } else {
                Walk::Skip
            }
        })
        .into_iter()
        .map(|id| forest.get(id).end)
        .max()
        .unwrap_or_else(|| forest.get(node_id).end);

    let id = forest.mint_id("region");
    let mut attrs = crate::attrs::AttrMap::new();
    let _ = attrs.insert("ID".to_owned(), AttrValue::Scalar(id.clone()));
    let region = Node {
        seq_name: seq_name.clone(),
        source: ".".to_owned(),
        feature_type: "region".to_owned(),
        start: 1,
        end: max_end,
        score: ".".to_owned(),
        strand: crate::strand::Strand::Forward,
        phase: crate::strand::Phase::Unspecified,
        attributes: attrs,
        id: Some(id.clone()),
        name: Some(id.clone()),
        parent,
        children: Vec::new(),
        segments: None,
        is_duplicate: false,
        is_skipped: false,
        sequence: None,
    };
    let region_id = forest.insert_child(parent, region);
    forest.index_id(id.clone(), region_id);
    forest.index_pos(&seq_name, "region", 1, region_id);

    forest.reparent(node_id, region_id);
    let _ = forest
        .get_mut(node_id)
        .attributes
        .insert("Parent".to_owned(), AttrValue::Scalar(id));
}

fn make_typed_parent(forest: &mut Forest, node_id: NodeId, alt: &str) {
    let node = forest.get(node_id).clone();
    let grandparent = node.parent;
    let id = forest.mint_id(alt);
    let mut attrs = crate::attrs::AttrMap::new();
    let _ = attrs.insert("ID".to_owned(), AttrValue::Scalar(id.clone()));
    if let Some(existing_parent_attr) = node.attributes.get("Parent").cloned() {
        let _ = attrs.insert("Parent".to_owned(), existing_parent_attr);
    }
    let synthetic = Node {
        seq_name: node.seq_name.clone(),
        source: ".".to_owned(),
        feature_type: alt.to_owned(),
        start: node.start,
        end: node.end,
        score: ".".to_owned(),
        strand: node.strand,
        phase: crate::strand::Phase::Unspecified,
        attributes: attrs,
        id: Some(id.clone()),
        name: Some(id.clone()),
        parent: grandparent,
        children: Vec::new(),
        segments: None,
        is_duplicate: false,
        is_skipped: false,
        sequence: None,
    };
    let synth_id = forest.insert_child(grandparent, synthetic);
    forest.index_id(id.clone(), synth_id);
    forest.index_pos(&node.seq_name, &alt.to_lowercase(), node.start, synth_id);

    forest.reparent(node_id, synth_id);
    let _ = forest
        .get_mut(node_id)
        .attributes
        .insert("Parent".to_owned(), AttrValue::Scalar(id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_numeric_vs_lexical() {
        assert!(CompareOp::NumLt.eval("2", "10"));
        assert!(!CompareOp::LexLt.eval("2", "10"));
        assert!(CompareOp::LexLt.eval("10", "2"));
    }

    #[test]
    fn type_matches_case_insensitive() {
        assert!(type_matches("gene", "GENE".to_lowercase().as_str()));
        assert!(type_matches("gene|mrna", "mrna"));
        assert!(!type_matches("gene", "mrna"));
    }
}
