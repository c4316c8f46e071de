//! Integration tests, one per documented scenario, following the
//! teacher's `gte/tests/io_gff.rs` style of feeding a `Reader` an
//! in-memory fixture and inspecting the resulting structure.

use std::io::Write;

use gff3tree::{CompareOp, IdPolicy, Reader, Relation, RuleFlag, ROOT};

fn reader_for(text: &str) -> Reader<&[u8]> {
    Reader::from_reader(text.as_bytes())
}

#[test]
fn single_gene_mrna_exon_chain() {
    let text = "\
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1
chr1\t.\tmRNA\t10\t100\t.\t+\t.\tID=m1;Parent=g1
chr1\t.\texon\t10\t50\t.\t+\t.\tID=e1;Parent=m1";
    let forest = reader_for(text).build().expect("parses");

    let e1 = forest.by_id("e1").expect("e1 indexed");
    let m1 = forest.get(e1).parent;
    let g1 = forest.get(m1).parent;
    assert_eq!(forest.get(g1).id.as_deref(), Some("g1"));
    assert_eq!(forest.by_type(ROOT, "exon", false).len(), 1);
}

#[test]
fn multiline_cds_coalesces() {
    let text = "\
chr1\t.\tCDS\t10\t80\t.\t+\t0\tID=c1;Parent=m1
chr1\t.\tCDS\t200\t300\t.\t+\t0\tID=c1;Parent=m1";
    let mut reader = reader_for(text);
    let forest = reader.multiline("CDS").build().expect("parses");

    let c1 = forest.by_id("c1").expect("c1 indexed");
    let node = forest.get(c1);
    let segs = node.segments.as_ref().expect("coalesced into segments");
    assert_eq!(segs.start_array, vec![10, 200]);
    assert_eq!(segs.end_array, vec![80, 300]);
    assert_eq!(node.start, 10);
    assert_eq!(node.end, 300);
}

#[test]
fn multi_parent_splitting_emits_once_with_skip_duplicates() {
    let text = "\
chr1\t.\tgene\t1\t500\t.\t+\t.\tID=a
chr1\t.\tgene\t1\t500\t.\t+\t.\tID=b
chr1\t.\texon\t5\t9\t.\t+\t.\tID=x;Parent=a,b";
    let forest = reader_for(text).build().expect("parses");

    let x = forest.by_id("x").expect("base exon indexed");
    let x1 = forest.by_id("x._1").expect("duplicate indexed");
    assert!(!forest.get(x).is_duplicate);
    assert!(forest.get(x1).is_duplicate);

    let out = gff3tree::structured_output(&forest, ROOT, true);
    assert_eq!(out.matches("exon").count(), 1);
}

#[test]
fn has_parent_find_reparents_mrna_to_colocated_gene() {
    let text = "\
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1
chr1\t.\tmRNA\t10\t100\t.\t+\t.\tID=m1";
    let mut reader = reader_for(text);
    let _ = reader.add_expectation("mrna", Relation::HasParent("gene".to_owned()), RuleFlag::Find);
    let mut forest = reader.build().expect("parses");
    let _ = reader.validate(&mut forest).expect("validates");

    let m1 = forest.by_id("m1").expect("m1 indexed");
    let g1 = forest.by_id("g1").expect("g1 indexed");
    assert_eq!(forest.get(m1).parent, g1);
}

#[test]
fn has_parent_make_synthesizes_a_spanning_region() {
    let text = "\
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1
chr1\t.\tgene\t300\t400\t.\t+\t.\tID=g2";
    let mut reader = reader_for(text);
    let _ = reader.add_expectation("gene", Relation::HasParent("region".to_owned()), RuleFlag::Make);
    let mut forest = reader.build().expect("parses");
    let _ = reader.validate(&mut forest).expect("validates");

    let g1 = forest.by_id("g1").expect("g1 indexed");
    let g2 = forest.by_id("g2").expect("g2 indexed");
    let region_id = forest.get(g1).parent;
    let region = forest.get(region_id);
    assert_eq!(region.feature_type, "region");
    assert_eq!(region.start, 1);
    assert_eq!(region.end, 400);
    assert_eq!(forest.get(g2).parent, region_id);
}

#[test]
fn percent_escape_round_trips() {
    let text = "chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1;Note=bar%3Bbaz";
    let forest = reader_for(text).build().expect("parses");
    let g1 = forest.by_id("g1").unwrap();
    assert_eq!(
        forest.get(g1).attributes.get("Note").unwrap().first(),
        Some("bar;baz")
    );

    let rendered = gff3tree::as_string(&forest, g1, false);
    assert!(rendered.contains("Note=bar%3Bbaz"));
}

#[test]
fn empty_input_yields_only_root() {
    let forest = reader_for("").build().expect("parses");
    assert!(forest.is_empty());
}

#[test]
fn comparison_expectation_reads_numeric_and_lexical() {
    let text = "chr1\t.\texon\t10\t20\t.\t+\t.\tID=e1;rank=1;total=2";
    let mut reader = reader_for(text);
    let _ = reader.add_expectation(
        "exon",
        Relation::Compare {
            op: CompareOp::NumLt,
            side: gff3tree::CompareSide::SelfNode,
            attr_a: "rank".to_owned(),
            attr_b: "total".to_owned(),
        },
        RuleFlag::Die,
    );
    let mut forest = reader.build().expect("parses");
    assert!(reader.validate(&mut forest).is_ok());
}

#[test]
fn from_path_parses_a_file_backed_stream() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "chr1\t.\tgene\t1\t10\t.\t+\t.\tID=g1").expect("write fixture");

    let mut reader = Reader::from_path(file.path()).expect("open fixture");
    let forest = reader.build().expect("parses");
    assert!(forest.by_id("g1").is_some());
}

#[test]
fn lacks_id_die_policy_aborts_on_missing_id() {
    let text = "chr1\t.\tgene\t1\t10\t.\t+\t.\tsource=manual";
    let mut reader = reader_for(text);
    let _ = reader.lacks_id("gene", IdPolicy::Die);
    assert!(reader.build().is_err());
}

#[test]
fn fasta_body_attaches_to_a_synthesized_region_by_seqid() {
    let text = "\
chr1\t.\tgene\t1\t10\t.\t+\t.\tID=g1
##FASTA
>chr1 a demo chromosome
ACGTACGTAC
ACGT";
    let forest = reader_for(text).build().expect("parses");

    let g1 = forest.by_id("g1").expect("g1 indexed");
    let region = forest.get(forest.get(g1).parent);
    assert_eq!(region.feature_type, "region");
    assert_eq!(region.sequence.as_deref(), Some("ACGTACGTACACGT"));
}

#[test]
fn has_child_make_synthesizes_a_descendant() {
    let text = "chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1";
    let mut reader = reader_for(text);
    let _ = reader.add_expectation("gene", Relation::HasChild("mRNA".to_owned()), RuleFlag::Make);
    let mut forest = reader.build().expect("parses");
    let _ = reader.validate(&mut forest).expect("validates");

    let g1 = forest.by_id("g1").expect("g1 indexed");
    let children = forest.by_type(g1, "mrna", false);
    assert_eq!(children.len(), 1);
    assert_eq!(forest.get(children[0]).parent, g1);
}

#[test]
fn skip_flag_marks_node_without_repairing() {
    let text = "\
chr1\t.\tgene\t10\t100\t.\t+\t.\tID=g1
chr1\t.\tmRNA\t10\t100\t.\t+\t.\tID=m1";
    let mut reader = reader_for(text);
    let _ = reader.add_expectation("mrna", Relation::HasParent("transcript".to_owned()), RuleFlag::Skip);
    let mut forest = reader.build().expect("parses");
    let diagnostics = reader.validate(&mut forest).expect("validates");

    let m1 = forest.by_id("m1").expect("m1 indexed");
    assert!(forest.get(m1).is_skipped);
    assert_eq!(forest.get(m1).parent, ROOT);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn force_flag_falls_back_to_make_when_find_has_no_candidate() {
    let text = "chr1\t.\tmRNA\t10\t100\t.\t+\t.\tID=m1";
    let mut reader = reader_for(text);
    let _ = reader.add_expectation("mrna", Relation::HasParent("gene".to_owned()), RuleFlag::Force);
    let mut forest = reader.build().expect("parses");
    let _ = reader.validate(&mut forest).expect("validates");

    let m1 = forest.by_id("m1").expect("m1 indexed");
    assert_ne!(forest.get(m1).parent, ROOT);
    assert_eq!(forest.get(forest.get(m1).parent).feature_type, "gene");
}
