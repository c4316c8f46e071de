//! Reader configuration surface (`spec.md` §6), following the teacher's
//! `io_gff::Reader` builder (`&mut self -> &mut Self` chains terminating
//! in a consuming call — there `transcripts()`/`into_gff_records()`, here
//! `build()`).

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use crate::classifier::CommentPattern;
use crate::expect::{Relation, Rule, RuleFlag};
use crate::store::Forest;
use crate::Result;

/// How a soft parse-time violation (column count) is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFlag {
    Ignore,
    Warn,
    Die,
    Skip,
}

/// The `lacks_id(type, policy)` policy (`spec.md` §4.3 step 4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdPolicy {
    Ignore,
    Warn,
    Die,
    Make,
    /// Any other string: an alternative attribute to read the ID from,
    /// falling back to `Make` when absent.
    Attr(String),
}

/// The `undefined_parent` policy (`spec.md` §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentPolicy {
    Die,
    Make,
}

/// Which types are allowed to coalesce across lines (`spec.md` §4.3.1).
#[derive(Debug, Clone, Default)]
pub(crate) enum MultilineSet {
    #[default]
    None,
    All,
    Types(std::collections::HashSet<String>),
}

impl MultilineSet {
    pub(crate) fn contains(&self, type_lc: &str) -> bool {
        match self {
            MultilineSet::None => false,
            MultilineSet::All => true,
            MultilineSet::Types(set) => set.contains(type_lc),
        }
    }
}

/// The data half of [`Reader`]'s configuration; kept separate so the
/// builder and the parser (`crate::builder`) share one plain struct.
pub struct ReaderConfig {
    pub(crate) separator: char,
    pub(crate) comment_patterns: Vec<CommentPattern>,
    pub(crate) type_map: HashMap<String, String>,
    pub(crate) multiline: MultilineSet,
    pub(crate) lacks_id: HashMap<String, IdPolicy>,
    pub(crate) lacks_id_default: IdPolicy,
    pub(crate) undefined_parent: ParentPolicy,
    pub(crate) expect_columns: Option<(usize, LineFlag)>,
    pub(crate) rules: HashMap<String, Vec<Rule>>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            separator: '\t',
            comment_patterns: Vec::new(),
            type_map: HashMap::new(),
            multiline: MultilineSet::None,
            lacks_id: HashMap::new(),
            lacks_id_default: IdPolicy::Ignore,
            undefined_parent: ParentPolicy::Make,
            expect_columns: None,
            rules: HashMap::new(),
        }
    }
}

impl ReaderConfig {
    pub(crate) fn lacks_id_policy(&self, type_lc: &str) -> &IdPolicy {
        self.lacks_id.get(type_lc).unwrap_or(&self.lacks_id_default)
    }
}

/// Parses a GFF3 stream into a [`Forest`] under a declared configuration.
///
/// Mirrors the teacher's `Reader<R: io::Read>` (`gte::io_gff::Reader`):
/// construct from a reader or a path, chain configuration calls, then
/// consume it with [`Reader::build`].
pub struct Reader<R> {
    inner: R,
    config: ReaderConfig,
}

impl<R: io::Read> Reader<R> {
    pub fn from_reader(inner: R) -> Reader<R> {
        Reader {
            inner,
            config: ReaderConfig::default(),
        }
    }

    pub fn separator(&mut self, sep: char) -> &mut Self {
        self.config.separator = sep;
        self
    }

    pub fn has_comments(&mut self, patterns: Vec<CommentPattern>) -> &mut Self {
        self.config.comment_patterns = patterns;
        self
    }

    pub fn map_types<T: Into<String>>(&mut self, mapping: impl IntoIterator<Item = (T, T)>) -> &mut Self {
        for (raw, canonical) in mapping {
            let _ = self
                .config
                .type_map
                .insert(raw.into().to_lowercase(), canonical.into());
        }
        self
    }

    /// Declares `type_name` multi-line-coalescable; `"all"` (case-insensitive)
    /// allows every type.
    pub fn multiline(&mut self, type_name: &str) -> &mut Self {
        if type_name.eq_ignore_ascii_case("all") {
            self.config.multiline = MultilineSet::All;
            return self;
        }
        match &mut self.config.multiline {
            MultilineSet::All => {}
            MultilineSet::Types(set) => {
                let _ = set.insert(type_name.to_lowercase());
            }
            MultilineSet::None => {
                let mut set = std::collections::HashSet::new();
                let _ = set.insert(type_name.to_lowercase());
                self.config.multiline = MultilineSet::Types(set);
            }
        }
        self
    }

    /// `type_name = "all"` (case-insensitive) sets the default policy.
    pub fn lacks_id(&mut self, type_name: &str, policy: IdPolicy) -> &mut Self {
        if type_name.eq_ignore_ascii_case("all") {
            self.config.lacks_id_default = policy;
        } else {
            let _ = self.config.lacks_id.insert(type_name.to_lowercase(), policy);
        }
        self
    }

    pub fn undefined_parent(&mut self, policy: ParentPolicy) -> &mut Self {
        self.config.undefined_parent = policy;
        self
    }

    pub fn expect_columns(&mut self, n: usize, flag: LineFlag) -> &mut Self {
        self.config.expect_columns = Some((n, flag));
        self
    }

    /// Registers a rule once per `|`-delimited name in `type_pattern`
    /// (`spec.md` §4.5).
    pub fn add_expectation(
        &mut self,
        type_pattern: &str,
        relation: Relation,
        flag: RuleFlag,
    ) -> &mut Self {
        let rule = Rule { relation, flag };
        for name in type_pattern.split('|') {
            self.config
                .rules
                .entry(name.trim().to_lowercase())
                .or_default()
                .push(rule.clone());
        }
        self
    }

    /// Parses the configured stream into a forest (`spec.md` §4.3, §4.3.2).
    /// Does not run the expectation engine; call [`Reader::validate`]
    /// afterwards for that.
    pub fn build(&mut self) -> Result<Forest> {
        let reader = io::BufReader::new(&mut self.inner);
        crate::builder::build(reader.lines(), &self.config)
    }

    /// Runs every registered expectation against `forest` (`spec.md` §4.5).
    pub fn validate(&self, forest: &mut Forest) -> Result<Vec<crate::diagnostic::Diagnostic>> {
        crate::expect::validate(forest, &self.config)
    }
}

impl Reader<fs::File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Reader::from_reader(fs::File::open(path)?))
    }
}
