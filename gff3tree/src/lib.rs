//! Parses GFF3 text into an in-memory feature forest, then validates and
//! transforms that forest against a user-declared rule set.
//!
//! The crate is organized the way the GFF3 pipeline flows: a [`tokenizer`]
//! splits raw lines into typed fields, a [`classifier`] tells data lines
//! apart from comments/directives/FASTA, a [`builder`] drives the parse loop
//! and writes into a [`store`], and an [`expect`] engine validates and
//! repairs the resulting tree before an [`emit`]ter renders it back out.

#![warn(unused_results)]

#[macro_use]
extern crate quick_error;

mod attrs;
mod builder;
mod classifier;
mod config;
mod diagnostic;
mod emit;
mod error;
mod expect;
mod sister;
mod store;
mod strand;
mod tokenizer;

pub use attrs::AttrValue;
pub use classifier::{CommentPattern, LineClass};
pub use config::{IdPolicy, LineFlag, ParentPolicy, Reader, ReaderConfig};
pub use diagnostic::{Diagnostic, Severity};
pub use emit::{as_string, structured_output};
pub use error::{BuildError, EmitError, Error, TokenError, ValidationError};
pub use expect::{CompareOp, CompareSide, Relation, Rule, RuleFlag};
pub use store::{Forest, Node, NodeId, Segments, Walk, ROOT};
pub use strand::{Phase, Strand};

/// Result alias used throughout the crate.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Fallback identifier for diagnostics that have none.
pub(crate) const DEF_ID: &str = "<unknown>";
