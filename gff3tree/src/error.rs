//! Error types for every fallible subsystem, following the teacher's
//! `quick_error!`-per-module convention (see `gte::GffError`,
//! `gte::RefFlatError`, `gte::ModelError` in the example pack).

use std::io;

quick_error! {
    /// Errors raised by the line tokenizer (`§4.1`).
    #[derive(Debug)]
    pub enum TokenError {
        /// The configured column count was violated and the flag was `die`.
        ColumnCountMismatch(expected: usize, found: usize, line: usize) {
            display("line {}: expected {} columns, found {}", line, expected, found)
        }
        /// Column 9 could not be split into `key=value` pairs.
        UnparseableAttributes(line: usize, detail: String) {
            display("line {}: unparseable attribute column: {}", line, detail)
        }
        /// A start/end column was not a valid integer, or `start > end`.
        InvalidCoordinate(line: usize, raw: String) {
            display("line {}: invalid start/end coordinate: {}", line, raw)
        }
        /// An unrecognized strand or phase character was found.
        InvalidEnumField(line: usize, column: &'static str, raw: String) {
            display("line {}: invalid {} value: '{}'", line, column, raw)
        }
    }
}

quick_error! {
    /// Errors raised while building the feature tree (`§4.3`).
    #[derive(Debug)]
    pub enum BuildError {
        /// An `ID` collided with an existing node whose type is not multi-line.
        IdClash(id: String, line: usize) {
            display("line {}: ID '{}' already exists; declare its type multiline \
                     with `Reader::multiline` if this is intentional", line, id)
        }
        /// A second segment of a multi-line feature disagreed on \
        /// `(seq_name, type, strand, Parent)` with the first.
        MultilineMismatch(id: String, line: usize) {
            display("line {}: segment for multiline ID '{}' does not match the \
                     existing feature's seq_name, type, strand, or Parent", line, id)
        }
        /// `lacks_id` policy was `die` and the line had no `ID`.
        MissingId(feature_type: String, line: usize) {
            display("line {}: feature of type '{}' has no ID", line, feature_type)
        }
        /// `undefined_parent` policy was `die` and an orphan remained after the fixpoint sweep.
        UndefinedParent(id: String) {
            display("ID '{}' has an undefined Parent", id)
        }
    }
}

quick_error! {
    /// Errors raised by the expectation engine (`§4.5`, `§7` category 3).
    #[derive(Debug)]
    pub enum ValidationError {
        /// A `die`-flagged expectation was not satisfied.
        Unsatisfied(feature_type: String, feature_id: String, message: String) {
            display("{} (type: {}, id: {})", message, feature_type, feature_id)
        }
        /// A repair was attempted that the engine does not support
        /// (e.g. a single-line sister synthesized from a multi-line `alt`).
        UnsupportedRepair(message: String) {
            display("unsupported repair: {}", message)
        }
    }
}

quick_error! {
    /// Errors raised while rendering the forest back to GFF3 text (`§4.7`).
    #[derive(Debug)]
    pub enum EmitError {
        Io(err: io::Error) {
            source(err)
            display("{}", err)
            from()
        }
    }
}

quick_error! {
    /// Top-level error type returned by every public entry point.
    #[derive(Debug)]
    pub enum Error {
        Token(err: TokenError) {
            source(err)
            display("{}", err)
            from()
        }
        Build(err: BuildError) {
            source(err)
            display("{}", err)
            from()
        }
        Validation(err: ValidationError) {
            source(err)
            display("{}", err)
            from()
        }
        Emit(err: EmitError) {
            source(err)
            display("{}", err)
            from()
        }
        Regex(err: regex::Error) {
            source(err)
            display("{}", err)
            from()
        }
        Io(err: io::Error) {
            source(err)
            display("{}", err)
            from()
        }
    }
}
