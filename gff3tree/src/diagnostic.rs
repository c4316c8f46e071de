/// Severity of a [`Diagnostic`]. Fatal diagnostics are always accompanied
/// by an `Err` return from the call site that raised them; they are
/// collected here too so the two views (return value, sink) stay in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
}

/// A structured record of a parse-time or validation-time event, carrying
/// the fields `spec.md` §7 requires: feature type, feature ID, line number
/// (parse-time only), offending attribute (comparison failures only), and
/// the mother's ID (`hasParent` failures only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub feature_type: Option<String>,
    pub feature_id: Option<String>,
    pub line: Option<usize>,
    pub attribute: Option<String>,
    pub mother_id: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            feature_type: None,
            feature_id: None,
            line: None,
            attribute: None,
            mother_id: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            severity: Severity::Fatal,
            message: message.into(),
            feature_type: None,
            feature_id: None,
            line: None,
            attribute: None,
            mother_id: None,
        }
    }

    pub fn with_feature(mut self, feature_type: impl Into<String>, feature_id: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self.feature_id = Some(feature_id.into());
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn with_mother(mut self, mother_id: impl Into<String>) -> Self {
        self.mother_id = Some(mother_id.into());
        self
    }

    /// Forwards this diagnostic to the `log` crate at the level matching
    /// its severity (see `SPEC_FULL.md` §C).
    pub fn emit(&self) {
        match self.severity {
            Severity::Warning => log::warn!("{}", self.message),
            Severity::Fatal => log::error!("{}", self.message),
        }
    }
}
