use std::fmt;

/// Column 7 of a GFF3 record.
///
/// Unlike `bio::utils::Strand` (which the teacher uses and which only has
/// three variants), GFF3 distinguishes "not stranded" (`.`) from "relevant,
/// but unknown" (`?`), so this crate defines its own four-variant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    NotStranded,
    Unknown,
}

impl Strand {
    pub fn from_char(c: char) -> Option<Strand> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            '.' => Some(Strand::NotStranded),
            '?' => Some(Strand::Unknown),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::NotStranded => '.',
            Strand::Unknown => '?',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Default for Strand {
    fn default() -> Self {
        Strand::NotStranded
    }
}

/// Column 8 of a GFF3 record: the codon phase of a CDS feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Zero,
    One,
    Two,
    Unspecified,
}

impl Phase {
    pub fn from_char(c: char) -> Option<Phase> {
        match c {
            '0' => Some(Phase::Zero),
            '1' => Some(Phase::One),
            '2' => Some(Phase::Two),
            '.' => Some(Phase::Unspecified),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Phase::Zero => '0',
            Phase::One => '1',
            Phase::Two => '2',
            Phase::Unspecified => '.',
        }
    }

}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Unspecified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strand_round_trip() {
        for c in ['+', '-', '.', '?'] {
            let s = Strand::from_char(c).unwrap();
            assert_eq!(s.as_char(), c);
        }
        assert_eq!(Strand::from_char('x'), None);
    }

    #[test]
    fn phase_round_trip() {
        for c in ['0', '1', '2', '.'] {
            let p = Phase::from_char(c).unwrap();
            assert_eq!(p.as_char(), c);
        }
    }
}
