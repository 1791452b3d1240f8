//! How many extra LaTeX passes a document needs after the first one.

/// What the first LaTeX pass and the auxiliary tools left behind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuxEvidence {
    /// The `.aux` file declared bibliography data and bibtex ran
    pub bibliography: bool,
    /// makeindex or makeglossaries ran
    pub index_or_glossary: bool,
    pub toc: bool,
    /// A list of figures or a list of tables exists
    pub lof_or_lot: bool,
}

/// Number of additional LaTeX passes, at most 2.
///
/// A bibliography needs one pass to pull in the citations and one to settle
/// the references. An index or glossary needs one, plus one more if a table
/// of contents has to pick up its page numbers.
pub fn rerun_count(evidence: &AuxEvidence) -> u8 {
    if evidence.bibliography {
        return 2;
    }
    if evidence.index_or_glossary {
        return if evidence.toc { 2 } else { 1 };
    }
    if evidence.toc || evidence.lof_or_lot { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_needs_no_rerun() {
        assert_eq!(rerun_count(&AuxEvidence::default()), 0);
    }

    #[test]
    fn test_bibliography_forces_two() {
        let evidence = AuxEvidence {
            bibliography: true,
            ..Default::default()
        };
        assert_eq!(rerun_count(&evidence), 2);

        let everything = AuxEvidence {
            bibliography: true,
            index_or_glossary: true,
            toc: true,
            lof_or_lot: true,
        };
        assert_eq!(rerun_count(&everything), 2);
    }

    #[test]
    fn test_index_with_toc() {
        let evidence = AuxEvidence {
            index_or_glossary: true,
            toc: true,
            ..Default::default()
        };
        assert_eq!(rerun_count(&evidence), 2);
    }

    #[test]
    fn test_index_without_toc() {
        let evidence = AuxEvidence {
            index_or_glossary: true,
            lof_or_lot: true,
            ..Default::default()
        };
        assert_eq!(rerun_count(&evidence), 1);
    }

    #[test]
    fn test_lists_alone() {
        let toc = AuxEvidence {
            toc: true,
            ..Default::default()
        };
        let lof = AuxEvidence {
            lof_or_lot: true,
            ..Default::default()
        };
        assert_eq!(rerun_count(&toc), 1);
        assert_eq!(rerun_count(&lof), 1);
    }
}
