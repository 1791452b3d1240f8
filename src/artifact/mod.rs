//! Derived file names of one LaTeX main document.

use std::path::{Path, PathBuf};

use crate::files::{file_name, parent_dir, replace_suffix};

/// Sibling files of a main document, computed once at the start of its
/// conversion. No field implies that the file exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub tex: PathBuf,
    /// Directory of the document, the working directory of every tool
    pub dir: PathBuf,
    /// File name without the `.tex` suffix
    pub base_name: String,
    pub log: PathBuf,
    pub aux: PathBuf,
    pub toc: PathBuf,
    pub lof: PathBuf,
    pub lot: PathBuf,
    pub bbl: PathBuf,
    pub blg: PathBuf,
    pub idx: PathBuf,
    pub ind: PathBuf,
    pub ilg: PathBuf,
    pub glo: PathBuf,
    pub ist: PathBuf,
    pub xdy: PathBuf,
    pub gls: PathBuf,
    pub glg: PathBuf,
}

impl ArtifactDescriptor {
    pub fn new(tex: &Path) -> Self {
        let dir = parent_dir(tex);
        let base_name = tex
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            tex: tex.to_path_buf(),
            dir,
            base_name,
            log: replace_suffix(tex, ".log"),
            aux: replace_suffix(tex, ".aux"),
            toc: replace_suffix(tex, ".toc"),
            lof: replace_suffix(tex, ".lof"),
            lot: replace_suffix(tex, ".lot"),
            bbl: replace_suffix(tex, ".bbl"),
            blg: replace_suffix(tex, ".blg"),
            idx: replace_suffix(tex, ".idx"),
            ind: replace_suffix(tex, ".ind"),
            ilg: replace_suffix(tex, ".ilg"),
            glo: replace_suffix(tex, ".glo"),
            ist: replace_suffix(tex, ".ist"),
            xdy: replace_suffix(tex, ".xdy"),
            gls: replace_suffix(tex, ".gls"),
            glg: replace_suffix(tex, ".glg"),
        }
    }

    /// Sibling with an arbitrary suffix, e.g. an output format
    pub fn with_suffix(&self, suffix: &str) -> PathBuf {
        replace_suffix(&self.tex, suffix)
    }

    /// File name of the document, as passed to tools run in `dir`
    pub fn tex_name(&self) -> String {
        file_name(&self.tex)
    }

    /// File name of a sibling, as passed to tools run in `dir`
    pub fn name_with_suffix(&self, suffix: &str) -> String {
        format!("{}{}", self.base_name, suffix)
    }
}
