//! Which handler a source file gets, by suffix.

use crate::config::LatexDev;

/// Kind of source file found in the LaTeX tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixHandler {
    /// xfig drawing, converted by fig2dev
    Fig,
    /// gnuplot script, rendered with the cairolatex terminal
    Gnuplot,
    MetaPost,
    /// Included by LaTeX directly; only generated siblings are cleared
    Svg,
    /// jpg and png, used as they are
    Raster,
    Bib,
    Tex,
}

impl SuffixHandler {
    pub fn for_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            ".fig" => Some(SuffixHandler::Fig),
            ".gp" | ".plt" => Some(SuffixHandler::Gnuplot),
            ".mp" => Some(SuffixHandler::MetaPost),
            ".svg" => Some(SuffixHandler::Svg),
            ".jpg" | ".png" => Some(SuffixHandler::Raster),
            ".bib" => Some(SuffixHandler::Bib),
            ".tex" => Some(SuffixHandler::Tex),
            _ => None,
        }
    }

    /// Suffixes of the siblings a transformation may leave behind.
    ///
    /// Main documents are not listed; what LaTeX generates is described by a
    /// configurable pattern instead.
    pub fn generated_suffixes(self) -> &'static [&'static str] {
        match self {
            SuffixHandler::Fig | SuffixHandler::Gnuplot => &[".ptx", ".pdf", ".eps"],
            SuffixHandler::MetaPost => &[".log", ".fls", ".mpx", ".mps"],
            SuffixHandler::Svg => &[".pdf_tex", ".pdf", ".eps_tex", ".eps"],
            SuffixHandler::Raster | SuffixHandler::Bib | SuffixHandler::Tex => &[],
        }
    }

    /// Files the transformation must produce for `dev`
    pub fn target_suffixes(self, dev: LatexDev) -> Vec<&'static str> {
        match self {
            SuffixHandler::Fig | SuffixHandler::Gnuplot => vec![dev.graphics_suffix(), ".ptx"],
            SuffixHandler::MetaPost => vec![".mps"],
            SuffixHandler::Svg
            | SuffixHandler::Raster
            | SuffixHandler::Bib
            | SuffixHandler::Tex => Vec::new(),
        }
    }
}
