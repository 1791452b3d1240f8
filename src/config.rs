use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::LinePattern;
use crate::engine::Target;
use crate::error::BuildError;

/// Placeholder in file-name patterns replaced by a document's base name
pub const BASE_NAME_PLACEHOLDER: &str = "T$T";

/// An index entry of package splitidx naming its index, `\indexentry[names]{...}`
pub const INDEX_ENTRY_EXPLICIT: &str = r"^(\\indexentry)\[([^\]]*)\](.*)$";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathsConfig,
    pub build: BuildConfig,
    pub latex: LatexConfig,
    pub dvi2pdf: Dvi2PdfConfig,
    pub bibtex: BibtexConfig,
    pub makeindex: MakeIndexConfig,
    pub splitindex: SplitIndexConfig,
    pub glossary: GlossaryConfig,
    pub tex4ht: Tex4htConfig,
    pub latex2rtf: Latex2RtfConfig,
    pub odt2doc: Odt2DocConfig,
    pub pdftotext: PdfToTextConfig,
    pub chktex: ChkTexConfig,
    pub fig2dev: Fig2DevConfig,
    pub gnuplot: GnuplotConfig,
    pub metapost: MetaPostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the LaTeX sources; graphics are converted in place
    pub source_dir: PathBuf,
    /// Where finished documents are copied, mirroring the source layout
    pub output_dir: PathBuf,
    /// Directory holding the tool executables; `PATH` lookup if unset
    pub tex_path: Option<PathBuf>,
    /// Descend into subdirectories of `source_dir`
    pub recursive: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src/site/tex"),
            output_dir: PathBuf::from("."),
            tex_path: None,
            recursive: true,
        }
    }
}

/// Output device of the LaTeX engine, which decides the graphics formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatexDev {
    /// Direct PDF output
    #[default]
    Pdf,
    /// DVI output with EPS graphics, converted to PDF afterwards
    Dvips,
}

impl LatexDev {
    /// fig2dev language for the graphic part
    pub fn fig_language(self) -> &'static str {
        match self {
            LatexDev::Pdf => "pdftex",
            LatexDev::Dvips => "pstex",
        }
    }

    /// fig2dev language for the LaTeX wrapper part
    pub fn fig_text_language(self) -> &'static str {
        match self {
            LatexDev::Pdf => "pdftex_t",
            LatexDev::Dvips => "pstex_t",
        }
    }

    /// gnuplot cairolatex terminal option
    pub fn gnuplot_terminal(self) -> &'static str {
        match self {
            LatexDev::Pdf => "pdf",
            LatexDev::Dvips => "eps",
        }
    }

    pub fn graphics_suffix(self) -> &'static str {
        match self {
            LatexDev::Pdf => ".pdf",
            LatexDev::Dvips => ".eps",
        }
    }

    /// Value of the engine's `-output-format` option
    pub fn latex_output_format(self) -> &'static str {
        match self {
            LatexDev::Pdf => "pdf",
            LatexDev::Dvips => "dvi",
        }
    }

    /// Suffix of what the LaTeX engine writes
    pub fn latex_output_suffix(self) -> &'static str {
        match self {
            LatexDev::Pdf => ".pdf",
            LatexDev::Dvips => ".dvi",
        }
    }

    pub fn is_via_dvi(self) -> bool {
        self == LatexDev::Dvips
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub targets: Vec<Target>,
    pub backend: LatexDev,
    /// Bound on the LaTeX rerun loop; -1 means unlimited
    pub max_reruns: i32,
    /// Delete files the build created in the source tree
    pub clean_up: bool,
    pub debug_bad_boxes: bool,
    pub debug_warnings: bool,
    /// Per-invocation timeout for external tools
    pub timeout_ms: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            targets: vec![Target::Pdf],
            backend: LatexDev::Pdf,
            max_reruns: 5,
            clean_up: true,
            debug_bad_boxes: true,
            debug_warnings: true,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatexConfig {
    pub command: String,
    pub options: String,
    pub pattern_err: String,
    pub pattern_warn: String,
    /// Log evidence that another LaTeX pass is needed
    pub pattern_rerun: String,
    /// Header of a file that is a top-level document
    pub pattern_main_file: String,
    /// Files generated from a main document `T$T.tex`
    pub pattern_created_from_main: String,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            command: "lualatex".to_string(),
            options: "-interaction=nonstopmode -synctex=1 -recorder".to_string(),
            pattern_err: "(^! )".to_string(),
            pattern_warn: concat!(
                r"^(LaTeX Warning: |LaTeX Font Warning: |(Package|Class) .+ Warning: |",
                r"pdfTeX warning( \((\d|\w)+\))?: |\* fontspec warning: |",
                r"Missing character: There is no .* in font .*!$|",
                r"A space is missing\. \(No warning\)\.)"
            )
            .to_string(),
            pattern_rerun: concat!(
                r"^(LaTeX Warning: Label\(s\) may have changed\. ",
                r"Rerun to get cross-references right\.$|",
                r"Package \w+ Warning: .*Rerun .*$|",
                r"\(\w+\) +Rerun .*$|",
                r"LaTeX Warning: Etaremune labels have changed\.$)"
            )
            .to_string(),
            pattern_main_file: concat!(
                r"\A(\\RequirePackage\s*(\[[\s\w,]*\])?\s*\{[\w-]+\}\s*(\[[\d.]+\])?|",
                r"%.*|",
                r"\\PassOptionsToPackage\s*\{\w+\}\s*\{[\w-]+\}|",
                r"\\input\s*\{[^{}]*\}|",
                r"\s)*",
                r"\\(documentstyle|documentclass)\s*(\[[^\]]*\])?\s*\{(?P<docClass>[^} ]+)\}"
            )
            .to_string(),
            pattern_created_from_main: concat!(
                r"^(T$T(\.([^.]*|synctex(\(busy\))?(\.gz)?|out\.ps|run\.xml|\d+\.vrb)|",
                r"(-|ch|se|su|ap|li)?\d+\.x?html?|\d+x\.x?bb|\d+x?\.png|-\d+\.svg|",
                r"-.+\.(idx|ind|ilg))|",
                r"zzT$T\.e?ps|(cmsy)\d+(-c)?-\d+c?\.png|",
                r"(pdf|xe|lua)?latex\d+\.fls|texput\.(fls|log))$"
            )
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Dvi2PdfConfig {
    pub command: String,
    pub options: String,
}

impl Default for Dvi2PdfConfig {
    fn default() -> Self {
        Self {
            command: "dvipdfmx".to_string(),
            options: "-V1.7".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BibtexConfig {
    pub command: String,
    pub options: String,
    pub pattern_err: String,
    pub pattern_warn: String,
}

impl Default for BibtexConfig {
    fn default() -> Self {
        Self {
            command: "bibtex".to_string(),
            options: String::new(),
            pattern_err: "error message".to_string(),
            pattern_warn: "^Warning--".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeIndexConfig {
    pub command: String,
    pub options: String,
    pub pattern_err: String,
    pub pattern_warn: String,
    /// LaTeX log evidence that the index changed since the last makeindex run
    pub pattern_rerun: String,
}

impl Default for MakeIndexConfig {
    fn default() -> Self {
        Self {
            command: "makeindex".to_string(),
            options: String::new(),
            pattern_err: "(!! Input index error )".to_string(),
            pattern_warn: "(## Warning )".to_string(),
            pattern_rerun: r"^\(rerunfilecheck\) +Rerun LaTeX/makeindex to get index right\.$"
                .to_string(),
        }
    }
}

/// Splits the raw index of package splitidx and runs makeindex on each part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitIndexConfig {
    pub command: String,
    pub options: String,
}

impl Default for SplitIndexConfig {
    fn default() -> Self {
        Self {
            command: "splitindex".to_string(),
            options: "-V".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryConfig {
    pub command: String,
    pub options: String,
    pub pattern_err: String,
    /// Warnings of the xindy backend; makeindex warnings are checked too
    pub pattern_warn_xindy: String,
}

impl Default for GlossaryConfig {
    fn default() -> Self {
        Self {
            command: "makeglossaries".to_string(),
            options: String::new(),
            pattern_err: r"^\*\*\* unable to execute: ".to_string(),
            pattern_warn_xindy: "(^WARNING: )".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tex4htConfig {
    pub command: String,
    pub sty_options: String,
    pub tex4ht_options: String,
    pub t4ht_options: String,
    /// Files making up the html output of `T$T.tex`
    pub output_pattern: String,
}

impl Default for Tex4htConfig {
    fn default() -> Self {
        Self {
            command: "htlatex".to_string(),
            sty_options: "html,2".to_string(),
            tex4ht_options: String::new(),
            t4ht_options: String::new(),
            output_pattern: concat!(
                r"^(T$T(((ch|se|su|ap|li)?\d+)?\.x?html?|\.css|\d+x\.x?bb|\d+x\.png|-\d+\.svg)|",
                r"(cmsy)\d+(-c)?-\d+c?\.png)$"
            )
            .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Latex2RtfConfig {
    pub command: String,
    pub options: String,
}

impl Default for Latex2RtfConfig {
    fn default() -> Self {
        Self {
            command: "latex2rtf".to_string(),
            options: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Odt2DocConfig {
    pub command: String,
    /// Must contain `-f<format>`; the format is the output suffix
    pub options: String,
}

impl Default for Odt2DocConfig {
    fn default() -> Self {
        Self {
            command: "odt2doc".to_string(),
            options: "-fdocx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfToTextConfig {
    pub command: String,
    pub options: String,
}

impl Default for PdfToTextConfig {
    fn default() -> Self {
        Self {
            command: "pdftotext".to_string(),
            options: "-q".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChkTexConfig {
    pub command: String,
    pub options: String,
}

impl Default for ChkTexConfig {
    fn default() -> Self {
        Self {
            command: "chktex".to_string(),
            options: "-q -b0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Fig2DevConfig {
    pub command: String,
    pub general_options: String,
    pub pdf_eps_options: String,
    pub ptx_options: String,
}

impl Default for Fig2DevConfig {
    fn default() -> Self {
        Self {
            command: "fig2dev".to_string(),
            general_options: String::new(),
            pdf_eps_options: String::new(),
            ptx_options: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GnuplotConfig {
    pub command: String,
    /// Appended to the `set terminal cairolatex` line
    pub options: String,
}

impl Default for GnuplotConfig {
    fn default() -> Self {
        Self {
            command: "gnuplot".to_string(),
            options: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaPostConfig {
    pub command: String,
    pub options: String,
    pub pattern_err: String,
    pub pattern_warn: String,
}

impl Default for MetaPostConfig {
    fn default() -> Self {
        Self {
            command: "mpost".to_string(),
            options: concat!(
                "-interaction=nonstopmode -recorder ",
                r#"-s prologues=2 -s outputtemplate="%j.mps""#
            )
            .to_string(),
            pattern_err: "(^! )".to_string(),
            pattern_warn: "^([Ww]arning: )".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir
                .join(project_name)
                .join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(settings) => return Ok(settings),
                    Err(e) => {
                        log::warn!(
                            "Failed to load config from {}: {}",
                            primary_config.display(),
                            e
                        );
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(settings) => return Ok(settings),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let settings: Self =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        settings.validate().context("Invalid config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(settings)
    }

    /// Checks numeric bounds and that every pattern compiles
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.build.max_reruns < -1 {
            return Err(BuildError::Config(format!(
                "max_reruns must be -1 (unlimited) or greater, found {}",
                self.build.max_reruns
            )));
        }
        if self.build.targets.is_empty() {
            return Err(BuildError::Config("no targets configured".to_string()));
        }
        Patterns::compile(self)?;
        // templated patterns compile once the placeholder is substituted
        for template in [
            &self.latex.pattern_created_from_main,
            &self.tex4ht.output_pattern,
        ] {
            LinePattern::new(&expand_base_name(template, "doc"))?;
        }
        Ok(())
    }

    /// Rerun bound, `None` if unlimited
    pub fn max_reruns(&self) -> Option<u32> {
        u32::try_from(self.build.max_reruns).ok()
    }

    pub fn source_dir(&self) -> &Path {
        &self.paths.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.paths.output_dir
    }

    /// Suffix written by odt2doc, taken from its `-f<format>` option
    pub fn odt2doc_suffix(&self) -> String {
        shell_words::split(&self.odt2doc.options)
            .unwrap_or_default()
            .iter()
            .find_map(|arg| arg.strip_prefix("-f").map(str::to_string))
            .filter(|fmt| !fmt.is_empty())
            .map(|fmt| format!(".{}", fmt))
            .unwrap_or_else(|| ".doc".to_string())
    }
}

/// Replaces the base-name placeholder with the escaped document name
pub fn expand_base_name(template: &str, base_name: &str) -> String {
    template.replace(BASE_NAME_PLACEHOLDER, &regex::escape(base_name))
}

/// Every fixed pattern the build consults, compiled once per run
#[derive(Debug, Clone)]
pub struct Patterns {
    pub latex_err: LinePattern,
    pub latex_warn: LinePattern,
    pub latex_bad_boxes: LinePattern,
    pub latex_rerun: LinePattern,
    pub main_file: LinePattern,
    pub bibtex_needed: LinePattern,
    pub bibtex_err: LinePattern,
    pub bibtex_warn: LinePattern,
    pub makeindex_err: LinePattern,
    pub makeindex_warn: LinePattern,
    pub makeindex_rerun: LinePattern,
    pub index_entry_explicit: LinePattern,
    pub glossary_err: LinePattern,
    pub glossary_warn: LinePattern,
    pub metapost_err: LinePattern,
    pub metapost_warn: LinePattern,
}

impl Patterns {
    pub fn compile(settings: &Settings) -> crate::error::Result<Self> {
        Ok(Self {
            latex_err: LinePattern::new(&settings.latex.pattern_err)?,
            latex_warn: LinePattern::new(&settings.latex.pattern_warn)?,
            latex_bad_boxes: LinePattern::new(r"^(Ov|Und)erfull \\[hv]box \(")?,
            latex_rerun: LinePattern::new(&settings.latex.pattern_rerun)?,
            main_file: LinePattern::new(&settings.latex.pattern_main_file)?,
            bibtex_needed: LinePattern::new(r"^\\bibdata")?,
            bibtex_err: LinePattern::new(&settings.bibtex.pattern_err)?,
            bibtex_warn: LinePattern::new(&settings.bibtex.pattern_warn)?,
            makeindex_err: LinePattern::new(&settings.makeindex.pattern_err)?,
            makeindex_warn: LinePattern::new(&settings.makeindex.pattern_warn)?,
            makeindex_rerun: LinePattern::new(&settings.makeindex.pattern_rerun)?,
            index_entry_explicit: LinePattern::new(INDEX_ENTRY_EXPLICIT)?,
            glossary_err: LinePattern::new(&settings.glossary.pattern_err)?,
            glossary_warn: LinePattern::new(&format!(
                "{}|{}",
                settings.makeindex.pattern_warn, settings.glossary.pattern_warn_xindy
            ))?,
            metapost_err: LinePattern::new(&settings.metapost.pattern_err)?,
            metapost_warn: LinePattern::new(&settings.metapost.pattern_warn)?,
        })
    }
}
