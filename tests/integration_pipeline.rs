//! Pipeline integration tests
//!
//! Runs whole builds over a temporary source tree with scripted tools that
//! write the files the real ones would.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::Level;
use tempfile::TempDir;
use texpipe::config::{INDEX_ENTRY_EXPLICIT, LatexDev, Settings};
use texpipe::engine::Target;
use texpipe::exec::{CommandRunner, MockSpawner, ProcessCommand, ProcessOutput};
use texpipe::logging::RecordingLog;
use texpipe::{BuildError, Pipeline};

const ARTICLE: &str = "\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}\n";
const RERUN_LINE: &str =
    "LaTeX Warning: Label(s) may have changed. Rerun to get cross-references right.";
const INDEX_RERUN_LINE: &str =
    "(rerunfilecheck)                Rerun LaTeX/makeindex to get index right.";

struct Fixture {
    source: TempDir,
    output: TempDir,
    mock: MockSpawner,
    log: Arc<RecordingLog>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            source: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
            mock: MockSpawner::new(),
            log: Arc::new(RecordingLog::new()),
        }
    }

    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.paths.source_dir = self.source.path().to_path_buf();
        settings.paths.output_dir = self.output.path().to_path_buf();
        settings
    }

    fn pipeline(&self, settings: Settings) -> Pipeline {
        let runner = CommandRunner::new(Arc::new(self.mock.clone()), self.log.clone())
            .with_update_window(Duration::ZERO);
        Pipeline::with_runner(settings, runner, self.log.clone()).unwrap()
    }

    fn write_source(&self, name: &str, content: &str) {
        let path = self.source.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Scripts the LaTeX engine: every pass writes the output, an `.aux`
    /// with `aux` and a log whose text depends on the pass number
    fn fake_latex<F>(&self, aux: &'static str, log_text: F)
    where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        self.fake_latex_writing(aux, &[], log_text);
    }

    /// Like `fake_latex`, also writing `extra` (name, content) files each pass
    fn fake_latex_writing<F>(
        &self,
        aux: &'static str,
        extra: &'static [(&'static str, &'static str)],
        log_text: F,
    ) where
        F: Fn(usize) -> String + Send + Sync + 'static,
    {
        let passes = AtomicUsize::new(0);
        self.mock.on("lualatex", move |cmd| {
            let pass = passes.fetch_add(1, Ordering::SeqCst) + 1;
            let base = base_name(cmd);
            let format = cmd
                .args
                .iter()
                .find_map(|a| a.strip_prefix("-output-format="))
                .unwrap_or("pdf");
            let dir = &cmd.working_dir;
            fs::write(dir.join(format!("{base}.log")), log_text(pass)).unwrap();
            fs::write(dir.join(format!("{base}.aux")), aux).unwrap();
            fs::write(dir.join(format!("{base}.{format}")), "output").unwrap();
            for (name, content) in extra {
                fs::write(dir.join(name), content).unwrap();
            }
            ProcessOutput::success("")
        });
    }

    /// Scripts a tool that writes `suffixes` next to the file it is given
    fn fake_tool(&self, program: &str, suffixes: &'static [&'static str]) {
        self.mock.on(program, move |cmd| {
            let base = base_name(cmd);
            for suffix in suffixes {
                fs::write(cmd.working_dir.join(format!("{base}{suffix}")), "").unwrap();
            }
            ProcessOutput::success("")
        });
    }
}

/// Stem of the file argument, which tools here take first or last
fn base_name(cmd: &ProcessCommand) -> String {
    let file = cmd
        .args
        .iter()
        .rev()
        .find(|a| a.contains('.') && !a.starts_with('-'))
        .or_else(|| cmd.args.first())
        .cloned()
        .unwrap_or_default();
    Path::new(&file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn quiet_log(_: usize) -> String {
    "This is LuaHBTeX\nOutput written on doc.pdf (1 page).\n".to_string()
}

#[tokio::test]
async fn test_plain_document_needs_one_pass() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("\\relax\n", quiet_log);

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 1));
    assert!(fx.mock.verify_called("bibtex", 0));
    assert!(fx.mock.verify_called("makeindex", 0));
    assert_eq!(delivered, vec![fx.output.path().join("doc.pdf")]);
    assert!(fx.output.path().join("doc.pdf").exists());
    assert!(fx.log.errors().is_empty());

    let latex = &fx.mock.calls_to("lualatex")[0];
    assert_eq!(latex.working_dir, fx.source.path());
    assert!(latex.args.contains(&"-output-format=pdf".to_string()));
    assert_eq!(latex.args.last().map(String::as_str), Some("doc.tex"));
}

#[tokio::test]
async fn test_clean_up_removes_build_files_from_source() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("\\relax\n", quiet_log);

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    let source = fx.source.path();
    assert!(source.join("doc.tex").exists());
    assert!(!source.join("doc.log").exists());
    assert!(!source.join("doc.aux").exists());
    assert!(!source.join("doc.pdf").exists());
    assert!(fx.output.path().join("doc.pdf").exists());
}

#[tokio::test]
async fn test_keep_leaves_build_files() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("\\relax\n", quiet_log);

    let mut settings = fx.settings();
    settings.build.clean_up = false;
    fx.pipeline(settings).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.source.path().join("doc.log").exists());
    assert!(fx.source.path().join("doc.pdf").exists());
}

#[tokio::test]
async fn test_bibliography_runs_bibtex_and_two_more_passes() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.write_source("refs.bib", "@book{knuth84, title={The TeXbook}}\n");
    fx.fake_latex("\\citation{knuth84}\n\\bibdata{refs}\n", quiet_log);
    fx.fake_tool("bibtex", &[".bbl", ".blg"]);

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 3));
    assert!(fx.mock.verify_called("bibtex", 1));
    assert_eq!(fx.mock.calls_to("bibtex")[0].args, vec!["doc.aux".to_string()]);
    assert!(fx.log.errors().is_empty());
}

#[tokio::test]
async fn test_toc_needs_one_more_pass() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    let toc = fx.source.path().join("doc.toc");
    fx.mock.on("lualatex", move |cmd| {
        let dir = &cmd.working_dir;
        fs::write(dir.join("doc.log"), "clean\n").unwrap();
        fs::write(dir.join("doc.aux"), "").unwrap();
        fs::write(dir.join("doc.pdf"), "").unwrap();
        fs::write(&toc, "\\contentsline {section}{Intro}{1}\n").unwrap();
        ProcessOutput::success("")
    });

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 2));
}

#[tokio::test]
async fn test_rerun_bound_zero_warns_once() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", |_| format!("{}\n", RERUN_LINE));

    let mut settings = fx.settings();
    settings.build.max_reruns = 0;
    fx.pipeline(settings).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 1));
    assert_eq!(
        fx.log
            .count(Level::Warn, "requires rerun but maximum number 0 reached"),
        1
    );
}

#[tokio::test]
async fn test_rerun_bound_limits_passes() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", |_| format!("{}\n", RERUN_LINE));

    let mut settings = fx.settings();
    settings.build.max_reruns = 2;
    fx.pipeline(settings).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 3));
    assert_eq!(fx.log.count(Level::Warn, "requires rerun but maximum number 2"), 1);
}

#[tokio::test]
async fn test_unbounded_reruns_stop_when_log_settles() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", |pass| {
        if pass <= 3 {
            format!("{}\n", RERUN_LINE)
        } else {
            "clean\n".to_string()
        }
    });

    let mut settings = fx.settings();
    settings.build.max_reruns = -1;
    fx.pipeline(settings).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 4));
    assert_eq!(fx.log.count(Level::Warn, "requires rerun"), 0);
}

#[tokio::test]
async fn test_index_rerun_runs_makeindex_again() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    let idx = fx.source.path().join("doc.idx");
    let passes = AtomicUsize::new(0);
    fx.mock.on("lualatex", move |cmd| {
        let pass = passes.fetch_add(1, Ordering::SeqCst) + 1;
        let dir = &cmd.working_dir;
        let log = if pass <= 2 { INDEX_RERUN_LINE } else { "clean" };
        fs::write(dir.join("doc.log"), format!("{}\n", log)).unwrap();
        fs::write(dir.join("doc.aux"), "").unwrap();
        fs::write(dir.join("doc.pdf"), "").unwrap();
        fs::write(&idx, "\\indexentry{TeX}{1}\n").unwrap();
        ProcessOutput::success("")
    });
    fx.fake_tool("makeindex", &[".ind", ".ilg"]);

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 3));
    assert!(fx.mock.verify_called("makeindex", 2));
}

/// Builds a document with a glossary, makeglossaries logging `glg`
async fn glossary_build(
    style: &'static [(&'static str, &'static str)],
    glg: &'static str,
) -> Fixture {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex_writing("", style, quiet_log);
    fx.mock.on("makeglossaries", move |cmd| {
        let dir = &cmd.working_dir;
        fs::write(dir.join("doc.gls"), "\\begin{theglossary}\n").unwrap();
        fs::write(dir.join("doc.glg"), glg).unwrap();
        ProcessOutput::success("")
    });

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();
    fx
}

#[tokio::test]
async fn test_glossary_with_makeindex_style() {
    let fx = glossary_build(
        &[
            ("doc.glo", "\\glossaryentry{tex?\\glossentry{tex}|setentrycounter}{1}\n"),
            ("doc.ist", "actual '?'\n"),
        ],
        "## Warning (input = doc.glo, line = 1; output = doc.gls, line = 3):\n",
    )
    .await;

    assert!(fx.mock.verify_called("makeglossaries", 1));
    assert_eq!(fx.mock.calls_to("makeglossaries")[0].args, vec!["doc".to_string()]);
    assert!(fx.mock.verify_called("lualatex", 2));
    assert_eq!(fx.log.count(Level::Debug, "uses makeindex style"), 1);
    assert_eq!(
        fx.log
            .count(Level::Warn, "Running makeglossaries emitted warnings logged in"),
        1
    );
}

#[tokio::test]
async fn test_glossary_with_xindy_style() {
    let fx = glossary_build(
        &[
            ("doc.glo", "(indexentry :tkey ((\"tex\" \"tex\")) :locref \"1\")\n"),
            ("doc.xdy", "(require \"tex/inputenc/latin.xdy\")\n"),
        ],
        "WARNING: Unknown attribute in :attr\n",
    )
    .await;

    assert!(fx.mock.verify_called("makeglossaries", 1));
    assert_eq!(fx.mock.calls_to("makeglossaries")[0].args, vec!["doc".to_string()]);
    assert!(fx.mock.verify_called("lualatex", 2));
    assert_eq!(fx.log.count(Level::Debug, "uses xindy style"), 1);
    assert_eq!(
        fx.log
            .count(Level::Warn, "Running makeglossaries emitted warnings logged in"),
        1
    );
}

#[tokio::test]
async fn test_named_index_entries_run_splitindex() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex_writing(
        "",
        &[("doc.idx", "\\indexentry[names]{Knuth}{1}\n\\indexentry{TeX}{1}\n")],
        quiet_log,
    );
    fx.mock.on("splitindex", |cmd| {
        for part in ["doc-names", "doc-idx"] {
            fs::write(cmd.working_dir.join(format!("{part}.ind")), "").unwrap();
            fs::write(cmd.working_dir.join(format!("{part}.ilg")), "").unwrap();
        }
        ProcessOutput::success("")
    });

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("splitindex", 1));
    assert!(fx.mock.verify_called("makeindex", 0));
    assert!(fx.mock.verify_called("lualatex", 2));
    let args = &fx.mock.calls_to("splitindex")[0].args;
    assert_eq!(&args[..2], &["-m".to_string(), "makeindex".to_string()]);
    assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == INDEX_ENTRY_EXPLICIT));
    assert_eq!(args.last().map(String::as_str), Some("doc"));
    assert_eq!(fx.log.count(Level::Warn, "No target file"), 0);
}

#[tokio::test]
async fn test_split_indices_without_split_option_warn() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex_writing(
        "",
        &[
            ("doc.idx", "\\indexentry{TeX}{1}\n"),
            ("doc-names.idx", "\\indexentry{Knuth}{1}\n"),
        ],
        quiet_log,
    );
    fx.fake_tool("makeindex", &[".ind", ".ilg"]);

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("splitindex", 0));
    assert!(fx.mock.verify_called("makeindex", 1));
    assert_eq!(fx.mock.calls_to("makeindex")[0].args, vec!["doc.idx".to_string()]);
    assert_eq!(
        fx.log
            .count(Level::Warn, "Use package 'splitidx' without option 'split'"),
        1
    );
}

#[tokio::test]
async fn test_missing_log_is_one_error() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.mock
        .on("lualatex", |_| ProcessOutput::failure(1, "I can't write on file"));

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(delivered.is_empty());
    assert_eq!(fx.log.errors().len(), 1);
    assert_eq!(fx.log.count(Level::Error, "no log file"), 1);
    assert_eq!(fx.log.count(Level::Warn, "failed with return code 1"), 1);
    assert_eq!(fx.log.count(Level::Warn, "No target file"), 1);
    assert_eq!(fx.log.count(Level::Warn, "bibtex may require run"), 1);
    assert_eq!(fx.log.count(Level::Warn, "lualatex may require rerun"), 2);
}

#[tokio::test]
async fn test_missing_aux_says_bibtex_may_require_run() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.mock.on("lualatex", |cmd| {
        let dir = &cmd.working_dir;
        fs::write(dir.join("doc.log"), quiet_log(1)).unwrap();
        fs::write(dir.join("doc.pdf"), "").unwrap();
        ProcessOutput::success("")
    });

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("bibtex", 0));
    assert_eq!(fx.log.count(Level::Warn, "bibtex may require run"), 1);
    assert_eq!(fx.log.count(Level::Warn, "may require rerun"), 0);
}

#[tokio::test]
async fn test_second_build_repeats_only_latex() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("\\relax\n", quiet_log);

    let mut settings = fx.settings();
    settings.build.clean_up = false;
    let pipeline = fx.pipeline(settings);

    let first = pipeline.create(&[Target::Pdf]).await.unwrap();
    fx.mock.reset();
    let second = pipeline.create(&[Target::Pdf]).await.unwrap();

    let programs: Vec<String> = fx
        .mock
        .get_call_history()
        .iter()
        .map(|cmd| cmd.program_name().to_string())
        .collect();
    assert_eq!(programs, vec!["lualatex".to_string()]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_errors_in_log_are_reported_not_raised() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", |_| "! Undefined control sequence.\nl.3 \\foo\n".to_string());

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert_eq!(delivered.len(), 1);
    assert_eq!(fx.log.count(Level::Warn, "failed. Errors logged in"), 1);
}

#[tokio::test]
async fn test_unspawnable_latex_aborts_batch() {
    let fx = Fixture::new();
    fx.write_source("a.tex", ARTICLE);
    fx.write_source("b.tex", ARTICLE);
    fx.mock.unspawnable("lualatex");

    let err = fx
        .pipeline(fx.settings())
        .create(&[Target::Pdf])
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Spawn { .. }));
    assert!(fx.mock.verify_called("lualatex", 1));
}

#[tokio::test]
async fn test_missing_source_dir_is_fatal() {
    let fx = Fixture::new();
    let mut settings = fx.settings();
    settings.paths.source_dir = fx.source.path().join("absent");

    let err = fx
        .pipeline(settings)
        .create(&[Target::Pdf])
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::MissingDirectory(_)));
    assert!(fx.mock.get_call_history().is_empty());
}

#[tokio::test]
async fn test_nested_documents_mirror_layout() {
    let fx = Fixture::new();
    fx.write_source("guide/manual.tex", ARTICLE);
    fx.write_source("guide/intro.tex", "\\section{Intro}\nNot a main file.\n");
    fx.fake_latex("", quiet_log);

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 1));
    assert_eq!(delivered, vec![fx.output.path().join("guide").join("manual.pdf")]);
    assert!(fx.output.path().join("guide/manual.pdf").exists());
}

#[tokio::test]
async fn test_dvips_backend_converts_dvi() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", quiet_log);
    fx.fake_tool("dvipdfmx", &[".pdf"]);

    let mut settings = fx.settings();
    settings.build.backend = LatexDev::Dvips;
    let delivered = fx.pipeline(settings).create(&[Target::Pdf]).await.unwrap();

    let latex = &fx.mock.calls_to("lualatex")[0];
    assert!(latex.args.contains(&"-output-format=dvi".to_string()));
    assert!(fx.mock.verify_called("dvipdfmx", 1));
    assert_eq!(
        fx.mock.calls_to("dvipdfmx")[0].args.last().map(String::as_str),
        Some("doc.dvi")
    );
    assert_eq!(delivered, vec![fx.output.path().join("doc.pdf")]);
}

#[tokio::test]
async fn test_html_via_tex4ht() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", quiet_log);
    fx.fake_tool("htlatex", &[".html", ".css", ".4ct"]);

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Html]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 1));
    let htlatex = &fx.mock.calls_to("htlatex")[0];
    assert_eq!(htlatex.args[0], "doc.tex");
    assert_eq!(htlatex.args[1], "html,2");

    let mut names: Vec<String> = delivered
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["doc.css", "doc.html"]);
}

#[tokio::test]
async fn test_docx_converts_odt() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", quiet_log);
    fx.fake_tool("htlatex", &[".odt"]);
    fx.fake_tool("odt2doc", &[".docx"]);

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Docx]).await.unwrap();

    assert!(fx.mock.verify_called("htlatex", 1));
    let odt2doc = &fx.mock.calls_to("odt2doc")[0];
    assert_eq!(odt2doc.args, vec!["-fdocx".to_string(), "doc.odt".to_string()]);
    assert_eq!(delivered, vec![fx.output.path().join("doc.docx")]);
}

#[tokio::test]
async fn test_txt_extracted_from_pdf() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", quiet_log);
    fx.fake_tool("pdftotext", &[".txt"]);

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Txt]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 1));
    assert_eq!(
        fx.mock.calls_to("pdftotext")[0].args,
        vec!["-q".to_string(), "doc.pdf".to_string()]
    );
    assert_eq!(delivered, vec![fx.output.path().join("doc.txt")]);
}

fn warning_log(_: usize) -> String {
    "LaTeX Warning: Reference `intro' on page 1 undefined on input line 3.\n".to_string()
}

#[tokio::test]
async fn test_txt_does_not_report_latex_warnings() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", warning_log);
    fx.fake_tool("pdftotext", &[".txt"]);

    fx.pipeline(fx.settings()).create(&[Target::Txt]).await.unwrap();

    assert!(fx.mock.verify_called("pdftotext", 1));
    assert_eq!(fx.log.count(Level::Warn, "emitted warnings"), 0);
}

#[tokio::test]
async fn test_pdf_reports_latex_warnings() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", warning_log);

    fx.pipeline(fx.settings()).create(&[Target::Pdf]).await.unwrap();

    assert_eq!(fx.log.count(Level::Warn, "Running lualatex emitted warnings"), 1);
}

#[tokio::test]
async fn test_txt_via_dvi_converts_before_extracting() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", quiet_log);
    fx.fake_tool("dvipdfmx", &[".pdf"]);
    fx.fake_tool("pdftotext", &[".txt"]);

    let mut settings = fx.settings();
    settings.build.backend = LatexDev::Dvips;
    let delivered = fx.pipeline(settings).create(&[Target::Txt]).await.unwrap();

    let programs: Vec<String> = fx
        .mock
        .get_call_history()
        .iter()
        .map(|cmd| cmd.program_name().to_string())
        .collect();
    assert_eq!(programs, vec!["lualatex", "dvipdfmx", "pdftotext"]);
    assert_eq!(delivered, vec![fx.output.path().join("doc.txt")]);
}

#[tokio::test]
async fn test_rtf_skips_latex() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_tool("latex2rtf", &[".rtf"]);

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Rtf]).await.unwrap();

    assert!(fx.mock.verify_called("lualatex", 0));
    assert_eq!(delivered, vec![fx.output.path().join("doc.rtf")]);
}

#[tokio::test]
async fn test_several_targets_share_one_tree() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.fake_latex("", quiet_log);
    fx.fake_tool("latex2rtf", &[".rtf"]);

    let delivered = fx
        .pipeline(fx.settings())
        .create(&[Target::Pdf, Target::Rtf])
        .await
        .unwrap();

    assert_eq!(
        delivered,
        vec![fx.output.path().join("doc.pdf"), fx.output.path().join("doc.rtf")]
    );
}

#[tokio::test]
async fn test_chk_report_with_findings_warns() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.mock.on("chktex", |cmd| {
        fs::write(
            cmd.working_dir.join("doc.clg"),
            "Warning 1 in doc.tex line 3: Command terminated with space.\n",
        )
        .unwrap();
        ProcessOutput::success("")
    });

    let delivered = fx.pipeline(fx.settings()).create(&[Target::Chk]).await.unwrap();

    let chktex = &fx.mock.calls_to("chktex")[0];
    assert!(chktex.args.windows(2).any(|w| w[0] == "-o" && w[1] == "doc.clg"));
    assert_eq!(delivered, vec![fx.output.path().join("doc.clg")]);
    assert_eq!(fx.log.count(Level::Warn, "found problems reported in"), 1);
}

#[tokio::test]
async fn test_process_graphics_lists_main_documents() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.write_source("part.tex", "\\chapter{Part}\n");
    fx.write_source("fig/plot.gp", "plot sin(x)\n");

    let mains = fx.pipeline(fx.settings()).process_graphics().await.unwrap();

    assert_eq!(mains, vec![fx.source.path().join("doc.tex")]);
    assert!(fx.mock.verify_called("gnuplot", 1));
    assert!(fx.mock.verify_called("lualatex", 0));
    assert_eq!(fx.mock.calls_to("gnuplot")[0].working_dir, fx.source.path().join("fig"));
}

#[tokio::test]
async fn test_clear_all_spares_sources() {
    let fx = Fixture::new();
    fx.write_source("doc.tex", ARTICLE);
    fx.write_source("refs.bib", "");
    for generated in ["doc.log", "doc.aux", "doc.pdf", "doc.synctex.gz", "doc.toc"] {
        fx.write_source(generated, "");
    }

    fx.pipeline(fx.settings()).clear_all().unwrap();

    let source = fx.source.path();
    assert!(source.join("doc.tex").exists());
    assert!(source.join("refs.bib").exists());
    for generated in ["doc.log", "doc.aux", "doc.pdf", "doc.synctex.gz", "doc.toc"] {
        assert!(!source.join(generated).exists(), "{} survived", generated);
    }
    assert!(fx.mock.get_call_history().is_empty());
}

#[test]
fn test_invalid_settings_rejected() {
    let fx = Fixture::new();
    let mut settings = fx.settings();
    settings.latex.pattern_rerun = "(unclosed".to_string();

    let runner = CommandRunner::new(Arc::new(fx.mock.clone()), fx.log.clone());
    let result = Pipeline::with_runner(settings, runner, fx.log.clone());
    assert!(matches!(result, Err(BuildError::Pattern { .. })));
}
