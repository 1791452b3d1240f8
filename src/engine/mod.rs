//! Conversion of one LaTeX main document.
//!
//! The engine runs LaTeX once, runs bibtex, makeindex and makeglossaries when
//! the first pass left evidence for them, then reruns LaTeX until its log
//! stops asking for another pass or the configured bound is reached. Every
//! output target is built on top of that pass.
//!
//! Only a tool that cannot be started aborts a document. Everything found in
//! logs is reported and the pipeline continues, since later passes often fix
//! what earlier ones complained about.

mod aux_tools;
pub mod rerun;
pub mod target;

use std::path::Path;
use std::sync::Arc;

use crate::artifact::ArtifactDescriptor;
use crate::classify::{LinePattern, LogClassifier, LogMatch};
use crate::config::{LatexDev, Patterns, Settings};
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::logging::LogSink;

pub use rerun::{AuxEvidence, rerun_count};
pub use target::Target;

/// Split an option string shell-style and append the file argument
pub fn build_arguments(options: &str, file: &str) -> Vec<String> {
    let mut args = split_options(options);
    args.push(file.to_string());
    args
}

/// Options as separate arguments; quotes group, unbalanced quotes fall back
/// to splitting on whitespace
pub fn split_options(options: &str) -> Vec<String> {
    shell_words::split(options)
        .unwrap_or_else(|_| options.split_whitespace().map(str::to_string).collect())
}

pub struct ConversionEngine {
    settings: Arc<Settings>,
    patterns: Arc<Patterns>,
    runner: CommandRunner,
    classifier: LogClassifier,
    log: Arc<dyn LogSink>,
}

impl ConversionEngine {
    pub fn new(
        settings: Arc<Settings>,
        patterns: Arc<Patterns>,
        runner: CommandRunner,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            settings,
            patterns,
            runner,
            classifier: LogClassifier::new(log.clone()),
            log,
        }
    }

    /// One LaTeX pass writing `dev`'s format
    async fn run_latex(&self, desc: &ArtifactDescriptor, dev: LatexDev) -> Result<()> {
        let latex = &self.settings.latex;
        let mut args = split_options(&latex.options);
        args.push(format!("-output-format={}", dev.latex_output_format()));
        args.push(desc.tex_name());
        let target = desc.with_suffix(dev.latex_output_suffix());

        self.log
            .debug(&format!("Running {} on '{}'", latex.command, desc.tex.display()));
        self.runner
            .execute(&desc.dir, &latex.command, &args, &[target])
            .await?;
        self.classifier.log_errs(&desc.log, &latex.command, &self.patterns.latex_err);
        Ok(())
    }

    /// First LaTeX pass plus the auxiliary tools it calls for.
    ///
    /// Returns how many extra LaTeX passes are needed.
    pub async fn pre_process(&self, desc: &ArtifactDescriptor, dev: LatexDev) -> Result<u8> {
        self.run_latex(desc, dev).await?;

        let bibliography = self.run_bibtex_by_need(desc).await?;
        let index = self.run_makeindex_by_need(desc).await?;
        let glossary = self.run_glossary_by_need(desc).await?;

        let evidence = AuxEvidence {
            bibliography,
            index_or_glossary: index || glossary,
            toc: desc.toc.exists(),
            lof_or_lot: desc.lof.exists() || desc.lot.exists(),
        };
        let count = rerun_count(&evidence);
        self.log.debug(&format!(
            "'{}' needs {} extra LaTeX passes ({:?})",
            desc.tex.display(),
            count,
            evidence
        ));
        Ok(count)
    }

    /// Pre-processing followed by the rerun loop
    pub async fn process_core(&self, desc: &ArtifactDescriptor, dev: LatexDev) -> Result<()> {
        let mut pending = self.pre_process(desc, dev).await?;
        if pending > 0 {
            self.run_latex(desc, dev).await?;
            pending -= 1;
        }

        let latex = &self.settings.latex.command;
        let mut need_latex =
            pending == 1 || self.need_run(true, &desc.log, latex, &self.patterns.latex_rerun);
        let bound = self.settings.max_reruns();
        let mut runs = 0u32;

        loop {
            let need_index =
                self.need_run(true, &desc.log, latex, &self.patterns.makeindex_rerun);
            need_latex |= need_index;
            if !need_latex {
                return Ok(());
            }
            if let Some(max) = bound
                && runs >= max
            {
                self.log.warn(&format!(
                    "{} requires rerun but maximum number {} reached for '{}'",
                    latex,
                    max,
                    desc.tex.display()
                ));
                return Ok(());
            }

            if need_index {
                self.run_makeindex_by_need(desc).await?;
            }
            self.run_latex(desc, dev).await?;
            runs += 1;
            need_latex = self.need_run(true, &desc.log, latex, &self.patterns.latex_rerun);
        }
    }

    /// Full LaTeX conversion to `dev`, reporting what the final log says
    pub async fn process_dev(&self, desc: &ArtifactDescriptor, dev: LatexDev) -> Result<()> {
        self.process_core(desc, dev).await?;
        self.log_latex_warnings(desc);
        Ok(())
    }

    fn log_latex_warnings(&self, desc: &ArtifactDescriptor) {
        let latex = &self.settings.latex.command;
        if self.settings.build.debug_bad_boxes {
            self.classifier.log_warns(
                &desc.log,
                latex,
                &self.patterns.latex_bad_boxes,
                "bad boxes",
            );
        }
        if self.settings.build.debug_warnings {
            self.classifier.log_warns(&desc.log, latex, &self.patterns.latex_warn, "warnings");
        }
    }

    /// Whether `file` asks for a run of `command`; no if it cannot be read.
    ///
    /// `another` tells a rerun of a tool that already ran from its first run.
    fn need_run(&self, another: bool, file: &Path, command: &str, pattern: &LinePattern) -> bool {
        match self.classifier.find(file, pattern) {
            LogMatch::Found => true,
            LogMatch::NotFound => false,
            LogMatch::Unreadable => {
                self.log.warn(&format!(
                    "Cannot read '{}'; {} may require {}",
                    file.display(),
                    command,
                    if another { "rerun" } else { "run" }
                ));
                false
            }
        }
    }
}
