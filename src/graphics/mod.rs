//! Graphics conversion and main-document discovery.
//!
//! Every file of the source tree is dispatched on its suffix. Drawings and
//! plots are converted in place into a graphic plus a LaTeX wrapper, MetaPost
//! sources are compiled, and `.tex` files are tested for a document header.
//! The header, not the location, decides what a main document is.

pub mod suffix;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::{LinePattern, LogClassifier, LogMatch};
use crate::config::{Patterns, Settings, expand_base_name};
use crate::engine::{build_arguments, split_options};
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::files::{
    DirNode, delete_if_exists, file_name, matching_files, parent_dir, replace_suffix, suffix_of,
};
use crate::logging::LogSink;

pub use suffix::SuffixHandler;

pub struct GraphicsPreprocessor {
    settings: Arc<Settings>,
    patterns: Arc<Patterns>,
    runner: CommandRunner,
    classifier: LogClassifier,
    log: Arc<dyn LogSink>,
}

impl GraphicsPreprocessor {
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

    /// Directories to visit, honoring the recursion flag
    fn dirs<'a>(&self, root: &'a DirNode) -> Vec<&'a DirNode> {
        let nodes = if self.settings.paths.recursive {
            root.walk()
        } else {
            vec![root]
        };
        nodes.into_iter().filter(|node| node.readable).collect()
    }

    /// Convert all graphics below `root` and return the main documents found.
    ///
    /// Files nobody handles are reported once at the end, leaving out what
    /// graphics conversion or LaTeX generated next to their sources.
    pub async fn process_graphics(&self, root: &DirNode) -> Result<Vec<PathBuf>> {
        let mut mains = Vec::new();
        let mut skipped = Vec::new();

        for node in self.dirs(root) {
            let mut dir_mains = Vec::new();
            let mut dir_skipped = Vec::new();
            let mut generated = HashSet::new();

            for file in &node.files {
                let handler = suffix_of(file).and_then(|s| SuffixHandler::for_suffix(&s));
                let Some(handler) = handler else {
                    dir_skipped.push(file.clone());
                    continue;
                };
                for suffix in handler.generated_suffixes() {
                    generated.insert(replace_suffix(file, suffix));
                }
                if self.transform(handler, file).await? {
                    dir_mains.push(file.clone());
                }
            }

            let created = self.created_patterns(&dir_mains)?;
            dir_skipped.retain(|file| {
                let name = file_name(file);
                !generated.contains(file) && !created.iter().any(|p| p.is_match(&name))
            });
            skipped.extend(dir_skipped);
            mains.extend(dir_mains);
        }

        if !skipped.is_empty() {
            let names: Vec<String> = skipped.iter().map(|f| f.display().to_string()).collect();
            self.log.warn(&format!(
                "Skipped processing of files with unknown suffix: [{}]",
                names.join(", ")
            ));
        }
        Ok(mains)
    }

    /// Remove everything the handlers and LaTeX generate below `root`
    pub fn clear_all(&self, root: &DirNode) -> Result<()> {
        for node in self.dirs(root) {
            for file in &node.files {
                let Some(handler) = suffix_of(file).and_then(|s| SuffixHandler::for_suffix(&s))
                else {
                    continue;
                };
                self.clear(handler, file)?;
            }
        }
        Ok(())
    }

    /// Runs the handler's conversion; true if `file` is a main document
    async fn transform(&self, handler: SuffixHandler, file: &Path) -> Result<bool> {
        match handler {
            SuffixHandler::Fig => self.run_fig2dev(file).await?,
            SuffixHandler::Gnuplot => self.run_gnuplot(file).await?,
            SuffixHandler::MetaPost => self.run_metapost(file).await?,
            SuffixHandler::Svg => self
                .log
                .debug(&format!("'{}' is included by LaTeX directly", file.display())),
            SuffixHandler::Raster => self
                .log
                .debug(&format!("Raster graphic '{}' needs no conversion", file.display())),
            SuffixHandler::Bib => self
                .log
                .info(&format!("Found bibliography file '{}'", file.display())),
            SuffixHandler::Tex => return Ok(self.is_main_file(file)),
        }
        Ok(false)
    }

    fn clear(&self, handler: SuffixHandler, file: &Path) -> Result<()> {
        if handler == SuffixHandler::Tex {
            if self.is_main_file(file) {
                self.clear_created_from_main(file)?;
            }
            return Ok(());
        }
        for suffix in handler.generated_suffixes() {
            delete_if_exists(&replace_suffix(file, suffix), self.log.as_ref());
        }
        Ok(())
    }

    /// Whether `tex` starts like a top-level document
    pub fn is_main_file(&self, tex: &Path) -> bool {
        match self.classifier.find(tex, &self.patterns.main_file) {
            LogMatch::Found => {
                let class = self
                    .classifier
                    .capture(tex, &self.patterns.main_file, "docClass")
                    .unwrap_or_else(|| "unknown".to_string());
                self.log
                    .info(&format!("Detected {}-file '{}'", class, tex.display()));
                true
            }
            LogMatch::NotFound => false,
            LogMatch::Unreadable => {
                self.log.warn(&format!(
                    "Cannot read '{}'; not treated as main document",
                    tex.display()
                ));
                false
            }
        }
    }

    fn created_patterns(&self, mains: &[PathBuf]) -> Result<Vec<LinePattern>> {
        mains
            .iter()
            .map(|tex| {
                let base = tex
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                LinePattern::new(&expand_base_name(
                    &self.settings.latex.pattern_created_from_main,
                    &base,
                ))
            })
            .collect()
    }

    /// Deletes what LaTeX and its tools generated from `tex`, sparing sources
    fn clear_created_from_main(&self, tex: &Path) -> Result<()> {
        let Some(pattern) = self.created_patterns(&[tex.to_path_buf()])?.pop() else {
            return Ok(());
        };
        for file in matching_files(&parent_dir(tex), &pattern)? {
            let is_source = suffix_of(&file)
                .and_then(|s| SuffixHandler::for_suffix(&s))
                .is_some();
            if file != tex && !is_source {
                delete_if_exists(&file, self.log.as_ref());
            }
        }
        Ok(())
    }

    /// Files `handler` must write for `source` on the configured backend
    fn targets(&self, handler: SuffixHandler, source: &Path) -> Vec<PathBuf> {
        handler
            .target_suffixes(self.settings.build.backend)
            .into_iter()
            .map(|suffix| replace_suffix(source, suffix))
            .collect()
    }

    /// fig2dev twice: the graphic, then the LaTeX text layer referring to it
    async fn run_fig2dev(&self, fig: &Path) -> Result<()> {
        let dev = self.settings.build.backend;
        let cfg = &self.settings.fig2dev;
        let dir = parent_dir(fig);
        let gfx = replace_suffix(fig, dev.graphics_suffix());
        let ptx = replace_suffix(fig, ".ptx");
        self.log
            .info(&format!("Processing fig-file '{}'", fig.display()));

        let mut args = vec!["-L".to_string(), dev.fig_language().to_string()];
        args.extend(split_options(&cfg.general_options));
        args.extend(split_options(&cfg.pdf_eps_options));
        args.push(file_name(fig));
        args.push(file_name(&gfx));
        self.runner
            .execute(&dir, &cfg.command, &args, &[gfx.clone()])
            .await?;

        let mut args = vec!["-L".to_string(), dev.fig_text_language().to_string()];
        args.extend(split_options(&cfg.general_options));
        args.extend(split_options(&cfg.ptx_options));
        args.push("-p".to_string());
        args.push(file_name(&gfx));
        args.push(file_name(fig));
        args.push(file_name(&ptx));
        self.runner
            .execute(&dir, &cfg.command, &args, &[ptx])
            .await?;
        Ok(())
    }

    /// gnuplot with the cairolatex terminal, writing graphic and `.ptx`
    async fn run_gnuplot(&self, plot: &Path) -> Result<()> {
        let dev = self.settings.build.backend;
        let cfg = &self.settings.gnuplot;
        let ptx = replace_suffix(plot, ".ptx");
        self.log
            .info(&format!("Processing gnuplot-file '{}'", plot.display()));

        let script = format!(
            "set terminal cairolatex {} {};set output '{}';load '{}'",
            dev.gnuplot_terminal(),
            cfg.options,
            file_name(&ptx),
            file_name(plot)
        );
        let args = vec!["-e".to_string(), script];
        self.runner
            .execute(
                &parent_dir(plot),
                &cfg.command,
                &args,
                &self.targets(SuffixHandler::Gnuplot, plot),
            )
            .await?;
        Ok(())
    }

    async fn run_metapost(&self, mp: &Path) -> Result<()> {
        let cfg = &self.settings.metapost;
        let log_file = replace_suffix(mp, ".log");
        self.log
            .info(&format!("Processing metapost-file '{}'", mp.display()));

        let args = build_arguments(&cfg.options, &file_name(mp));
        self.runner
            .execute(
                &parent_dir(mp),
                &cfg.command,
                &args,
                &self.targets(SuffixHandler::MetaPost, mp),
            )
            .await?;
        self.classifier
            .log_errs(&log_file, &cfg.command, &self.patterns.metapost_err);
        self.classifier.log_warns(
            &log_file,
            &cfg.command,
            &self.patterns.metapost_warn,
            "warnings",
        );
        Ok(())
    }
}
