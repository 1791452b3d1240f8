//! bibtex, makeindex and makeglossaries, each run only on evidence.

use std::collections::BTreeSet;
use std::path::Path;

use super::{ConversionEngine, build_arguments, split_options};
use crate::artifact::ArtifactDescriptor;
use crate::classify::LinePattern;
use crate::config::INDEX_ENTRY_EXPLICIT;
use crate::error::Result;
use crate::files::matching_files;

impl ConversionEngine {
    /// Runs bibtex if the `.aux` file declares bibliography data
    pub(super) async fn run_bibtex_by_need(&self, desc: &ArtifactDescriptor) -> Result<bool> {
        let bibtex = &self.settings.bibtex;
        if !self.need_run(false, &desc.aux, &bibtex.command, &self.patterns.bibtex_needed) {
            return Ok(false);
        }

        let args = build_arguments(&bibtex.options, &desc.name_with_suffix(".aux"));
        self.runner
            .execute(&desc.dir, &bibtex.command, &args, &[desc.bbl.clone()])
            .await?;
        self.classifier.log_errs(&desc.blg, &bibtex.command, &self.patterns.bibtex_err);
        self.classifier.log_warns(
            &desc.blg,
            &bibtex.command,
            &self.patterns.bibtex_warn,
            "warnings",
        );
        Ok(true)
    }

    /// Runs makeindex if LaTeX wrote a raw index.
    ///
    /// Entries naming their index, as package splitidx writes them, hand the
    /// raw index to splitindex instead, which runs makeindex once per index.
    pub(super) async fn run_makeindex_by_need(&self, desc: &ArtifactDescriptor) -> Result<bool> {
        if !desc.idx.exists() {
            return Ok(false);
        }

        let Some(idents) = self.classifier.collect_matches(
            &desc.idx,
            &self.patterns.index_entry_explicit,
            2,
        ) else {
            self.log.warn(&format!(
                "Cannot read '{}'; skip creation of index",
                desc.idx.display()
            ));
            return Ok(false);
        };

        if idents.is_empty() {
            self.check_split_without_option(desc);
            self.run_makeindex(desc).await?;
        } else {
            self.run_split_index(desc, idents).await?;
        }
        Ok(true)
    }

    async fn run_makeindex(&self, desc: &ArtifactDescriptor) -> Result<()> {
        let makeindex = &self.settings.makeindex;
        let args = build_arguments(&makeindex.options, &desc.name_with_suffix(".idx"));
        self.runner
            .execute(&desc.dir, &makeindex.command, &args, &[desc.ind.clone()])
            .await?;
        self.log_makeindex(&desc.ilg);
        Ok(())
    }

    /// splitindex with makeindex as backend; `idx` is the index of entries
    /// naming none
    async fn run_split_index(
        &self,
        desc: &ArtifactDescriptor,
        mut idents: BTreeSet<String>,
    ) -> Result<()> {
        idents.insert("idx".to_string());
        let makeindex = &self.settings.makeindex;
        let splitindex = &self.settings.splitindex;

        let mut args = vec![
            "-m".to_string(),
            makeindex.command.clone(),
            "-i".to_string(),
            INDEX_ENTRY_EXPLICIT.to_string(),
            "-r".to_string(),
            "$1$3".to_string(),
            "-s".to_string(),
            "-$2".to_string(),
        ];
        args.extend(split_options(&splitindex.options));
        args.push(desc.base_name.clone());
        let makeindex_options = split_options(&makeindex.options);
        if !makeindex_options.is_empty() {
            args.push("--".to_string());
            args.extend(makeindex_options);
        }

        let targets: Vec<_> = idents
            .iter()
            .map(|id| desc.with_suffix(&format!("-{}.ind", id)))
            .collect();
        self.runner
            .execute(&desc.dir, &splitindex.command, &args, &targets)
            .await?;
        for id in &idents {
            self.log_makeindex(&desc.with_suffix(&format!("-{}.ilg", id)));
        }
        Ok(())
    }

    /// Split raw indices next to a plain one mean splitidx was loaded
    /// without option `split`, so its entries never reach the index
    fn check_split_without_option(&self, desc: &ArtifactDescriptor) {
        let pattern = match LinePattern::new(&format!(
            r"^{}-.+\.idx$",
            regex::escape(&desc.base_name)
        )) {
            Ok(pattern) => pattern,
            Err(e) => {
                self.log.warn_with("Cannot match split indices", &e);
                return;
            }
        };
        match matching_files(&desc.dir, &pattern) {
            Ok(files) if !files.is_empty() => self.log.warn(&format!(
                "Use package 'splitidx' without option 'split' in '{}'",
                desc.tex.display()
            )),
            Ok(_) => {}
            Err(e) => self.log.warn_with(
                &format!("Cannot list directory '{}'", desc.dir.display()),
                &e,
            ),
        }
    }

    fn log_makeindex(&self, ilg: &Path) {
        let command = &self.settings.makeindex.command;
        self.classifier.log_errs(ilg, command, &self.patterns.makeindex_err);
        self.classifier.log_warns(ilg, command, &self.patterns.makeindex_warn, "warnings");
    }

    /// Runs makeglossaries if LaTeX wrote a raw glossary.
    ///
    /// makeglossaries picks makeindex or xindy from the style file LaTeX
    /// emitted, so its log is checked for the warnings of both.
    pub(super) async fn run_glossary_by_need(&self, desc: &ArtifactDescriptor) -> Result<bool> {
        if !desc.glo.exists() {
            return Ok(false);
        }

        let glossary = &self.settings.glossary;
        let style = if desc.xdy.exists() {
            "xindy"
        } else if desc.ist.exists() {
            "makeindex"
        } else {
            "unknown"
        };
        self.log.debug(&format!(
            "Glossary of '{}' uses {} style",
            desc.tex.display(),
            style
        ));

        let args = build_arguments(&glossary.options, &desc.base_name);
        self.runner
            .execute(&desc.dir, &glossary.command, &args, &[desc.gls.clone()])
            .await?;
        self.classifier.log_errs(&desc.glg, &glossary.command, &self.patterns.glossary_err);
        self.classifier.log_warns(
            &desc.glg,
            &glossary.command,
            &self.patterns.glossary_warn,
            "warnings",
        );
        Ok(true)
    }
}
