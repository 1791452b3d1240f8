//! Output targets and how each is produced from a main document.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ConversionEngine, build_arguments, split_options};
use crate::artifact::ArtifactDescriptor;
use crate::config::{LatexDev, Settings};
use crate::error::Result;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// chktex report
    Chk,
    Dvi,
    Pdf,
    Html,
    Odt,
    Docx,
    Rtf,
    Txt,
}

impl Target {
    pub const ALL: [Target; 8] = [
        Target::Chk,
        Target::Dvi,
        Target::Pdf,
        Target::Html,
        Target::Odt,
        Target::Docx,
        Target::Rtf,
        Target::Txt,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Target::Chk => "chk",
            Target::Dvi => "dvi",
            Target::Pdf => "pdf",
            Target::Html => "html",
            Target::Odt => "odt",
            Target::Docx => "docx",
            Target::Rtf => "rtf",
            Target::Txt => "txt",
        }
    }

    /// Pattern for the files to deliver, with `T$T` for the base name
    pub fn output_pattern(self, settings: &Settings) -> String {
        match self {
            Target::Chk => r"^T$T\.clg$".to_string(),
            Target::Dvi => r"^T$T\.(dvi|xdv)$".to_string(),
            Target::Pdf => r"^T$T\.pdf$".to_string(),
            Target::Html => settings.tex4ht.output_pattern.clone(),
            Target::Odt => r"^T$T\.(odt|fodt|uot)$".to_string(),
            Target::Docx => r"^T$T\.(doc(|6|\.95|x|x7)|rtf)$".to_string(),
            Target::Rtf => r"^T$T\.rtf$".to_string(),
            Target::Txt => r"^T$T\.txt$".to_string(),
        }
    }

    pub async fn process(self, engine: &ConversionEngine, desc: &ArtifactDescriptor) -> Result<()> {
        engine
            .log
            .info(&format!("Converting '{}' to {}", desc.tex.display(), self));
        match self {
            Target::Chk => engine.process_chk(desc).await,
            Target::Dvi => engine.process_dev(desc, LatexDev::Dvips).await,
            Target::Pdf => engine.process_pdf(desc).await,
            Target::Html => engine.process_html(desc).await,
            Target::Odt => engine.process_odt(desc).await,
            Target::Docx => engine.process_docx(desc).await,
            Target::Rtf => engine.process_rtf(desc).await,
            Target::Txt => engine.process_txt(desc).await,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl ConversionEngine {
    fn backend(&self) -> LatexDev {
        self.settings.build.backend
    }

    /// PDF, directly or through DVI depending on the backend
    pub async fn process_pdf(&self, desc: &ArtifactDescriptor) -> Result<()> {
        let dev = self.backend();
        self.process_dev(desc, dev).await?;
        self.dvi_to_pdf_by_need(desc, dev).await
    }

    /// Converts the DVI LaTeX wrote to PDF if `dev` does not write PDF itself
    async fn dvi_to_pdf_by_need(&self, desc: &ArtifactDescriptor, dev: LatexDev) -> Result<()> {
        if !dev.is_via_dvi() {
            return Ok(());
        }
        let dvi2pdf = &self.settings.dvi2pdf;
        let args = build_arguments(&dvi2pdf.options, &desc.name_with_suffix(".dvi"));
        self.runner
            .execute(&desc.dir, &dvi2pdf.command, &args, &[desc.with_suffix(".pdf")])
            .await?;
        Ok(())
    }

    /// HTML via tex4ht, which runs LaTeX itself on the source
    pub async fn process_html(&self, desc: &ArtifactDescriptor) -> Result<()> {
        self.pre_process(desc, self.backend()).await?;

        let tex4ht = &self.settings.tex4ht;
        let args = vec![
            desc.tex_name(),
            tex4ht.sty_options.clone(),
            tex4ht.tex4ht_options.clone(),
            tex4ht.t4ht_options.clone(),
            self.settings.latex.options.clone(),
        ];
        self.run_tex4ht(desc, args, ".html").await
    }

    /// OpenDocument text via tex4ht's ooffice mode
    pub async fn process_odt(&self, desc: &ArtifactDescriptor) -> Result<()> {
        self.pre_process(desc, self.backend()).await?;

        let args = vec![
            desc.tex_name(),
            "xhtml,ooffice".to_string(),
            "ooffice/! -cmozhtf".to_string(),
            "-coo -cvalidate".to_string(),
        ];
        self.run_tex4ht(desc, args, ".odt").await
    }

    async fn run_tex4ht(
        &self,
        desc: &ArtifactDescriptor,
        args: Vec<String>,
        suffix: &str,
    ) -> Result<()> {
        let command = &self.settings.tex4ht.command;
        self.runner
            .execute(&desc.dir, command, &args, &[desc.with_suffix(suffix)])
            .await?;
        self.classifier.log_errs(&desc.log, command, &self.patterns.latex_err);
        if self.settings.build.debug_warnings {
            self.classifier.log_warns(&desc.log, command, &self.patterns.latex_warn, "warnings");
        }
        Ok(())
    }

    /// Word-processor format converted from the odt
    pub async fn process_docx(&self, desc: &ArtifactDescriptor) -> Result<()> {
        self.process_odt(desc).await?;

        let odt2doc = &self.settings.odt2doc;
        let args = build_arguments(&odt2doc.options, &desc.name_with_suffix(".odt"));
        let target = desc.with_suffix(&self.settings.odt2doc_suffix());
        self.runner
            .execute(&desc.dir, &odt2doc.command, &args, &[target])
            .await?;
        Ok(())
    }

    /// RTF straight from the source, without LaTeX
    pub async fn process_rtf(&self, desc: &ArtifactDescriptor) -> Result<()> {
        let latex2rtf = &self.settings.latex2rtf;
        let args = build_arguments(&latex2rtf.options, &desc.tex_name());
        self.runner
            .execute(&desc.dir, &latex2rtf.command, &args, &[desc.with_suffix(".rtf")])
            .await?;
        Ok(())
    }

    /// Plain text extracted from the PDF; LaTeX warnings are not reported
    pub async fn process_txt(&self, desc: &ArtifactDescriptor) -> Result<()> {
        let dev = self.backend();
        self.process_core(desc, dev).await?;
        self.dvi_to_pdf_by_need(desc, dev).await?;

        let pdftotext = &self.settings.pdftotext;
        let args = build_arguments(&pdftotext.options, &desc.name_with_suffix(".pdf"));
        self.runner
            .execute(&desc.dir, &pdftotext.command, &args, &[desc.with_suffix(".txt")])
            .await?;
        Ok(())
    }

    /// chktex report on the source; a non-empty report is a warning
    pub async fn process_chk(&self, desc: &ArtifactDescriptor) -> Result<()> {
        let chktex = &self.settings.chktex;
        let clg = desc.with_suffix(".clg");
        let mut args = split_options(&chktex.options);
        args.push("-o".to_string());
        args.push(desc.name_with_suffix(".clg"));
        args.push(desc.tex_name());

        self.runner
            .execute(&desc.dir, &chktex.command, &args, &[clg.clone()])
            .await?;
        let has_findings = std::fs::metadata(&clg).map(|m| m.len() > 0).unwrap_or(false);
        if has_findings {
            self.log.warn(&format!(
                "Running {} found problems reported in '{}'",
                chktex.command,
                clg.display()
            ));
        }
        Ok(())
    }
}
