//! Top-level operations on a LaTeX source tree.
//!
//! `create` converts graphics, builds every main document for the requested
//! targets and delivers the results into the output directory. `clear_all`
//! and `process_graphics` reuse the same tree walk without building.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::artifact::ArtifactDescriptor;
use crate::classify::LinePattern;
use crate::config::{Patterns, Settings, expand_base_name};
use crate::engine::{ConversionEngine, Target};
use crate::error::{BuildError, Result};
use crate::exec::{CommandRunner, Spawner};
use crate::files::{DirNode, copy_matching, target_directory};
use crate::graphics::GraphicsPreprocessor;
use crate::logging::LogSink;

pub struct Pipeline {
    settings: Arc<Settings>,
    log: Arc<dyn LogSink>,
    graphics: GraphicsPreprocessor,
    engine: ConversionEngine,
}

impl Pipeline {
    /// Validates `settings` and wires a runner over `spawner`
    pub fn new(
        settings: Settings,
        spawner: Arc<dyn Spawner>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        let runner = CommandRunner::new(spawner, log.clone())
            .with_tex_path(settings.paths.tex_path.clone())
            .with_timeout(settings.build.timeout_ms.map(Duration::from_millis));
        Self::with_runner(settings, runner, log)
    }

    /// Like [`Pipeline::new`] with a preconfigured runner
    pub fn with_runner(
        settings: Settings,
        runner: CommandRunner,
        log: Arc<dyn LogSink>,
    ) -> Result<Self> {
        settings.validate()?;
        let patterns = Arc::new(Patterns::compile(&settings)?);
        let settings = Arc::new(settings);
        let graphics = GraphicsPreprocessor::new(
            settings.clone(),
            patterns.clone(),
            runner.clone(),
            log.clone(),
        );
        let engine = ConversionEngine::new(settings.clone(), patterns, runner, log.clone());
        Ok(Self {
            settings,
            log,
            graphics,
            engine,
        })
    }

    /// Snapshot of the source tree, which must be an existing directory
    fn source_tree(&self) -> Result<DirNode> {
        let source = self.settings.source_dir();
        if !source.exists() {
            return Err(BuildError::MissingDirectory(source.to_path_buf()));
        }
        if !source.is_dir() {
            return Err(BuildError::NotADirectory(source.to_path_buf()));
        }
        Ok(DirNode::new(source, self.log.as_ref()))
    }

    /// Build every main document for `targets` and deliver the results.
    ///
    /// Returns the delivered files. The first fatal failure stops the batch;
    /// files the build left in the source tree are cleaned up either way if
    /// clean-up is enabled.
    pub async fn create(&self, targets: &[Target]) -> Result<Vec<PathBuf>> {
        let tree = self.source_tree()?;
        let result = self.create_documents(&tree, targets).await;

        if self.settings.build.clean_up {
            let keep: HashSet<PathBuf> = match &result {
                Ok(delivered) => delivered.iter().cloned().collect(),
                Err(_) => HashSet::new(),
            };
            self.log.debug("Cleaning up files created during the build");
            tree.delete_new_files(&keep, self.log.as_ref());
        }
        result
    }

    async fn create_documents(&self, tree: &DirNode, targets: &[Target]) -> Result<Vec<PathBuf>> {
        let mains = self.graphics.process_graphics(tree).await?;
        if mains.is_empty() {
            self.log.warn(&format!(
                "No LaTeX main documents found in '{}'",
                tree.path.display()
            ));
        }

        let mut delivered = Vec::new();
        for tex in &mains {
            let desc = ArtifactDescriptor::new(tex);
            let target_dir = target_directory(
                self.settings.source_dir(),
                self.settings.output_dir(),
                &desc.dir,
            )?;
            for target in targets {
                target.process(&self.engine, &desc).await?;
                let pattern = LinePattern::new(&expand_base_name(
                    &target.output_pattern(&self.settings),
                    &desc.base_name,
                ))?;
                delivered.extend(copy_matching(
                    &desc.dir,
                    &pattern,
                    &target_dir,
                    self.log.as_ref(),
                )?);
            }
        }
        Ok(delivered)
    }

    /// Delete everything graphics conversion and LaTeX generated
    pub fn clear_all(&self) -> Result<()> {
        let tree = self.source_tree()?;
        self.graphics.clear_all(&tree)
    }

    /// Convert graphics only; returns the main documents found
    pub async fn process_graphics(&self) -> Result<Vec<PathBuf>> {
        let tree = self.source_tree()?;
        self.graphics.process_graphics(&tree).await
    }
}
