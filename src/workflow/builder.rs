//! Job Graph Builder
//!
//! Turns the selected alignments into two layers of jobs:
//!
//! 1. `codeml_<gene>`: runs codeml on `<gene>.phylib` with the sibling
//!    `<gene>.nw` tree, writing `<analysis_dir>/<gene>/<gene>.txt` and the
//!    control file `<gene>.ctl` next to it
//! 2. `parse_<gene>`: reads that output and writes `<summary_dir>/<gene>.txt`
//!
//! Each parse job is linked to its analysis job by an explicit edge. Output
//! directories are created while building (skipped in dry-run mode).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, info};

use super::model::{job_name, Job, JobGraph, JobKind};
use crate::config::{PipelineConfig, StageConfig};
use crate::error::{GraphError, Result};
use crate::genes::{discover_candidates, select_candidates, Candidate, GeneSet};
use crate::paths::{file_name_of, identifier_of, join_path, transform, SuffixRule};

/// Paths derived for one analysis job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPaths {
    pub data: String,
    pub tree: String,
    pub output_dir: String,
    pub output: String,
    pub control: String,
}

/// Builds job graphs from a [`PipelineConfig`].
///
/// # Example
///
/// ```
/// use codeml_graph::config::PipelineConfig;
/// use codeml_graph::genes::GeneSet;
/// use codeml_graph::workflow::GraphBuilder;
///
/// let config = PipelineConfig::default();
/// let files = vec!["steps/cds_data/GENE-1.phylib".to_string()];
/// let genes = GeneSet::from_names(["GENE-1"]);
///
/// let graph = GraphBuilder::new(&config)
///     .dry_run(true)
///     .build_from_files(&files, &genes)
///     .unwrap();
///
/// assert!(graph.get_job("codeml_GENE_1").is_some());
/// assert!(graph.get_job("parse_GENE_1").is_some());
/// ```
pub struct GraphBuilder<'a> {
    config: &'a PipelineConfig,
    create_dirs: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            create_dirs: true,
        }
    }

    /// In dry-run mode no directories are created.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.create_dirs = !dry_run;
        self
    }

    /// Discovers candidates with the configured glob and builds the graph.
    pub fn build(&self, genes: &GeneSet) -> Result<JobGraph> {
        let files = discover_candidates(&self.config.candidates)?;
        self.build_from_files(&files, genes)
    }

    /// Builds the graph from an explicit list of candidate files.
    ///
    /// Fails on the first error; nothing partial is returned.
    pub fn build_from_files(&self, files: &[String], genes: &GeneSet) -> Result<JobGraph> {
        let selected = select_candidates(files, genes);
        check_unique_names(&selected)?;
        let mut graph = JobGraph::new();

        let mut analysis_outputs = Vec::with_capacity(selected.len());
        for candidate in &selected {
            let job = self.analysis_job(candidate)?;
            if let Some(output) = job.primary_output() {
                analysis_outputs.push(output.to_string());
            }
            graph.add_job(job)?;
        }

        self.ensure_dir(&self.config.summary_dir)?;

        for output in &analysis_outputs {
            let job = self.parse_job(output)?;
            let upstream = graph
                .producer_of(output)
                .map(|j| j.name.clone())
                .ok_or_else(|| {
                    GraphError::InvalidGraph(format!("No job produces '{}'", output))
                })?;
            let downstream = job.name.clone();
            graph.add_job(job)?;
            graph.link(&upstream, &downstream)?;
        }

        info!(
            "Declared {} analysis jobs and {} parse jobs",
            graph.analysis_jobs().len(),
            graph.parse_jobs().len()
        );
        Ok(graph)
    }

    /// Derives tree, output directory, output and control file paths.
    pub fn analysis_paths(&self, candidate: &Candidate) -> Result<AnalysisPaths> {
        let tree = transform(
            &candidate.path,
            None,
            None,
            &SuffixRule::replace(self.config.tree_suffix.as_str()),
        )?;
        let output_dir = join_path(&self.config.analysis_dir, &candidate.gene);
        let output = transform(
            &candidate.path,
            Some(output_dir.as_str()),
            None,
            &SuffixRule::replace(".txt"),
        )?;
        let control = transform(
            &candidate.path,
            Some(output_dir.as_str()),
            None,
            &SuffixRule::replace(".ctl"),
        )?;

        Ok(AnalysisPaths {
            data: candidate.path.clone(),
            tree,
            output_dir,
            output,
            control,
        })
    }

    /// Declares the codeml job for one alignment and creates its output directory.
    pub fn analysis_job(&self, candidate: &Candidate) -> Result<Job> {
        let paths = self.analysis_paths(candidate)?;

        if self.config.require_tree_files && !Path::new(&paths.tree).is_file() {
            return Err(GraphError::MissingTreeFile {
                gene: candidate.gene.clone(),
                tree: paths.tree,
            });
        }

        self.ensure_dir(&paths.output_dir)?;

        let stage = &self.config.analysis;
        let command = stage_command(
            stage,
            &[
                paths.data.as_str(),
                paths.tree.as_str(),
                paths.output.as_str(),
                file_name_of(&paths.control).as_str(),
                paths.output_dir.as_str(),
            ],
        );

        debug!("Analysis job for {}: {}", candidate.gene, paths.output);

        Ok(Job::new(
            job_name(JobKind::Analysis, &candidate.gene),
            JobKind::Analysis,
            candidate.gene.as_str(),
            command,
        )
        .with_inputs(vec![paths.data, paths.tree])
        .with_outputs(vec![paths.output, paths.control])
        .with_resources(stage.resources(self.config.account.as_deref())))
    }

    /// Declares the parse job for one codeml output file.
    pub fn parse_job(&self, analysis_output: &str) -> Result<Job> {
        let gene = identifier_of(analysis_output);
        let summary = transform(
            analysis_output,
            Some(self.config.summary_dir.as_str()),
            None,
            &SuffixRule::replace(".txt"),
        )?;

        let stage = &self.config.parse;
        let command = stage_command(stage, &[analysis_output, summary.as_str()]);

        Ok(Job::new(job_name(JobKind::Parse, &gene), JobKind::Parse, gene, command)
            .with_inputs(vec![analysis_output.to_string()])
            .with_outputs(vec![summary])
            .with_resources(stage.resources(self.config.account.as_deref())))
    }

    /// Creates `dir` and its parents; an existing directory is not an error.
    fn ensure_dir(&self, dir: &str) -> Result<()> {
        if !self.create_dirs || dir.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(dir)?;
        debug!("Ensured directory: {}", dir);
        Ok(())
    }
}

/// Genes whose tags collide would share job names. Checked before any
/// directory is created.
fn check_unique_names(selected: &[Candidate]) -> Result<()> {
    let mut seen = HashSet::with_capacity(selected.len());
    for candidate in selected {
        let name = job_name(JobKind::Analysis, &candidate.gene);
        if !seen.insert(name.clone()) {
            return Err(GraphError::DuplicateJob(name));
        }
    }
    Ok(())
}

/// Program followed by positional arguments, then the optional delay.
fn stage_command(stage: &StageConfig, args: &[&str]) -> String {
    let mut command = stage.program.trim().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    if stage.delay_secs > 0 {
        command.push_str(&format!("\nsleep {}", stage.delay_secs));
    }
    command
}
