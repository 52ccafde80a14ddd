//! Job Graph Validation
//!
//! Provides validation for job graphs before they are handed to an engine:
//! - Job field validation (names, commands, resources)
//! - Reference integrity and edge consistency
//! - Agreement between explicit edges and shared file paths
//! - Topological ordering (no cycles)

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};

use super::model::{Job, JobGraph};
use crate::config::{is_valid_memory, is_valid_walltime};
use crate::error::{GraphError, Result};

/// Validation error types for readable error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyJobName,
    DuplicateJobName(String),
    EmptyCommand(String),
    NoOutputs(String),
    DuplicateOutput { path: String, first: String, second: String },
    InvalidResources { job: String, message: String },
    InvalidReference { job: String, reference: String },
    InconsistentEdge { upstream: String, downstream: String },
    UnbackedEdge { upstream: String, downstream: String },
    MissingEdge { job: String, input: String, producer: String },
    CyclicDependency,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyJobName => write!(f, "Job has empty or whitespace-only name"),
            Self::DuplicateJobName(name) => write!(f, "Duplicate job name: '{}'", name),
            Self::EmptyCommand(job) => write!(f, "Job '{}' has no command", job),
            Self::NoOutputs(job) => write!(f, "Job '{}' declares no outputs", job),
            Self::DuplicateOutput { path, first, second } => write!(
                f,
                "Output '{}' is declared by both '{}' and '{}'",
                path, first, second
            ),
            Self::InvalidResources { job, message } => {
                write!(f, "Job '{}': {}", job, message)
            }
            Self::InvalidReference { job, reference } => {
                write!(f, "Job '{}' references unknown job '{}'", job, reference)
            }
            Self::InconsistentEdge { upstream, downstream } => write!(
                f,
                "Edge {} -> {} is only recorded on one side",
                upstream, downstream
            ),
            Self::UnbackedEdge { upstream, downstream } => write!(
                f,
                "Job '{}' depends on '{}' but reads none of its outputs",
                downstream, upstream
            ),
            Self::MissingEdge { job, input, producer } => write!(
                f,
                "Job '{}' reads '{}' produced by '{}' without depending on it",
                job, input, producer
            ),
            Self::CyclicDependency => {
                write!(f, "Job graph contains cyclic dependencies")
            }
        }
    }
}

/// Validates a single job's fields.
fn validate_job(job: &Job) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if job.name.trim().is_empty() {
        errors.push(ValidationError::EmptyJobName);
        return errors;
    }

    if job.command.trim().is_empty() {
        errors.push(ValidationError::EmptyCommand(job.name.clone()));
    }

    if job.outputs.is_empty() {
        errors.push(ValidationError::NoOutputs(job.name.clone()));
    }

    let resources = &job.resources;
    if resources.cores == 0 {
        errors.push(ValidationError::InvalidResources {
            job: job.name.clone(),
            message: "requests 0 cores".to_string(),
        });
    }
    if !is_valid_walltime(&resources.walltime) {
        errors.push(ValidationError::InvalidResources {
            job: job.name.clone(),
            message: format!("walltime '{}' is not HH:MM:SS", resources.walltime),
        });
    }
    if !is_valid_memory(&resources.memory) {
        errors.push(ValidationError::InvalidResources {
            job: job.name.clone(),
            message: format!("memory '{}' is not a size like 8g", resources.memory),
        });
    }

    errors
}

/// Checks that edges and shared paths describe the same dependencies.
fn validate_edges(graph: &JobGraph, names: &HashSet<&str>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for job in &graph.jobs {
        for prev in &job.previous {
            if !names.contains(prev.as_str()) {
                errors.push(ValidationError::InvalidReference {
                    job: job.name.clone(),
                    reference: prev.clone(),
                });
                continue;
            }
            let Some(upstream) = graph.get_job(prev) else { continue };

            if !upstream.next.contains(&job.name) {
                errors.push(ValidationError::InconsistentEdge {
                    upstream: prev.clone(),
                    downstream: job.name.clone(),
                });
            }
            if !upstream.outputs.iter().any(|o| job.inputs.contains(o)) {
                errors.push(ValidationError::UnbackedEdge {
                    upstream: prev.clone(),
                    downstream: job.name.clone(),
                });
            }
        }

        for next in &job.next {
            match graph.get_job(next) {
                None => errors.push(ValidationError::InvalidReference {
                    job: job.name.clone(),
                    reference: next.clone(),
                }),
                Some(downstream) if !downstream.previous.contains(&job.name) => {
                    errors.push(ValidationError::InconsistentEdge {
                        upstream: job.name.clone(),
                        downstream: next.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        for input in &job.inputs {
            if let Some(producer) = graph.producer_of(input) {
                if producer.name != job.name && !job.previous.contains(&producer.name) {
                    errors.push(ValidationError::MissingEdge {
                        job: job.name.clone(),
                        input: input.clone(),
                        producer: producer.name.clone(),
                    });
                }
            }
        }
    }

    errors
}

/// Validates the entire job graph and returns job names in topological order.
///
/// Performs the following checks:
/// 1. No duplicate job names
/// 2. All jobs have valid fields and resources
/// 3. No output path is declared twice
/// 4. Every edge refers to existing jobs, is recorded on both ends and is
///    backed by a shared path; every produced input has an edge
/// 5. No cyclic dependencies
///
/// An empty graph is valid.
pub fn validate_graph(graph: &JobGraph) -> Result<Vec<String>> {
    info!("Validating job graph with {} jobs", graph.len());

    let mut names: HashSet<&str> = HashSet::new();
    for job in &graph.jobs {
        if !names.insert(job.name.as_str()) {
            return Err(GraphError::InvalidGraph(
                ValidationError::DuplicateJobName(job.name.clone()).to_string(),
            ));
        }
    }

    let mut all_errors = Vec::new();
    let mut producers: HashMap<&str, &str> = HashMap::new();
    for job in &graph.jobs {
        all_errors.extend(validate_job(job));

        for output in &job.outputs {
            if let Some(first) = producers.insert(output.as_str(), job.name.as_str()) {
                all_errors.push(ValidationError::DuplicateOutput {
                    path: output.clone(),
                    first: first.to_string(),
                    second: job.name.clone(),
                });
            }
        }
    }
    all_errors.extend(validate_edges(graph, &names));

    if !all_errors.is_empty() {
        let messages: Vec<String> = all_errors.iter().map(|e| e.to_string()).collect();
        return Err(GraphError::InvalidGraph(messages.join("\n")));
    }

    let order = topological_order(graph)?;

    info!("Job graph validated: {} jobs", graph.len());
    Ok(order)
}

/// Orders jobs so that dependencies come before dependents (Kahn's
/// algorithm). Jobs with equal depth keep their insertion order.
pub fn topological_order(graph: &JobGraph) -> Result<Vec<String>> {
    // Repeated entries in `previous`/`next` count once.
    let mut in_degree: HashMap<&str, usize> = graph
        .jobs
        .iter()
        .map(|j| {
            let distinct: HashSet<&str> = j.previous.iter().map(String::as_str).collect();
            (j.name.as_str(), distinct.len())
        })
        .collect();

    let mut queue: VecDeque<&str> = graph
        .jobs
        .iter()
        .filter(|j| j.previous.is_empty())
        .map(|j| j.name.as_str())
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(graph.len());

    while let Some(current) = queue.pop_front() {
        sorted.push(current.to_string());

        let Some(job) = graph.get_job(current) else { continue };
        let mut seen = HashSet::new();
        for successor in &job.next {
            if !seen.insert(successor.as_str()) {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(successor.as_str()) {
                if *degree == 0 {
                    continue;
                }
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(successor.as_str());
                }
            }
        }
    }

    if sorted.len() != graph.len() {
        return Err(GraphError::InvalidGraph(
            ValidationError::CyclicDependency.to_string(),
        ));
    }

    debug!("Topological order: {:?}", sorted);
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{JobKind, Resources};

    fn job(name: &str, kind: JobKind, inputs: &[&str], outputs: &[&str]) -> Job {
        Job::new(name, kind, "A", format!("run {}", name))
            .with_inputs(inputs.iter().map(|s| s.to_string()).collect())
            .with_outputs(outputs.iter().map(|s| s.to_string()).collect())
            .with_resources(Resources::new(1, "02:00:00", "8g"))
    }

    fn valid_graph() -> JobGraph {
        let mut graph = JobGraph::new();
        graph
            .add_job(job("codeml_A", JobKind::Analysis, &["d/A.phylib", "d/A.nw"], &["c/A/A.txt", "c/A/A.ctl"]))
            .unwrap();
        graph
            .add_job(job("parse_A", JobKind::Parse, &["c/A/A.txt"], &["s/A.txt"]))
            .unwrap();
        graph.link("codeml_A", "parse_A").unwrap();
        graph
    }

    fn error_text(graph: &JobGraph) -> String {
        match validate_graph(graph) {
            Err(GraphError::InvalidGraph(msg)) => msg,
            other => panic!("Expected InvalidGraph, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_graph() {
        let order = validate_graph(&valid_graph()).unwrap();
        assert_eq!(order, vec!["codeml_A", "parse_A"]);
    }

    #[test]
    fn test_empty_graph_is_valid() {
        assert!(validate_graph(&JobGraph::new()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names() {
        let mut graph = valid_graph();
        graph.jobs.push(job("parse_A", JobKind::Parse, &[], &["s/B.txt"]));
        assert!(error_text(&graph).contains("Duplicate job name: 'parse_A'"));
    }

    #[test]
    fn test_empty_command() {
        let mut graph = valid_graph();
        graph.get_job_mut("parse_A").unwrap().command = "  ".to_string();
        assert!(error_text(&graph).contains("has no command"));
    }

    #[test]
    fn test_invalid_resources() {
        let mut graph = valid_graph();
        graph.get_job_mut("codeml_A").unwrap().resources.walltime = "forever".to_string();
        assert!(error_text(&graph).contains("walltime 'forever'"));
    }

    #[test]
    fn test_duplicate_output() {
        let mut graph = valid_graph();
        graph
            .add_job(job("parse_B", JobKind::Parse, &[], &["s/A.txt"]))
            .unwrap();
        assert!(error_text(&graph).contains("declared by both 'parse_A' and 'parse_B'"));
    }

    #[test]
    fn test_missing_edge_detected() {
        let mut graph = JobGraph::new();
        graph
            .add_job(job("codeml_A", JobKind::Analysis, &["d/A.phylib"], &["c/A/A.txt"]))
            .unwrap();
        graph
            .add_job(job("parse_A", JobKind::Parse, &["c/A/A.txt"], &["s/A.txt"]))
            .unwrap();

        assert!(error_text(&graph).contains("without depending on it"));
    }

    #[test]
    fn test_unbacked_edge_detected() {
        let mut graph = valid_graph();
        graph.get_job_mut("parse_A").unwrap().inputs = vec!["elsewhere.txt".to_string()];
        assert!(error_text(&graph).contains("reads none of its outputs"));
    }

    #[test]
    fn test_one_sided_edge_detected() {
        let mut graph = valid_graph();
        graph.get_job_mut("codeml_A").unwrap().next.clear();
        assert!(error_text(&graph).contains("only recorded on one side"));
    }

    #[test]
    fn test_unknown_reference() {
        let mut graph = valid_graph();
        graph.get_job_mut("parse_A").unwrap().previous.push("ghost".to_string());
        assert!(error_text(&graph).contains("unknown job 'ghost'"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = JobGraph::new();
        graph.add_job(job("a", JobKind::Analysis, &["b.out"], &["a.out"])).unwrap();
        graph.add_job(job("b", JobKind::Parse, &["a.out"], &["b.out"])).unwrap();
        graph.link("a", "b").unwrap();
        graph.link("b", "a").unwrap();

        assert!(error_text(&graph).contains("cyclic"));
    }

    #[test]
    fn test_topological_order_keeps_layers() {
        let mut graph = JobGraph::new();
        graph.add_job(job("codeml_A", JobKind::Analysis, &[], &["a.txt"])).unwrap();
        graph.add_job(job("codeml_B", JobKind::Analysis, &[], &["b.txt"])).unwrap();
        graph.add_job(job("parse_A", JobKind::Parse, &["a.txt"], &["sa.txt"])).unwrap();
        graph.add_job(job("parse_B", JobKind::Parse, &["b.txt"], &["sb.txt"])).unwrap();
        graph.link("codeml_A", "parse_A").unwrap();
        graph.link("codeml_B", "parse_B").unwrap();

        let order = topological_order(&graph).unwrap();
        assert_eq!(order, vec!["codeml_A", "codeml_B", "parse_A", "parse_B"]);
    }

    #[test]
    fn test_topological_order_reorders_dependents() {
        let mut graph = JobGraph::new();
        graph.add_job(job("parse_A", JobKind::Parse, &["a.txt"], &["sa.txt"])).unwrap();
        graph.add_job(job("codeml_A", JobKind::Analysis, &[], &["a.txt"])).unwrap();
        graph.link("codeml_A", "parse_A").unwrap();

        assert_eq!(topological_order(&graph).unwrap(), vec!["codeml_A", "parse_A"]);
    }

    #[test]
    fn test_topological_order_ignores_repeated_edges() {
        let mut graph = JobGraph::new();
        graph.add_job(job("codeml_A", JobKind::Analysis, &[], &["a.txt"])).unwrap();
        let mut parse = job("parse_A", JobKind::Parse, &["a.txt"], &["sa.txt"]);
        parse.previous = vec!["codeml_A".to_string(), "codeml_A".to_string()];
        graph.add_job(parse).unwrap();
        graph.get_job_mut("codeml_A").unwrap().next =
            vec!["parse_A".to_string(), "parse_A".to_string()];

        assert_eq!(topological_order(&graph).unwrap(), vec!["codeml_A", "parse_A"]);
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(
            ValidationError::DuplicateJobName("x".to_string()).to_string(),
            "Duplicate job name: 'x'"
        );
        assert!(ValidationError::CyclicDependency.to_string().contains("cyclic"));
        let err = ValidationError::MissingEdge {
            job: "parse_A".to_string(),
            input: "a.txt".to_string(),
            producer: "codeml_A".to_string(),
        };
        assert!(err.to_string().contains("codeml_A"));
    }
}
