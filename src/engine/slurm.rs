//! SLURM Batch Scripts
//!
//! Writes one `#SBATCH` script per job and a `submit.sh` that submits them
//! with `sbatch`, passing each job's dependencies as `--dependency=afterok`
//! so the cluster scheduler enforces the graph edges.
//!
//! Job commands use paths relative to the project root, and sbatch runs each
//! job in the directory it was called from. `submit.sh` therefore stays in
//! the caller's directory and must be run from the project root, e.g.
//! `bash steps/jobs/submit.sh`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::JobSink;
use crate::error::Result;
use crate::workflow::Job;

/// Name of the generated submission script.
pub const SUBMIT_SCRIPT: &str = "submit.sh";

/// Writes batch scripts into a directory.
pub struct ScriptSink {
    dir: PathBuf,
    registered: Vec<(String, Vec<String>)>,
}

impl ScriptSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registered: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the batch script for `job_name`.
    pub fn script_path(&self, job_name: &str) -> PathBuf {
        self.dir.join(format!("{}.sh", job_name))
    }
}

/// SLURM expects an integer with an upper-case unit letter and no trailing
/// `B`. Fractional sizes are rounded up to whole megabytes.
fn slurm_memory(memory: &str) -> String {
    let size = memory.trim_end_matches(&['b', 'B'][..]);
    let Some(unit) = size.chars().last() else {
        return String::new();
    };
    let amount = &size[..size.len() - unit.len_utf8()];
    if !amount.contains('.') {
        return size.to_ascii_uppercase();
    }

    let megabytes_per_unit = match unit.to_ascii_lowercase() {
        'k' => 1.0 / 1024.0,
        'm' => 1.0,
        'g' => 1024.0,
        't' => 1024.0 * 1024.0,
        _ => return size.to_ascii_uppercase(),
    };
    match amount.parse::<f64>() {
        Ok(value) => format!("{}M", (value * megabytes_per_unit).ceil() as u64),
        Err(_) => size.to_ascii_uppercase(),
    }
}

/// Renders the batch script of one job.
pub fn render_batch_script(job: &Job) -> String {
    let resources = &job.resources;
    let mut script = String::new();

    script.push_str("#!/bin/bash\n");
    script.push_str(&format!("#SBATCH --job-name={}\n", job.name));
    script.push_str(&format!("#SBATCH --cpus-per-task={}\n", resources.cores));
    script.push_str(&format!("#SBATCH --time={}\n", resources.walltime));
    script.push_str(&format!("#SBATCH --mem={}\n", slurm_memory(&resources.memory)));
    if let Some(account) = &resources.account {
        script.push_str(&format!("#SBATCH --account={}\n", account));
    }
    script.push('\n');

    for input in &job.inputs {
        script.push_str(&format!("# input: {}\n", input));
    }
    for output in &job.outputs {
        script.push_str(&format!("# output: {}\n", output));
    }

    script.push_str("set -e\n");
    script.push_str(job.command.trim_end());
    script.push('\n');
    script
}

fn write_executable(path: &Path, content: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

impl JobSink for ScriptSink {
    fn register(&mut self, job: &Job) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.script_path(&job.name);
        write_executable(&path, &render_batch_script(job))?;
        debug!("Wrote batch script {}", path.display());

        self.registered.push((job.name.clone(), job.previous.clone()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut script = String::new();
        script.push_str("#!/bin/bash\n");
        script.push_str("set -e\n");
        script.push_str("# Run from the project root; jobs inherit this directory.\n");
        script.push_str("jobs_dir=\"$(dirname \"$0\")\"\n");
        script.push_str("declare -A ids\n");

        for (name, previous) in &self.registered {
            let dependency = if previous.is_empty() {
                String::new()
            } else {
                let ids: Vec<String> = previous.iter().map(|p| format!("${{ids[{}]}}", p)).collect();
                format!(" --dependency=afterok:{}", ids.join(":"))
            };
            script.push_str(&format!(
                "ids[{name}]=$(sbatch --parsable{dependency} \"$jobs_dir/{name}.sh\")\n",
                name = name,
                dependency = dependency
            ));
        }
        script.push_str(&format!("echo \"Submitted {} jobs\"\n", self.registered.len()));

        let path = self.dir.join(SUBMIT_SCRIPT);
        write_executable(&path, &script)?;

        info!(
            "Wrote {} batch scripts and {} to {}",
            self.registered.len(),
            SUBMIT_SCRIPT,
            self.dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::submit;
    use crate::workflow::{JobGraph, JobKind, Resources};
    use tempfile::tempdir;

    fn analysis_job() -> Job {
        Job::new("codeml_A", JobKind::Analysis, "A", "python scripts/codeml.py d/A.phylib\nsleep 5")
            .with_inputs(vec!["d/A.phylib".into(), "d/A.nw".into()])
            .with_outputs(vec!["c/A/A.txt".into(), "c/A/A.ctl".into()])
            .with_resources(Resources::new(1, "02:00:00", "8g").with_account("simons"))
    }

    fn graph() -> JobGraph {
        let mut graph = JobGraph::new();
        graph.add_job(analysis_job()).unwrap();
        graph
            .add_job(
                Job::new("parse_A", JobKind::Parse, "A", "python scripts/parse_codeml.py c/A/A.txt s/A.txt")
                    .with_inputs(vec!["c/A/A.txt".into()])
                    .with_outputs(vec!["s/A.txt".into()])
                    .with_resources(Resources::new(1, "00:10:00", "8g")),
            )
            .unwrap();
        graph.link("codeml_A", "parse_A").unwrap();
        graph
    }

    #[test]
    fn test_slurm_memory() {
        assert_eq!(slurm_memory("8g"), "8G");
        assert_eq!(slurm_memory("512mb"), "512M");
        assert_eq!(slurm_memory("16GB"), "16G");
    }

    #[test]
    fn test_slurm_memory_fraction_in_megabytes() {
        assert_eq!(slurm_memory("1.5g"), "1536M");
        assert_eq!(slurm_memory("1.5GB"), "1536M");
        assert_eq!(slurm_memory("0.5m"), "1M");
        assert_eq!(slurm_memory("2.25t"), "2359296M");
    }

    #[test]
    fn test_render_batch_script() {
        let script = render_batch_script(&analysis_job());

        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("#SBATCH --job-name=codeml_A\n"));
        assert!(script.contains("#SBATCH --cpus-per-task=1\n"));
        assert!(script.contains("#SBATCH --time=02:00:00\n"));
        assert!(script.contains("#SBATCH --mem=8G\n"));
        assert!(script.contains("#SBATCH --account=simons\n"));
        assert!(script.contains("# input: d/A.nw\n"));
        assert!(script.contains("# output: c/A/A.ctl\n"));
        assert!(script.ends_with("set -e\npython scripts/codeml.py d/A.phylib\nsleep 5\n"));
    }

    #[test]
    fn test_render_without_account() {
        let job = analysis_job().with_resources(Resources::new(2, "00:10:00", "1g"));
        let script = render_batch_script(&job);
        assert!(!script.contains("--account"));
        assert!(script.contains("--cpus-per-task=2"));
    }

    #[test]
    fn test_scripts_and_submit_file_written() {
        let dir = tempdir().unwrap();
        let jobs_dir = dir.path().join("jobs");

        let mut sink = ScriptSink::new(&jobs_dir);
        submit(&graph(), &mut sink).unwrap();

        assert!(sink.script_path("codeml_A").is_file());
        assert!(sink.script_path("parse_A").is_file());

        let submit_script = fs::read_to_string(jobs_dir.join(SUBMIT_SCRIPT)).unwrap();
        let lines: Vec<&str> = submit_script.lines().collect();
        assert!(!submit_script.contains("cd "));
        assert!(lines.contains(&"ids[codeml_A]=$(sbatch --parsable \"$jobs_dir/codeml_A.sh\")"));
        assert!(lines.contains(
            &"ids[parse_A]=$(sbatch --parsable --dependency=afterok:${ids[codeml_A]} \"$jobs_dir/parse_A.sh\")"
        ));

        let codeml_pos = lines.iter().position(|l| l.starts_with("ids[codeml_A]")).unwrap();
        let parse_pos = lines.iter().position(|l| l.starts_with("ids[parse_A]")).unwrap();
        assert!(codeml_pos < parse_pos);
    }

    #[cfg(unix)]
    #[test]
    fn test_scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let mut sink = ScriptSink::new(dir.path());
        submit(&graph(), &mut sink).unwrap();

        let mode = fs::metadata(sink.script_path("parse_A")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn test_submit_script_keeps_project_root_as_job_directory() {
        use std::process::Command;

        let root = tempdir().unwrap();
        let mut sink = ScriptSink::new(root.path().join("steps/jobs"));
        submit(&graph(), &mut sink).unwrap();

        // Stand-in sbatch recording its working directory and arguments
        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let log = root.path().join("sbatch.log");
        write_executable(
            &bin.join("sbatch"),
            "#!/bin/sh\necho \"$(pwd) $*\" >> \"$SBATCH_LOG\"\necho 42\n",
        )
        .unwrap();

        let path = format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default());
        let status = Command::new("bash")
            .arg("steps/jobs/submit.sh")
            .current_dir(root.path())
            .env("PATH", path)
            .env("SBATCH_LOG", &log)
            .status()
            .unwrap();
        assert!(status.success());

        let root_dir = root.path().canonicalize().unwrap();
        let calls = fs::read_to_string(&log).unwrap();
        let calls: Vec<&str> = calls.lines().collect();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            let (cwd, _) = call.split_once(' ').unwrap();
            assert_eq!(Path::new(cwd).canonicalize().unwrap(), root_dir);
        }
        assert!(calls[0].ends_with("--parsable steps/jobs/codeml_A.sh"));
        assert!(calls[1].ends_with("--parsable --dependency=afterok:42 steps/jobs/parse_A.sh"));
    }
}
