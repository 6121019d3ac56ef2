use std::path::Path;

/// How a worker is invoked. The per-job `-c <config> -n <count>` arguments
/// are appended after `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// Run `binary ue` inside a network namespace through `sudo ip netns exec`.
    pub fn in_netns(namespace: &str, binary: &str) -> Self {
        Self {
            program: "sudo".to_string(),
            args: vec![
                "ip".to_string(),
                "netns".to_string(),
                "exec".to_string(),
                namespace.to_string(),
                binary.to_string(),
                "ue".to_string(),
            ],
        }
    }

    pub fn direct(binary: &str) -> Self {
        Self {
            program: binary.to_string(),
            args: vec!["ue".to_string()],
        }
    }

    pub fn to_args(&self, config_path: &Path, count: u32) -> Vec<String> {
        let mut args = self.args.clone();

        args.push("-c".to_string());
        args.push(config_path.display().to_string());

        args.push("-n".to_string());
        args.push(count.to_string());

        args
    }
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self::in_netns("free-ue-ns", "build/free-ran-ue")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netns_command_wraps_worker() {
        let command = WorkerCommand::in_netns("free-ue-ns", "/opt/free-ran-ue");
        let args = command.to_args(Path::new("/tmp/ue_fast_b1_1.yaml"), 9);

        assert_eq!(command.program, "sudo");
        assert_eq!(
            args,
            vec![
                "ip",
                "netns",
                "exec",
                "free-ue-ns",
                "/opt/free-ran-ue",
                "ue",
                "-c",
                "/tmp/ue_fast_b1_1.yaml",
                "-n",
                "9",
            ]
        );
    }

    #[test]
    fn direct_command_appends_job_arguments() {
        let command = WorkerCommand::direct("./worker");
        let args = command.to_args(Path::new("cfg.yaml"), 1);
        assert_eq!(command.program, "./worker");
        assert_eq!(args, vec!["ue", "-c", "cfg.yaml", "-n", "1"]);
    }
}
