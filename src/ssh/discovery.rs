use tracing::debug;

use super::executor::{CommandExecutor, CommandInvocation, ExecutionResult};
use super::ssh_session::Transport;
use crate::error::{Error, Result};

/// An executable found under the workspace root, e.g. `.../lib/<package>/<executable>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCandidate {
    pub package: String,
    pub executable: String,
    pub path: String,
}

impl ScriptCandidate {
    /// `<runner> <package> <executable>`, with both names passed as single
    /// shell words whatever characters they contain.
    pub fn run_command(&self, runner: &str) -> String {
        format!(
            "{} {} {}",
            runner,
            shell_words::quote(&self.package),
            shell_words::quote(&self.executable)
        )
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.package, self.executable)
    }
}

/// The listing command run on the target. `workspace_root` is used verbatim so
/// that a leading `~` still expands remotely.
pub fn listing_command(workspace_root: &str) -> String {
    format!("find {workspace_root} -maxdepth 2 -type f -executable")
}

/// Turns listing output into candidates, silently dropping lines that do not
/// name at least `<package>/<executable>`.
pub fn parse_listing(output: &str) -> Vec<ScriptCandidate> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("find:"))
        .filter_map(|line| {
            let mut segments = line.rsplit('/').filter(|s| !s.is_empty());
            let executable = segments.next()?;
            let package = segments.next()?;
            Some(ScriptCandidate {
                package: package.to_string(),
                executable: executable.to_string(),
                path: line.to_string(),
            })
        })
        .collect()
}

pub struct ScriptDiscovery<'a> {
    executor: &'a CommandExecutor,
    workspace_root: &'a str,
}

impl<'a> ScriptDiscovery<'a> {
    pub fn new(executor: &'a CommandExecutor, workspace_root: &'a str) -> Self {
        Self {
            executor,
            workspace_root,
        }
    }

    pub async fn discover(&self, transport: Option<&dyn Transport>) -> Result<Vec<ScriptCandidate>> {
        let invocation = CommandInvocation::captured(listing_command(self.workspace_root));
        let ExecutionResult {
            exit_status,
            output,
        } = self.executor.execute(transport, &invocation).await?;

        let candidates = parse_listing(&output);
        debug!(
            "listing exited with {:?}, {} candidates",
            exit_status,
            candidates.len()
        );

        // find exits non-zero when a single sub-directory is unreadable;
        // whatever it did list is still usable
        if exit_status != Some(0) && candidates.is_empty() {
            return Err(Error::Discovery {
                status: exit_status,
                output,
            });
        }
        Ok(candidates)
    }
}
