//! Platform command construction and execution.
//!
//! [`OcCommand`] builds the argument vector for one `oc` invocation.
//! A [`CommandRunner`] executes it, so every platform call can be swapped
//! for a fake in tests.

use crate::{Error, Result};
use std::process::{Command, Stdio};

/// Binary spawned when no other is configured.
pub const PLATFORM_BINARY: &str = "oc";

/// Builder for one invocation of the platform binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcCommand {
    args: Vec<String>,
    interactive: bool,
}

impl OcCommand {
    /// Create a command for the given `oc` subcommand.
    pub fn new(subcommand: &str) -> Self {
        Self {
            args: vec![subcommand.to_string()],
            interactive: false,
        }
    }

    /// Create a command from a complete argument vector.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            interactive: false,
        }
    }

    /// Add an argument to the command.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Connect the command to this process's stdin, stdout and stderr.
    ///
    /// Used for prompts (`oc login`) and live progress (`oc start-build --follow`).
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Whether the command shares this process's standard streams.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Get the arguments as a slice for execution.
    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    /// Render the command as a single display string under `program`.
    pub fn render(&self, program: &str) -> String {
        let mut rendered = program.to_string();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }

    /// Render the command under the default binary name.
    ///
    /// # Example
    /// ```
    /// use ocf::exec::OcCommand;
    /// let cmd = OcCommand::new("expose").args(["svc", "my-app"]);
    /// assert_eq!(cmd.args_string(), "oc expose svc my-app");
    /// ```
    pub fn args_string(&self) -> String {
        self.render(PLATFORM_BINARY)
    }
}

/// Captured result of a command whose output is inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output followed by standard error, lossily decoded.
    pub output: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Output of a process that exited successfully.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            code: Some(0),
        }
    }

    /// Output of a process that exited with status 1.
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
            code: Some(1),
        }
    }

    /// Convert a failed exit into [`Error::Execution`], keeping the output.
    ///
    /// `command` is the rendered command line reported in the error.
    pub fn into_result(self, command: &str) -> Result<String> {
        if self.success {
            Ok(self.output)
        } else {
            Err(Error::Execution {
                command: command.to_string(),
                output: self.output,
            })
        }
    }
}

/// Trait for executing platform commands.
///
/// Each call spawns exactly one process and blocks until it exits.
pub trait CommandRunner {
    /// Run the command without capturing its output.
    ///
    /// A non-zero exit status is reported as [`Error::Execution`].
    fn run(&self, cmd: &OcCommand) -> Result<()>;

    /// Run the command and capture stdout and stderr together.
    ///
    /// `Err` means the process could not be run at all; a non-zero exit
    /// status is reported through [`CommandOutput::success`].
    fn combined_output(&self, cmd: &OcCommand) -> Result<CommandOutput>;

    /// Name of the binary commands run under, for display.
    fn program(&self) -> &str {
        PLATFORM_BINARY
    }

    /// Render `cmd` the way it is spawned.
    fn render(&self, cmd: &OcCommand) -> String {
        cmd.render(self.program())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &OcCommand) -> Result<()> {
        (**self).run(cmd)
    }

    fn program(&self) -> &str {
        (**self).program()
    }

    fn combined_output(&self, cmd: &OcCommand) -> Result<CommandOutput> {
        (**self).combined_output(cmd)
    }
}

/// Runner that spawns the real platform binary.
#[derive(Debug, Clone)]
pub struct DefaultRunner {
    program: String,
}

impl DefaultRunner {
    /// Create a runner for the given binary (a name on `PATH` or a path).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, cmd: &OcCommand) -> Command {
        let mut command = Command::new(&self.program);
        command.args(cmd.arg_list());
        command
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::Other(format!(
            "Failed to run {}: {}",
            self.program, e
        ))
    }
}

impl Default for DefaultRunner {
    fn default() -> Self {
        Self::new(PLATFORM_BINARY)
    }
}

impl CommandRunner for DefaultRunner {
    fn run(&self, cmd: &OcCommand) -> Result<()> {
        tracing::debug!(command = %self.render(cmd), interactive = cmd.is_interactive(), "run");

        let mut command = self.command(cmd);
        if cmd.is_interactive() {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        let status = command.status().map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(Error::Execution {
                command: self.render(cmd),
                output: String::new(),
            });
        }
        Ok(())
    }

    fn combined_output(&self, cmd: &OcCommand) -> Result<CommandOutput> {
        if cmd.is_interactive() {
            return Err(Error::InvalidInput(format!(
                "cannot capture output of interactive command `{}`",
                self.render(cmd)
            )));
        }
        tracing::debug!(command = %self.render(cmd), "combined output");

        let output = self
            .command(cmd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            output: text,
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    fn program(&self) -> &str {
        &self.program
    }
}
