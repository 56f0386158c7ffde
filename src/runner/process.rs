//! Tool invocation through OS subprocesses

use crate::core::CommandSpec;
use crate::runner::{InvokeError, OutputCallback, OutputStream, ToolExit, ToolInvoker};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs tools as child processes, streaming their output line by line
///
/// On unix each tool gets its own process group. Dropping the invocation
/// future (timeout, cancellation) kills the whole group, so processes the
/// tool started itself die with it. Elsewhere only the direct child is
/// killed (`kill_on_drop`).
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        command: &CommandSpec,
        output: &dyn OutputCallback,
    ) -> Result<ToolExit, InvokeError> {
        if let Some(dir) = &command.working_dir {
            if !dir.is_dir() {
                return Err(InvokeError::MissingWorkingDir {
                    program: command.program.clone(),
                    dir: dir.clone(),
                });
            }
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        debug!("Spawning: {}", command.display());
        let mut child = cmd
            .spawn()
            .map_err(|source| InvokeError::from_spawn(&command.program, source))?;
        // Declared after `child` so it drops first
        let mut group = GroupKill::new(&command.program, child.id());

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_lines(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_lines(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut line_count = 0usize;
        while let Some((stream, line)) = rx.recv().await {
            line_count += 1;
            output.on_line(stream, &line);
        }

        let status = child.wait().await.map_err(|source| InvokeError::Wait {
            program: command.program.clone(),
            source,
        })?;
        group.disarm();

        debug!(
            "{} exited with {:?} after {} lines of output",
            command.program,
            status.code(),
            line_count
        );

        Ok(ToolExit {
            code: status.code(),
            success: status.success(),
        })
    }
}

/// Kills the child's process group when dropped, unless disarmed after the
/// child was reaped
struct GroupKill<'a> {
    program: &'a str,
    pgid: Option<u32>,
}

impl<'a> GroupKill<'a> {
    fn new(program: &'a str, pid: Option<u32>) -> Self {
        Self {
            program,
            pgid: if cfg!(unix) { pid } else { None },
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupKill<'_> {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Ok(raw) = i32::try_from(pgid) else {
                return;
            };
            match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) => debug!("Killed process group {} of {}", pgid, self.program),
                Err(Errno::ESRCH) => {}
                Err(e) => warn!("Failed to kill process group {} of {}: {}", pgid, self.program, e),
            }
        }
        #[cfg(not(unix))]
        let _ = (pgid, self.program);
    }
}

/// Forward every line of `reader` to `tx`; invalid UTF-8 is replaced
async fn pump_lines<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<(OutputStream, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c| c == '\n' || c == '\r')
                    .to_string();
                if tx.send((stream, line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed reading {:?}: {}", stream, e);
                break;
            }
        }
    }
}
