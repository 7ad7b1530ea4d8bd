//! Client side of the stdio channel.
//!
//! Owns one worker child process and talks to it strictly half-duplex: write
//! one request line, read one response line. Anything that prevents a
//! correlated response from arriving is a `ChannelError`; the caller may then
//! drop the client and spawn a fresh worker.

use crate::core::error::RosterError;
use crate::core::registry::ToolDescriptor;
use crate::core::rpc::{Request, Response};
use crate::core::time;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub struct WorkerClient {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl WorkerClient {
    /// Start `program` with `args` as a worker. Its stderr is inherited so
    /// worker logs stay visible.
    pub fn spawn<I, S>(program: &OsStr, args: I) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| RosterError::ChannelError(format!("failed to start worker: {e}")))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RosterError::ChannelError("worker stdout not captured".to_string()))?;
        tracing::debug!(pid = child.id(), "worker started");
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Whether the worker process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Send one request and wait for its response.
    pub fn call(&mut self, method: &str, params: Map<String, Value>) -> Result<Response, RosterError> {
        let exited = self
            .child
            .try_wait()
            .map_err(|e| RosterError::ChannelError(format!("failed to poll worker: {e}")))?;
        if let Some(status) = exited {
            return Err(RosterError::ChannelError(format!(
                "worker not running ({status})"
            )));
        }

        let request = Request::new(time::new_event_id(), method, params);
        let line = request.encode_line()?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RosterError::ChannelError("worker input already closed".to_string()))?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.flush())
            .map_err(|e| RosterError::ChannelError(format!("failed to write to worker: {e}")))?;

        let mut reply = String::new();
        let read = self
            .stdout
            .read_line(&mut reply)
            .map_err(|e| RosterError::ChannelError(format!("failed to read from worker: {e}")))?;
        if read == 0 {
            return Err(RosterError::ChannelError(
                "no response from worker".to_string(),
            ));
        }

        let response = Response::decode(&reply)
            .map_err(|e| RosterError::ChannelError(format!("invalid worker response: {e}")))?;
        if response.id != request.id {
            return Err(RosterError::ChannelError(format!(
                "response id {:?} does not match request id {:?}",
                response.id, request.id
            )));
        }
        Ok(response)
    }

    /// The worker's catalog, via `list_tools`.
    pub fn fetch_catalog(&mut self) -> Result<Vec<ToolDescriptor>, RosterError> {
        let response = self.call("list_tools", Map::new())?;
        let mut result = response
            .into_result()
            .map_err(|e| RosterError::ChannelError(format!("list_tools failed: {e}")))?;
        let tools = result
            .get_mut("tools")
            .map(Value::take)
            .unwrap_or_else(|| Value::Array(vec![]));
        Ok(serde_json::from_value(tools)?)
    }

    /// Close the worker's input and wait for it to exit.
    pub fn shutdown(mut self) -> Result<std::process::ExitStatus, RosterError> {
        drop(self.stdin.take());
        Ok(self.child.wait()?)
    }
}

impl Drop for WorkerClient {
    fn drop(&mut self) {
        if self.stdin.take().is_some() && self.is_alive() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
