//! Request/response loop.
//!
//! One line in, one line out, strictly in order. Nothing a client sends can
//! stop the loop: malformed lines, unknown methods and handler failures all
//! come back as error responses. Only end of input (or a broken output
//! stream) ends [`Dispatcher::serve`].

use crate::core::error::RosterError;
use crate::core::registry::{Registry, ToolContext};
use crate::core::rpc::{Request, Response};
use crate::core::store::UserStore;
use crate::core::validate;
use std::io::{BufRead, Write};

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    store: &'a UserStore,
}

/// Counters reported when the input stream closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub requests: u64,
    pub errors: u64,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry, store: &'a UserStore) -> Self {
        Self { registry, store }
    }

    /// Resolve and run one decoded request.
    pub fn dispatch(&self, request: &Request) -> Response {
        match self.invoke(request) {
            Ok(result) => Response::success(request, result),
            Err(err) => {
                tracing::warn!(method = %request.method, error = %err, "request failed");
                Response::failure(request, &err)
            }
        }
    }

    fn invoke(&self, request: &Request) -> Result<serde_json::Value, RosterError> {
        let tool = self
            .registry
            .resolve(&request.method)
            .ok_or_else(|| RosterError::UnknownMethod(request.method.clone()))?;
        validate::ensure_params(&tool.descriptor, &request.params)?;
        let ctx = ToolContext {
            store: self.store,
            registry: self.registry,
        };
        (tool.handler)(&ctx, &request.params)
    }

    /// Handle one raw line. `None` for blank lines, which are not requests.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let response = match Request::decode(line) {
            Ok(request) => {
                tracing::debug!(method = %request.method, id = ?request.id, "request");
                self.dispatch(&request)
            }
            Err(failure) => {
                tracing::warn!(error = %failure.error, "undecodable request");
                failure.into_response()
            }
        };
        Some(response)
    }

    /// Serve until `input` reaches end of stream. Each response is written
    /// and flushed before the next line is read.
    pub fn serve<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<ServeSummary, RosterError> {
        let mut summary = ServeSummary::default();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line),
                Err(e) => Some(Response::undecodable(format!(
                    "message is not valid UTF-8: {e}"
                ))),
            };
            let Some(response) = response else { continue };

            summary.requests += 1;
            if response.is_error() {
                summary.errors += 1;
            }
            output.write_all(response.encode_line()?.as_bytes())?;
            output.flush()?;
        }
        tracing::info!(
            requests = summary.requests,
            errors = summary.errors,
            "input closed, worker stopping"
        );
        Ok(summary)
    }
}
