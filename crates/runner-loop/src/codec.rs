//! Wire codec for driver commands and results.
//!
//! The driver answers each poll with a body whose first line is either the
//! completion marker or a form-urlencoded `cmd=..&1=..&2=..` query. Any
//! further lines are session directives, one `key=value` per line.
//!
//! Results travel the other way as a single line: `OK`, `OK,<value>`, a
//! failure message verbatim, or `ERROR: <message>`.

use runner_protocols::{Command, Outcome};
use url::form_urlencoded;

use crate::error::{CodecError, ProtocolError};

/// Prefix of the line that ends the current run.
pub const COMPLETE_MARKER: &str = "|testComplete";

/// Command name asking for the previous result to be re-sent.
pub const RETRY_LAST: &str = "retryLast";

/// Result posted on the first request of a run.
pub const START: &str = "START";

/// Result posted for a successful command without a value.
pub const OK: &str = "OK";

/// Form field carrying the result in the request body.
pub const POSTED_DATA_FIELD: &str = "postedData";

/// What the driver asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Run this command.
    Execute(Command),
    /// Re-send the previous body unchanged.
    RetryLast,
    /// The current run is over.
    Complete,
}

/// Session directive carried on the lines after the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Alias the current window is known by.
    WindowName(String),
    /// Session identifier; only honoured if none is set yet.
    SessionId(String),
    /// Opaque binding kept for the session.
    Bind { key: String, value: String },
}

/// A fully decoded driver response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub instruction: Instruction,
    pub directives: Vec<Directive>,
}

/// Decode a raw driver response.
pub fn decode(raw: &str) -> Result<Decoded, ProtocolError> {
    if raw.trim().is_empty() {
        return Err(ProtocolError::EmptyResponse);
    }

    let (first, rest) = raw.split_once('\n').unwrap_or((raw, ""));
    let first = first.trim_end();

    let instruction = if first.starts_with(COMPLETE_MARKER) {
        Instruction::Complete
    } else {
        let command = decode_command(first)?;
        if command.name == RETRY_LAST {
            Instruction::RetryLast
        } else {
            Instruction::Execute(command)
        }
    };

    let directives = rest.lines().filter_map(decode_directive).collect();

    Ok(Decoded {
        instruction,
        directives,
    })
}

fn decode_command(line: &str) -> Result<Command, ProtocolError> {
    let mut name = None;
    let mut arg1 = String::new();
    let mut arg2 = String::new();

    for (key, value) in form_urlencoded::parse(line.as_bytes()) {
        match key.as_ref() {
            "cmd" => name = Some(value.into_owned()),
            "1" => arg1 = value.into_owned(),
            "2" => arg2 = value.into_owned(),
            _ => {}
        }
    }

    match name {
        Some(name) => Ok(Command::new(name, arg1, arg2)),
        None => Err(ProtocolError::MissingCommand(line.to_string())),
    }
}

fn decode_directive(line: &str) -> Option<Directive> {
    let line = line.trim_end();
    if line.is_empty() {
        return None;
    }
    if !line.contains('=') {
        tracing::warn!(line, "Ignoring malformed session directive");
        return None;
    }

    let (key, value) = form_urlencoded::parse(line.as_bytes()).next()?;
    let value = value.into_owned();
    Some(match key.as_ref() {
        "seleniumWindowName" => Directive::WindowName(value),
        "sessionId" => Directive::SessionId(value),
        _ => Directive::Bind {
            key: key.into_owned(),
            value,
        },
    })
}

/// Encode a resolved outcome as a wire result.
pub fn encode(outcome: &Outcome) -> Result<String, CodecError> {
    let result = match outcome {
        Outcome::Passed | Outcome::ValueReturned(None) => OK.to_string(),
        Outcome::ValueReturned(Some(value)) => format!("{},{}", OK, value),
        Outcome::Failed(message) => message.clone(),
        Outcome::Errored(message) => format!("ERROR: {}", message),
        Outcome::DeferredCompletion(_) => return Err(CodecError::UnresolvedOutcome),
    };
    Ok(flatten_newlines(&result))
}

/// Replace each `\r\n`, `\n` or `\r` with a single space.
fn flatten_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Form-encoded request body carrying `result`.
pub fn encode_body(result: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(POSTED_DATA_FIELD, result)
        .finish()
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
