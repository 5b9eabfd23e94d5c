use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use finmcp_core::config::PythonSourceConfig;
use finmcp_core::{AdapterFailure, FailureKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{AdapterResult, LibrarySource};
use crate::normalize::{clean_value, sanitize_non_finite};

static FUNCTION_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("function name regex is valid")
});

/// Runs one library function per call in a fresh interpreter process and
/// reads its result as JSON from stdout.
pub struct PythonLibrarySource {
    interpreter: String,
    module: String,
    timeout: Duration,
    max_records: usize,
}

impl PythonLibrarySource {
    pub fn new(interpreter: impl Into<String>, module: impl Into<String>, timeout: Duration, max_records: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            module: module.into(),
            timeout,
            max_records,
        }
    }

    pub fn from_config(config: &PythonSourceConfig) -> Self {
        let interpreter = config.interpreter.clone().unwrap_or_else(|| {
            if which::which("python3").is_ok() { "python3" } else { "python" }.to_string()
        });
        Self::new(
            interpreter,
            config.module.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_records,
        )
    }
}

#[async_trait]
impl LibrarySource for PythonLibrarySource {
    async fn invoke(&self, function: &str, kwargs: &Map<String, Value>) -> AdapterResult {
        if !FUNCTION_NAME.is_match(function) {
            return Err(AdapterFailure::process(format!("invalid library function name '{}'", function)));
        }
        let script = generate_script(&self.module, function, kwargs, self.max_records);
        debug!(interpreter = %self.interpreter, module = %self.module, function, "Calling library function");

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c").arg(script).env("PYTHONIOENCODING", "utf-8");
        run_json_process(cmd, self.timeout).await.map_err(|mut failure| {
            failure.message = format!("{}.{}: {}", self.module, function, failure.message);
            failure
        })
    }
}

/// Build the script that imports `module`, calls `function(**kwargs)` and
/// prints the result as JSON.
///
/// Table results become a list of row objects. NaN and infinities become
/// `None`, date-times become ISO-8601 strings, and lists longer than
/// `max_records` are cut with a warning on stderr. Any exception is written
/// to stderr as `{"error": ...}` with exit status 1.
pub fn generate_script(module: &str, function: &str, kwargs: &Map<String, Value>, max_records: usize) -> String {
    let kwargs_json = Value::Object(kwargs.clone()).to_string();
    // A JSON string literal is also a valid Python string literal.
    let kwargs_literal = Value::String(kwargs_json).to_string();
    format!(
        r#"import datetime
import json
import math
import sys


def _clean(value):
    if value is None or isinstance(value, (bool, int, str)):
        return value
    if isinstance(value, float):
        return None if math.isnan(value) or math.isinf(value) else value
    if isinstance(value, dict):
        return {{str(k): _clean(v) for k, v in value.items()}}
    if isinstance(value, (list, tuple)):
        return [_clean(v) for v in value]
    try:
        if value != value:
            return None
    except Exception:
        pass
    if isinstance(value, (datetime.datetime, datetime.date, datetime.time)) or hasattr(value, "isoformat"):
        return value.isoformat()
    if hasattr(value, "item"):
        return _clean(value.item())
    return str(value)


try:
    import {module} as _lib

    kwargs = {{k: v for k, v in json.loads({kwargs_literal}).items() if v is not None and v != ""}}
    result = getattr(_lib, "{function}")(**kwargs)
    if hasattr(result, "to_dict"):
        try:
            result = result.to_dict(orient="records")
        except TypeError:
            result = result.to_dict()
    if isinstance(result, list) and len(result) > {max_records}:
        sys.stderr.write("warning: truncated %d records to {max_records}\n" % len(result))
        result = result[:{max_records}]
    sys.stdout.write(json.dumps(_clean(result), ensure_ascii=False, default=str))
except Exception as exc:
    sys.stderr.write(json.dumps({{"error": str(exc), "type": type(exc).__name__}}, ensure_ascii=False))
    sys.exit(1)
"#
    )
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(buf).await?;
    }
    Ok(())
}

/// Spawn `cmd`, wait at most `deadline`, and parse its stdout as JSON.
///
/// On timeout the child is killed and reaped before returning.
pub(crate) async fn run_json_process(mut cmd: Command, deadline: Duration) -> AdapterResult {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| AdapterFailure::process(format!("failed to start process: {}", e)))?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let mut out = Vec::new();
    let mut err = Vec::new();
    let waited = timeout(deadline, async {
        let (o, e, status) = tokio::join!(read_pipe(stdout, &mut out), read_pipe(stderr, &mut err), child.wait());
        o?;
        e?;
        status
    })
    .await;

    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => return Err(AdapterFailure::process(format!("process I/O failed: {}", e))),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill timed-out process");
            }
            return Err(AdapterFailure::timeout(format!(
                "process timed out after {} seconds",
                deadline.as_secs_f64()
            )));
        }
    };

    let stdout = String::from_utf8_lossy(&out);
    let stderr = String::from_utf8_lossy(&err);

    if !status.success() {
        let code = status.code().map(|c| c.to_string()).unwrap_or_else(|| "signal".into());
        return Err(AdapterFailure::process(format!(
            "exited with status {}: {}",
            code,
            stderr_message(&stderr)
        )));
    }

    if !stderr.trim().is_empty() {
        warn!(stderr = %crate::safe_truncate(stderr.trim(), 500), "Library process wrote to stderr");
    }

    let text = stdout.trim();
    if text.is_empty() {
        return Err(AdapterFailure::new(FailureKind::EmptyOutput, "empty output"));
    }

    match serde_json::from_str::<Value>(&sanitize_non_finite(text)) {
        Ok(value) => Ok(clean_value(value)),
        Err(e) => Err(AdapterFailure::parse(format!(
            "parse error: {}; output: {}",
            e,
            crate::safe_truncate(text, 200)
        ))),
    }
}

/// The `error` field of the last JSON line on stderr, or the raw text.
fn stderr_message(stderr: &str) -> String {
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(last.trim()) {
        if let Some(msg) = obj.get("error").and_then(|v| v.as_str()) {
            return msg.to_string();
        }
    }
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        "no error output".to_string()
    } else {
        crate::safe_truncate(trimmed, 500).to_string()
    }
}
