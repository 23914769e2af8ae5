//! Shared collaborator process invocation.

use crate::{EngineError, EngineResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Invoke a collaborator binary as `<binary> <operation> <json-params>`,
/// expecting one JSON object on stdout.
///
/// The response must carry `"success": true`; any spawn failure, non-zero
/// exit, timeout, or malformed or failure-shaped response maps to
/// [`EngineError::Collaborator`].
pub(crate) async fn invoke<T>(
    binary: &Path,
    operation: &str,
    params: &Value,
    timeout: Duration,
) -> EngineResult<T>
where
    T: DeserializeOwned,
{
    let params_json = params.to_string();
    debug!(binary = %binary.display(), operation, "Invoking collaborator");

    let mut command = Command::new(binary);
    command
        .arg(operation)
        .arg(&params_json)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(EngineError::collaborator(format!(
                "failed to spawn {}: {e}",
                binary.display()
            )));
        }
        Err(_) => {
            return Err(EngineError::collaborator(format!(
                "{operation} timed out after {}s",
                timeout.as_secs()
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::collaborator(format!(
            "{operation} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let response: Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| EngineError::collaborator(format!("malformed response: {e}")))?;

    if !response
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        let message = response
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("collaborator reported failure");
        return Err(EngineError::collaborator(message.to_string()));
    }

    serde_json::from_value(response)
        .map_err(|e| EngineError::collaborator(format!("malformed response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    // `echo -n <params>` makes the shell print our scripted response verbatim.
    #[tokio::test]
    async fn test_invoke_parses_success_response() {
        let response: Value = invoke(
            Path::new("/bin/echo"),
            "-n",
            &json!({"success": true, "content": "hello"}),
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(response["content"], "hello");
    }

    #[tokio::test]
    async fn test_invoke_maps_failure_response() {
        let err = invoke::<Value>(
            Path::new("/bin/echo"),
            "-n",
            &json!({"success": false, "error": "index unavailable"}),
            TIMEOUT,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Collaborator(_)));
        assert!(err.to_string().contains("index unavailable"));
    }

    #[tokio::test]
    async fn test_invoke_rejects_non_json_output() {
        let err = invoke::<Value>(Path::new("/bin/echo"), "read", &json!({}), TIMEOUT)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("malformed response"));
    }

    #[tokio::test]
    async fn test_invoke_maps_nonzero_exit() {
        let err = invoke::<Value>(Path::new("/bin/false"), "read", &json!({}), TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Collaborator(_)));
    }

    #[tokio::test]
    async fn test_invoke_maps_spawn_failure() {
        let err = invoke::<Value>(
            Path::new("/nonexistent/collaborator-binary"),
            "read",
            &json!({}),
            TIMEOUT,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("failed to spawn"));
    }
}
