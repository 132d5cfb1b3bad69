//! The request serving loop
//!
//! Reads one line at a time, dispatches it and writes exactly one reply line
//! before reading the next. Only end of input or a failed read/write stops
//! the loop.

use std::time::Instant;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::errors::ServerError;
use crate::logging::log_request_summary;
use crate::mcp::rpc::{ResponseEnvelope, RpcError};
use crate::mcp::server::handle_json_rpc_value;
use crate::AppState;

pub async fn serve_stdio(state: AppState) -> Result<(), ServerError> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve(state, reader, writer).await
}

pub async fn serve<R, W>(state: AppState, mut reader: R, mut writer: W) -> Result<(), ServerError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(prompts = state.registry.len(), "context server started");

    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .await
            .map_err(ServerError::Read)?;
        if read == 0 {
            info!("received EOF, shutting down");
            break;
        }

        let started_at = Instant::now();
        debug!(input = %String::from_utf8_lossy(&buffer).trim_end(), "received input");

        let (method, envelope) = handle_line(&state, &buffer).await;
        let line = envelope.to_line();
        write_line(&mut writer, line).await?;

        log_request_summary(&method, &envelope.id, envelope.is_error(), started_at);
    }

    info!("context server stopped");
    Ok(())
}

/// Decodes one raw line and dispatches it on its own task, so nothing that
/// goes wrong while handling the request can take the loop down with it.
async fn handle_line(state: &AppState, line: &[u8]) -> (String, ResponseEnvelope) {
    let payload: Value = match serde_json::from_slice(line) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to parse request line");
            return (
                "<unparsed>".to_string(),
                ResponseEnvelope::error(Value::Null, RpcError::internal()),
            );
        }
    };

    let method = payload
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();

    let task_state = state.clone();
    let task = tokio::spawn(async move { handle_json_rpc_value(&task_state, payload).await });
    let envelope = match task.await {
        Ok(envelope) => envelope,
        Err(err) => {
            error!(method = %method, error = %err, "request dispatch aborted");
            ResponseEnvelope::error(Value::Null, RpcError::internal())
        }
    };

    (method, envelope)
}

async fn write_line<W>(writer: &mut W, line: String) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    debug!(output = %line, "sending response");
    let mut bytes = line.into_bytes();
    bytes.push(b'\n');
    writer.write_all(&bytes).await.map_err(ServerError::Write)?;
    writer.flush().await.map_err(ServerError::Write)
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };

    use serde_json::json;

    use super::*;
    use crate::domain::command::{PromptArguments, PromptDefinition};
    use crate::domain::registry::PromptRegistry;
    use crate::errors::HandlerError;
    use crate::mcp::server::ServerInfo;

    async fn echo(arguments: PromptArguments) -> Result<Value, HandlerError> {
        Ok(json!(arguments.str("text")?))
    }

    async fn exploding(_arguments: PromptArguments) -> Result<Value, HandlerError> {
        panic!("kaboom");
    }

    fn state() -> AppState {
        let mut registry = PromptRegistry::new();
        registry
            .register(PromptDefinition::new("echo", echo).argument("text"))
            .expect("register echo");
        registry
            .register(PromptDefinition::new("exploding", exploding))
            .expect("register exploding");
        AppState::new(
            ServerInfo {
                name: "loop test".to_string(),
                version: "0.0.1".to_string(),
            },
            registry,
        )
    }

    async fn run(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        serve(state(), input.as_bytes(), &mut output)
            .await
            .expect("loop ends cleanly");
        String::from_utf8(output)
            .expect("utf8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is json"))
            .collect()
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn empty_input_produces_no_output() {
        assert!(run("").await.is_empty());
    }

    #[tokio::test]
    async fn responses_follow_request_order() {
        let input: String = (0..20)
            .map(|i| {
                format!(
                    "{{\"method\":\"prompts/get\",\"params\":{{\"name\":\"echo\",\"arguments\":{{\"text\":\"m{i}\"}}}},\"id\":{i}}}\n"
                )
            })
            .collect();

        let responses = run(&input).await;
        assert_eq!(responses.len(), 20);
        for (i, response) in responses.iter().enumerate() {
            assert_eq!(response["id"], json!(i));
            assert_eq!(response["result"]["prompt"], json!(format!("m{i}")));
        }
    }

    #[tokio::test]
    async fn unparseable_line_gets_null_id_and_loop_continues() {
        let responses = run("{not json\n{\"method\":\"prompts/list\",\"id\":2}\n").await;
        assert_eq!(responses.len(), 2);
        assert_eq!(
            responses[0],
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32603, "message": "Internal error"}})
        );
        assert_eq!(responses[1]["id"], json!(2));
        assert!(responses[1]["result"]["prompts"].is_array());
    }

    #[tokio::test]
    async fn blank_line_is_answered() {
        let responses = run("\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], json!(-32603));
    }

    #[tokio::test]
    async fn final_line_without_terminator_is_served() {
        let responses = run("{\"method\":\"bogus\",\"id\":\"last\"}").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], json!("last"));
        assert_eq!(responses[0]["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_the_loop() {
        let responses = run(concat!(
            "{\"method\":\"prompts/get\",\"params\":{\"name\":\"exploding\"},\"id\":1}\n",
            "{\"method\":\"prompts/get\",\"params\":{\"name\":\"echo\",\"arguments\":{\"text\":\"ok\"}},\"id\":2}\n",
        ))
        .await;
        assert_eq!(
            responses[0],
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "kaboom"}})
        );
        assert_eq!(
            responses[1],
            json!({"jsonrpc": "2.0", "id": 2, "result": {"prompt": "ok"}})
        );
    }

    #[tokio::test]
    async fn write_failure_stops_the_loop() {
        let input = "{\"method\":\"prompts/list\",\"id\":1}\n{\"method\":\"prompts/list\",\"id\":2}\n";
        let err = serve(state(), input.as_bytes(), BrokenPipe)
            .await
            .expect_err("write must fail");
        assert!(matches!(err, ServerError::Write(_)));
    }

    #[tokio::test]
    async fn every_reply_is_a_single_terminated_line() {
        let mut output = Vec::new();
        serve(
            state(),
            "{\"method\":\"initialize\",\"id\":1}\n{\"method\":\"prompts/list\"}\n".as_bytes(),
            &mut output,
        )
        .await
        .expect("loop ends cleanly");

        let text = String::from_utf8(output).expect("utf8 output");
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 2);
        let second: Value = serde_json::from_str(text.lines().nth(1).expect("second line"))
            .expect("json");
        assert_eq!(second["id"], Value::Null);
    }
}
