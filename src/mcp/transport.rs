//! Line-delimited transport for the MCP server.
//!
//! MCP's stdio transport frames messages as follows:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! The same framing is used over a TCP connection, so [`LineTransport`] is
//! written against any async reader/writer pair.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::mcp::protocol::OutgoingMessage;

type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// A newline-delimited JSON-RPC transport.
pub struct LineTransport {
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl LineTransport {
    /// Creates a transport over an arbitrary reader/writer pair.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    /// Creates a transport over an accepted TCP connection.
    #[must_use]
    pub fn tcp(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self::new(BufReader::new(read_half), write_half)
    }

    /// Reads the next message line.
    ///
    /// Returns `None` once the peer closes its side (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);

        Ok(Some(line))
    }

    /// Serialises and writes one outgoing message.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn send(&mut self, message: &OutgoingMessage) -> io::Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // serde_json escapes newlines inside strings, so compact output is a
        // single line.
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}

impl std::fmt::Debug for LineTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineTransport").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{JsonRpcResponse, RequestId};

    #[tokio::test]
    async fn reads_lines_and_strips_crlf() {
        let input: &[u8] = b"{\"a\":1}\r\n\n{\"b\":2}";
        let mut transport = LineTransport::new(input, tokio::io::sink());

        assert_eq!(transport.read_line().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(transport.read_line().await.unwrap().unwrap(), "");
        assert_eq!(transport.read_line().await.unwrap().unwrap(), "{\"b\":2}");
        assert!(transport.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_exact_frame() {
        let writer = tokio_test::io::Builder::new()
            .write(br#"{"jsonrpc":"2.0","id":7,"result":{}}"#)
            .write(b"\n")
            .build();
        let mut transport = LineTransport::new(tokio::io::empty(), writer);

        let response = JsonRpcResponse::success(RequestId::Number(7), serde_json::json!({}));
        transport.send(&response.into()).await.unwrap();
    }

    #[tokio::test]
    async fn writes_one_line_per_message() {
        let (client, server) = tokio::io::duplex(4096);
        let (_server_read, server_write) = tokio::io::split(server);
        let mut transport = LineTransport::new(tokio::io::empty(), server_write);

        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({ "text": "line one\nline two" }),
        );
        transport.send(&response.into()).await.unwrap();
        drop(transport);

        let mut reader = BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains(r"line one\nline two"));
    }
}
