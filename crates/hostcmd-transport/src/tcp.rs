//! TCP transport for host command lines

use std::net::SocketAddr;

use hostcmd_core::Registry;
use hostcmd_protocol::ParserConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::error::TransportError;
use crate::handler::{ConnectionHandler, Dispatch};

/// TCP server feeding one host at a time into a parser
pub struct TcpServer<D> {
    registry: Registry,
    config: ParserConfig,
    addr: SocketAddr,
    dispatcher: D,
    client_counter: u64,
}

impl<D: Dispatch> TcpServer<D> {
    pub fn new(registry: Registry, config: ParserConfig, addr: SocketAddr, dispatcher: D) -> Self {
        Self {
            registry,
            config,
            addr,
            dispatcher,
            client_counter: 0,
        }
    }

    /// Bind the configured address and serve forever
    pub async fn run(&mut self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: self.addr,
                source,
            })?;
        info!(addr = %self.addr, "Host command server listening");

        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    ///
    /// Hosts are handled one after another; a new connection waits until the
    /// current one closes.
    pub async fn serve(&mut self, listener: TcpListener) -> Result<(), TransportError> {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    self.client_counter += 1;
                    let client_id = format!("tcp:{}:{}", peer_addr, self.client_counter);

                    if let Err(e) = self.handle_connection(stream, &client_id).await {
                        error!(client = %client_id, error = %e, "Connection error");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(
        &mut self,
        mut stream: TcpStream,
        client_id: &str,
    ) -> Result<(), TransportError> {
        info!(client = %client_id, "Host connected");

        // every connection starts from a clean line
        let mut handler = ConnectionHandler::new(
            client_id.to_owned(),
            self.registry.clone(),
            self.config.clone(),
            &mut self.dispatcher,
        );
        let mut buf = vec![0u8; 4096];

        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                info!(client = %client_id, "Host disconnected");
                break;
            }

            let out = handler.process(&buf[..n]);
            if !out.is_empty() {
                debug!(client = %client_id, bytes = out.len(), "Sending replies");
                stream.write_all(&out).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Acknowledge;
    use tokio::io::{AsyncBufReadExt, BufReader};

    async fn read_line<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> String {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_string()
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let mut registry = Registry::new(64);
        registry.define_with("LED", "d b").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut server = TcpServer::new(registry, ParserConfig::default(), addr, Acknowledge);
        let task = tokio::spawn(async move { server.serve(listener).await });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"LED 2 ").await.unwrap();
        client.write_all(b"on\r\nXYZ\r\n").await.unwrap();

        let body = r#"{"command":"LED","args":[2,true]}"#;
        let mut reader = BufReader::new(&mut client);
        assert_eq!(read_line(&mut reader).await, format!("${}", body.len()));
        assert_eq!(read_line(&mut reader).await, body);
        assert_eq!(
            read_line(&mut reader).await,
            "-ERR UNKNOWN_COMMAND unknown command"
        );
        drop(reader);
        drop(client);

        // next host starts from a fresh parser
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"led 1 0\n").await.unwrap();

        let body = r#"{"command":"LED","args":[1,false]}"#;
        let mut reader = BufReader::new(&mut client);
        assert_eq!(read_line(&mut reader).await, format!("${}", body.len()));
        assert_eq!(read_line(&mut reader).await, body);

        task.abort();
    }
}
