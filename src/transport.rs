//! TCP adapter: one JSON document per line.
//!
//! A connection opens with a `hello` carrying the access key. A creation
//! key starts a session and every following line is a client message for
//! it; a deletion key is answered with a single refusal (or
//! `account_deleted`) and the connection closes.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::access::AccessRequest;
use crate::context::ServerContext;
use crate::error::Result;
use crate::protocol::{ClientMessage, RefusalCode, ServerMessage};
use crate::session::{spawn_session, ChannelConnection, Outbound};

/// Bind the configured address.
pub async fn bind(ctx: &ServerContext) -> Result<TcpListener> {
    let listener = TcpListener::bind(&ctx.config.bind).await?;
    Ok(listener)
}

/// Accept connections forever.
///
/// Connections beyond `max_connections` are closed right after accept.
pub async fn serve(ctx: Arc<ServerContext>, listener: TcpListener) -> Result<()> {
    let local = listener.local_addr()?;
    info!(bind = %local, server = %ctx.config.symbolic_name, "Listening");
    let limit = Arc::new(Semaphore::new(ctx.config.max_connections));

    loop {
        let (stream, peer) = listener.accept().await?;
        let Ok(permit) = Arc::clone(&limit).try_acquire_owned() else {
            warn!(peer = %peer, "Connection limit reached, closing");
            drop(stream);
            continue;
        };

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(ctx, stream, peer).await {
                debug!(peer = %peer, err = %e, "Connection ended with error");
            }
            drop(permit);
        });
    }
}

async fn handle_connection(
    ctx: Arc<ServerContext>,
    stream: TcpStream,
    peer: SocketAddr,
) -> anyhow::Result<()> {
    let (rd, mut wr) = stream.into_split();
    let mut lines = BufReader::new(rd).lines();

    let Some(first) = lines.next_line().await? else {
        return Ok(());
    };
    let key = match serde_json::from_str::<ClientMessage>(&first) {
        Ok(ClientMessage::Hello { key }) => key,
        _ => {
            warn!(peer = %peer, "Connection did not start with hello");
            return refuse(&mut wr, RefusalCode::BadRequest).await;
        }
    };

    match ctx.access.classify(&key) {
        AccessRequest::Create => {}
        AccessRequest::Delete { login, password } => {
            let gateway_ctx = Arc::clone(&ctx);
            let code = tokio::task::spawn_blocking(move || {
                gateway_ctx
                    .access
                    .delete_account(&gateway_ctx.gateway, &login, &password)
            })
            .await?;
            return refuse(&mut wr, code).await;
        }
        AccessRequest::Malformed => return refuse(&mut wr, RefusalCode::BadRequest).await,
        AccessRequest::WrongKey => {
            warn!(peer = %peer, "Wrong access key");
            return refuse(&mut wr, RefusalCode::WrongKey).await;
        }
    }

    info!(peer = %peer, "Creation session opened");
    let (tx, mut outbound) = mpsc::unbounded_channel();
    let mut session = spawn_session(Arc::clone(&ctx), ChannelConnection::new(tx.clone()));

    let writer = tokio::spawn(async move {
        while let Some(item) = outbound.recv().await {
            match item {
                Outbound::Message(message) => {
                    if write_message(&mut wr, &message).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }
        let _ = wr.shutdown().await;
    });

    let state = loop {
        tokio::select! {
            state = session.wait() => break state,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        session.connection_closed();
                        break session.wait().await;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(&line) {
                    Ok(message) => {
                        session.send(message);
                    }
                    Err(e) => {
                        debug!(peer = %peer, "Unreadable client message: {}", e);
                        session.unreadable();
                    }
                }
            }
        }
    };

    drop(tx);
    let _ = writer.await;
    info!(peer = %peer, state = %state, "Creation session ended");
    Ok(())
}

async fn refuse(wr: &mut OwnedWriteHalf, code: RefusalCode) -> anyhow::Result<()> {
    write_message(wr, &ServerMessage::refused(code)).await?;
    wr.shutdown().await?;
    Ok(())
}

async fn write_message(wr: &mut OwnedWriteHalf, message: &ServerMessage) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    wr.write_all(&line).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use serde_json::Value;
    use tokio::io::Lines;
    use tokio::net::tcp::OwnedReadHalf;

    async fn start_server() -> (Arc<ServerContext>, SocketAddr) {
        let config = ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            ..Default::default()
        };
        let ctx = Arc::new(ServerContext::from_config(config).unwrap());
        let listener = bind(&ctx).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(Arc::clone(&ctx), listener));
        (ctx, addr)
    }

    async fn connect(addr: SocketAddr) -> (Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (rd, wr) = stream.into_split();
        (BufReader::new(rd).lines(), wr)
    }

    async fn send(wr: &mut OwnedWriteHalf, json: &str) {
        wr.write_all(format!("{}\n", json).as_bytes()).await.unwrap();
    }

    async fn recv(lines: &mut Lines<BufReader<OwnedReadHalf>>) -> Value {
        let line = lines.next_line().await.unwrap().expect("server closed early");
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn wrong_key_is_refused() {
        let (_ctx, addr) = start_server().await;
        let (mut lines, mut wr) = connect(addr).await;

        send(&mut wr, r#"{"type":"hello","key":"let me in"}"#).await;
        let reply = recv(&mut lines).await;
        assert_eq!(reply["type"], "refused");
        assert_eq!(reply["code"], "wrong_key");
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_line_must_be_hello() {
        let (_ctx, addr) = start_server().await;
        let (mut lines, mut wr) = connect(addr).await;

        send(&mut wr, r#"{"type":"start"}"#).await;
        assert_eq!(recv(&mut lines).await["code"], "bad_request");
    }

    #[tokio::test]
    async fn creation_session_walks_and_cancels() {
        let (_ctx, addr) = start_server().await;
        let (mut lines, mut wr) = connect(addr).await;

        send(&mut wr, r#"{"type":"hello","key":"AccountServerPlease!"}"#).await;
        send(&mut wr, r#"{"type":"start"}"#).await;
        let welcome = recv(&mut lines).await;
        assert_eq!(welcome["type"], "step");
        assert_eq!(welcome["step_id"], "welcome");
        assert!(welcome["properties"]["init.text"]
            .as_str()
            .unwrap()
            .contains("account-forge"));

        send(&mut wr, "not json").await;
        assert_eq!(recv(&mut lines).await["type"], "step_error");

        send(&mut wr, r#"{"type":"step_result","properties":{}}"#).await;
        assert_eq!(recv(&mut lines).await["step_id"], "login");

        send(&mut wr, r#"{"type":"cancel"}"#).await;
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replies_keep_the_order_of_requests() {
        let (_ctx, addr) = start_server().await;
        let (mut lines, mut wr) = connect(addr).await;

        send(&mut wr, r#"{"type":"hello","key":"AccountServerPlease!"}"#).await;
        wr.write_all(b"{\"type\":\"start\"}\n{not json\n{\"type\":\"cancel\"}\n")
            .await
            .unwrap();

        assert_eq!(recv(&mut lines).await["type"], "step");
        assert_eq!(recv(&mut lines).await["type"], "step_error");
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deletion_key_for_unknown_account() {
        let (_ctx, addr) = start_server().await;
        let (mut lines, mut wr) = connect(addr).await;

        send(&mut wr, r#"{"type":"hello","key":"deleteAccount:nobody:pw"}"#).await;
        assert_eq!(recv(&mut lines).await["code"], "unknown_account");
    }
}
