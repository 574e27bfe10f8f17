use wyrmgate::prelude::*;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

const OP_LOGIN: u8 = 1;
const OP_SELECT_CHAR: u8 = 2;
const OP_CHAT: u8 = 3;
const OP_LOGOUT: u8 = 4;

const OP_LOGIN_OK: u8 = 101;
const OP_CHAR_OK: u8 = 102;
const OP_CHAT_ECHO: u8 = 103;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Tiny login / character / chat protocol on top of the gateway.
///
/// Every packet starts with a one-byte opcode. Strings are `u16`-length
/// prefixed, integers little-endian.
struct EchoDispatcher;

impl Dispatcher<TcpConnection> for EchoDispatcher {
    async fn handle(
        &self,
        session: &Arc<ClientSession<TcpConnection>>,
        payload: Bytes,
    ) -> Result<(), DispatchError> {
        let mut packet = PacketReader::new(payload);
        let mut reply = PacketWriter::new();

        match packet.read_u8()? {
            OP_LOGIN => {
                let account = packet.read_string()?;
                session
                    .set_account_name(account.clone())
                    .map_err(|e| DispatchError::Rejected(e.to_string()))?;
                tracing::info!(session = %session, %account, "logged in");
                reply.write_u8(OP_LOGIN_OK).write_string(&account)?;
            }
            OP_SELECT_CHAR => {
                let actor = ActorId(packet.read_i64()? as u64);
                session
                    .set_active_char(actor)
                    .map_err(|e| DispatchError::Rejected(e.to_string()))?;
                reply.write_u8(OP_CHAR_OK).write_i64(actor.0 as i64);
            }
            OP_CHAT => {
                let text = packet.read_string()?;
                let from = session.account_name().unwrap_or_else(|| "anonymous".into());
                reply
                    .write_u8(OP_CHAT_ECHO)
                    .write_string(&from)?
                    .write_string(&text)?;
            }
            OP_LOGOUT => return Err(DispatchError::Close("logout".into())),
            other => {
                return Err(DispatchError::Rejected(format!("unknown opcode {other}")));
            }
        }

        session.send(&reply).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .compact()
        .init();

    // Usage: echo-server [path/to/wyrmgate.toml]
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let secret = std::env::var("WYRMGATE_SECRET").unwrap_or_else(|_| "change me".to_string());

    let server = WyrmgateServerBuilder::from_config(config)
        .build(EchoDispatcher, StaticKeys::from_secret(secret.as_bytes())?)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "echo server listening");

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            shutdown.shutdown();
        }
    });

    server.run().await?;
    Ok(())
}
