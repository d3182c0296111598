// SSH 客户端 Handler 实现
// 实现 russh::client::Handler trait

use russh::client::DisconnectReason;
use russh::keys::PublicKey;
use std::future::Future;
use tracing::{debug, error, info};

/// SSH 客户端 Handler
/// 处理 SSH 连接过程中的各种回调
pub struct SshClientHandler {
    /// 服务器主机名（用于日志）
    host: String,
    /// 服务器端口（用于日志）
    port: u16,
}

impl SshClientHandler {
    /// 创建新的 Handler
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

impl russh::client::Handler for SshClientHandler {
    type Error = russh::Error;

    /// 检查服务器公钥
    /// 记录指纹后接受
    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key.fingerprint(russh::keys::ssh_key::HashAlg::Sha256);

        info!(
            "[SSH] {}:{} server key fingerprint: {}",
            self.host, self.port, fingerprint
        );
        debug!(
            "[SSH] {}:{} server key type: {}",
            self.host,
            self.port,
            server_public_key.algorithm()
        );

        async { Ok(true) }
    }

    /// 连接断开观察者
    /// 连接建立后的异步错误只记录日志，不向调用方抛出
    fn disconnected(
        &mut self,
        reason: DisconnectReason<Self::Error>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        match &reason {
            DisconnectReason::ReceivedDisconnect(_) => {
                info!("[SSH] {}:{} closed by server", self.host, self.port);
            }
            DisconnectReason::Error(e) => {
                error!("[SSH] {}:{} connection error: {}", self.host, self.port, e);
            }
        }
        async { Ok(()) }
    }
}
