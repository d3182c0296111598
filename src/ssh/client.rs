// SSH 客户端
// 解析地址 -> TCP 连接 -> 握手 -> 认证，每一步都受 connect_timeout 约束

use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{AuthResult, Handle};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::config::{AuthMethod, SshConfig};
use super::error::{ConnectStage, SshError};
use super::handler::SshClientHandler;
use super::session::SshSession;

pub struct SshClient {
    config: SshConfig,
}

impl SshClient {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// 建立已认证的 SSH 会话
    pub async fn connect(&self) -> Result<SshSession, SshError> {
        let cfg = &self.config;
        info!("[SSH] Connecting to {}@{}:{}", cfg.username, cfg.host, cfg.port);

        let stream = self.open_tcp().await?;

        let handler = SshClientHandler::new(cfg.host.clone(), cfg.port);
        let mut handle = self
            .staged(
                ConnectStage::Handshake,
                russh::client::connect_stream(Arc::new(cfg.to_russh_config()), stream, handler),
            )
            .await??;
        debug!("[SSH] Handshake with {} completed", cfg.host);

        self.authenticate(&mut handle).await?;
        info!("[SSH] Authenticated as '{}' on {}", cfg.username, cfg.host);

        Ok(SshSession::new(
            Arc::new(handle),
            cfg.host.clone(),
            cfg.username.clone(),
        ))
    }

    /// 为一个阶段加上超时
    async fn staged<T>(
        &self,
        stage: ConnectStage,
        fut: impl Future<Output = T>,
    ) -> Result<T, SshError> {
        let secs = self.config.connect_timeout;
        tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .map_err(|_| SshError::Timeout { stage, secs })
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>, SshError> {
        let host = &self.config.host;
        let addrs: Vec<SocketAddr> = (host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| SshError::Resolve {
                host: host.clone(),
                reason: e.to_string(),
            })?
            .collect();
        if addrs.is_empty() {
            return Err(SshError::Resolve {
                host: host.clone(),
                reason: "no addresses".to_string(),
            });
        }
        Ok(addrs)
    }

    /// 依次尝试解析出的地址，返回第一个连通的
    async fn open_tcp(&self) -> Result<TcpStream, SshError> {
        let mut last_err = None;
        for addr in self.resolve()? {
            match self.staged(ConnectStage::Tcp, TcpStream::connect(addr)).await? {
                Ok(stream) => {
                    debug!("[SSH] TCP connection established to {}", addr);
                    return Ok(stream);
                }
                Err(e) => {
                    warn!("[SSH] TCP connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.map(SshError::Io).unwrap_or_else(|| SshError::Resolve {
            host: self.config.host.clone(),
            reason: "no reachable address".to_string(),
        }))
    }

    async fn authenticate(&self, handle: &mut Handle<SshClientHandler>) -> Result<(), SshError> {
        let user = &self.config.username;

        let (method, outcome) = match &self.config.auth {
            AuthMethod::Password(password) => {
                debug!("[SSH] Trying password authentication");
                ("Password", handle.authenticate_password(user, password).await?)
            }
            AuthMethod::PublicKey {
                key_path,
                passphrase,
            } => {
                debug!("[SSH] Trying public key authentication with {:?}", key_path);
                let key = load_private_key(key_path, passphrase.as_deref()).await?;
                let key = PrivateKeyWithHashAlg::new(Arc::new(key), None);
                ("Public key", handle.authenticate_publickey(user, key).await?)
            }
        };

        match outcome {
            AuthResult::Success => Ok(()),
            AuthResult::Failure {
                remaining_methods, ..
            } => Err(SshError::AuthRejected {
                method,
                user: user.clone(),
                allowed: format!("{:?}", remaining_methods),
            }),
        }
    }
}

async fn load_private_key(path: &Path, passphrase: Option<&str>) -> Result<PrivateKey, SshError> {
    let key_error = |reason: String| SshError::Key {
        path: path.to_path_buf(),
        reason,
    };
    let pem = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| key_error(e.to_string()))?;
    russh::keys::decode_secret_key(&pem, passphrase).map_err(|e| key_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionConfig, Protocol};

    #[tokio::test]
    async fn test_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_ed25519");

        let err = load_private_key(&path, None).await.unwrap_err();
        assert!(matches!(err, SshError::Key { path: p, .. } if p == path));
    }

    #[tokio::test]
    async fn test_garbage_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_rsa");
        std::fs::write(&path, "not a key").unwrap();

        let err = load_private_key(&path, None).await.unwrap_err();
        assert!(matches!(err, SshError::Key { .. }));
    }

    #[test]
    fn test_resolve_literal_address() {
        let config = ConnectionConfig::new(Protocol::Sftp, "127.0.0.1", "u", "p").with_port(2222);
        let client = SshClient::new(SshConfig::from(&config));
        let addrs = client.resolve().unwrap();
        assert_eq!(addrs, vec!["127.0.0.1:2222".parse::<SocketAddr>().unwrap()]);
    }
}
