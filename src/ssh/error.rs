// SSH 层错误
// 按连接阶段区分，方便定位失败发生在哪一步

use std::path::PathBuf;

use thiserror::Error;

/// 连接建立的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// TCP 连接
    Tcp,
    /// SSH 握手
    Handshake,
}

impl std::fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectStage::Tcp => write!(f, "TCP connect"),
            ConnectStage::Handshake => write!(f, "SSH handshake"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SshError {
    /// 主机名无法解析
    #[error("Failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 某个阶段超时
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: ConnectStage, secs: u64 },

    #[error("SSH protocol error: {0}")]
    Protocol(String),

    /// 服务器拒绝认证
    #[error("{method} authentication rejected for '{user}' (server allows: {allowed})")]
    AuthRejected {
        method: &'static str,
        user: String,
        allowed: String,
    },

    /// 私钥读取或解码失败
    #[error("Private key {path:?}: {reason}")]
    Key { path: PathBuf, reason: String },

    /// SFTP 子系统打开失败
    #[error("SFTP subsystem unavailable: {0}")]
    Subsystem(String),

    #[error("Session to {0} is closed")]
    Closed(String),
}

impl From<russh::Error> for SshError {
    fn from(e: russh::Error) -> Self {
        SshError::Protocol(e.to_string())
    }
}
