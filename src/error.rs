// 传输错误类型定义

use thiserror::Error;

use crate::constants::not_found;
use crate::ssh::SshError;

/// 统一客户端错误类型
#[derive(Debug, Error)]
pub enum TransferError {
    /// 不支持的协议
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 本地 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 建立连接失败
    #[error("Connection error: {0}")]
    Connection(String),

    /// 操作超时
    #[error("Operation timeout after {0}s")]
    Timeout(u64),

    /// FTP 服务器返回错误（code 为应答码）
    #[error("FTP error{}: {message}", code_suffix(.code))]
    Ftp { code: Option<u32>, message: String },

    /// SFTP 服务器返回错误（code 为 SSH_FX_* 状态码）
    #[error("SFTP error{}: {message}", code_suffix(.code))]
    Sftp { code: Option<u32>, message: String },

    /// SSH 层错误
    #[error(transparent)]
    Ssh(#[from] SshError),

    /// 连接已关闭
    #[error("Client disconnected: {0}")]
    Disconnected(String),

    /// 后台任务失败
    #[error("Task failed: {0}")]
    Task(String),
}

fn code_suffix(code: &Option<u32>) -> String {
    match code {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

impl TransferError {
    /// 构造 FTP 错误
    pub fn ftp(code: Option<u32>, message: impl Into<String>) -> Self {
        TransferError::Ftp {
            code,
            message: message.into(),
        }
    }

    /// 构造 SFTP 错误
    pub fn sftp(code: Option<u32>, message: impl Into<String>) -> Self {
        TransferError::Sftp {
            code,
            message: message.into(),
        }
    }

    /// 是否是协议层的"不存在"信号
    pub fn is_not_found(&self) -> bool {
        match self {
            TransferError::Ftp { code, .. } => *code == Some(not_found::FTP_FILE_UNAVAILABLE),
            TransferError::Sftp { code, .. } => *code == Some(not_found::SFTP_NO_SUCH_FILE),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for TransferError {
    fn from(e: tokio::task::JoinError) -> Self {
        TransferError::Task(e.to_string())
    }
}
