// 连接配置数据结构

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{ports, DEFAULT_CONNECT_TIMEOUT};
use crate::error::TransferError;

/// 传输协议
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Protocol {
    #[default]
    Ftp,
    /// 隐式 TLS 的 FTP
    Ftps,
    Sftp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ftp => "ftp",
            Protocol::Ftps => "ftps",
            Protocol::Sftp => "sftp",
        }
    }

    /// 协议默认端口
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Ftp | Protocol::Ftps => ports::FTP,
            Protocol::Sftp => ports::SFTP,
        }
    }

    /// 是否属于 FTP 家族
    pub fn is_ftp_family(&self) -> bool {
        matches!(self, Protocol::Ftp | Protocol::Ftps)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ftp" => Ok(Protocol::Ftp),
            "ftps" => Ok(Protocol::Ftps),
            "sftp" => Ok(Protocol::Sftp),
            _ => Err(TransferError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = TransferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        protocol.as_str().to_string()
    }
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT
}

/// 连接配置
/// 客户端构造后不再修改
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// 协议，缺省为 ftp
    #[serde(default)]
    pub protocol: Protocol,
    /// 目标主机
    pub host: String,
    /// 用户名
    pub user: String,
    /// 密码
    #[serde(default)]
    pub password: String,
    /// 端口，缺省时使用协议默认端口
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// SFTP 私钥路径（设置后使用公钥认证）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<PathBuf>,
    /// 私钥密码
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// 连接超时（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// 单个操作超时（秒），不设置则不限时
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout: Option<u64>,
    /// SSH 心跳间隔（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_interval: Option<u64>,
}

impl ConnectionConfig {
    /// 使用密码认证创建配置
    pub fn new(
        protocol: Protocol,
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            host: host.into(),
            user: user.into(),
            password: password.into(),
            port: None,
            private_key: None,
            passphrase: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            operation_timeout: None,
            keepalive_interval: None,
        }
    }

    /// 指定端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// 指定单个操作超时
    pub fn with_operation_timeout(mut self, secs: u64) -> Self {
        self.operation_timeout = Some(secs);
        self
    }

    /// 实际使用的端口
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// 用于日志的连接标识
    pub fn display_target(&self) -> String {
        format!(
            "{}://{}@{}:{}",
            self.protocol,
            self.user,
            self.host,
            self.effective_port()
        )
    }

    /// 基础校验
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.host.trim().is_empty() {
            return Err(TransferError::Config("host must not be empty".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(TransferError::Config("user must not be empty".to_string()));
        }
        if self.connect_timeout == 0 {
            return Err(TransferError::Config(
                "connect_timeout must be greater than zero".to_string(),
            ));
        }
        if self.operation_timeout == Some(0) {
            return Err(TransferError::Config(
                "operation_timeout must be greater than zero".to_string(),
            ));
        }
        if self.private_key.is_some() && self.protocol.is_ftp_family() {
            return Err(TransferError::Config(format!(
                "private_key is only supported for sftp, not {}",
                self.protocol
            )));
        }
        Ok(())
    }
}

// 密码不出现在日志中
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("private_key", &self.private_key)
            .field("connect_timeout", &self.connect_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("keepalive_interval", &self.keepalive_interval)
            .finish()
    }
}
