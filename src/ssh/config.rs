// SSH 连接配置

use std::path::PathBuf;
use std::time::Duration;

use crate::models::ConnectionConfig;

/// SSH 连接配置
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// 目标主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 心跳配置
    pub keepalive: KeepaliveConfig,
}

/// 认证方式
#[derive(Clone, Debug)]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥密码（如果有）
        passphrase: Option<String>,
    },
}

/// 心跳配置
#[derive(Clone, Debug)]
pub struct KeepaliveConfig {
    /// 是否启用心跳
    pub enabled: bool,
    /// 心跳间隔（秒）
    pub interval: u64,
    /// 最大重试次数
    pub max_retries: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 60,
            max_retries: 3,
        }
    }
}

impl From<&ConnectionConfig> for SshConfig {
    fn from(config: &ConnectionConfig) -> Self {
        let auth = match &config.private_key {
            Some(key_path) => AuthMethod::PublicKey {
                key_path: key_path.clone(),
                passphrase: config.passphrase.clone(),
            },
            None => AuthMethod::Password(config.password.clone()),
        };

        let keepalive = match config.keepalive_interval {
            Some(0) => KeepaliveConfig {
                enabled: false,
                ..Default::default()
            },
            Some(interval) => KeepaliveConfig {
                interval,
                ..Default::default()
            },
            None => KeepaliveConfig::default(),
        };

        Self {
            host: config.host.clone(),
            port: config.effective_port(),
            username: config.user.clone(),
            auth,
            connect_timeout: config.connect_timeout,
            keepalive,
        }
    }
}

/// russh 客户端配置构建
impl SshConfig {
    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // 心跳开启时不设置不活动超时，避免空闲的 SFTP 会话被断开
        if self.keepalive.enabled {
            config.keepalive_interval = Some(Duration::from_secs(self.keepalive.interval));
            config.keepalive_max = self.keepalive.max_retries as usize;
        } else {
            config.inactivity_timeout = Some(Duration::from_secs(self.connect_timeout));
        }
        config
    }
}
