// 已认证的 SSH 会话
// 只承载一个 SFTP 子系统通道，关闭时主动断开

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::SftpSession;
use tracing::{debug, info};

use super::error::SshError;
use super::handler::SshClientHandler;

pub struct SshSession {
    handle: Arc<Handle<SshClientHandler>>,
    /// 日志用标识 user@host
    label: String,
    /// 是否已主动断开
    closed: AtomicBool,
}

impl SshSession {
    pub fn new(handle: Arc<Handle<SshClientHandler>>, host: String, username: String) -> Self {
        Self {
            handle,
            label: format!("{}@{}", username, host),
            closed: AtomicBool::new(false),
        }
    }

    /// 未主动断开且底层连接仍在
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.handle.is_closed()
    }

    /// 打开会话通道并请求 sftp 子系统
    pub async fn open_sftp(&self) -> Result<SftpSession, SshError> {
        if !self.is_alive() {
            return Err(SshError::Closed(self.label.clone()));
        }

        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;

        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SshError::Subsystem(e.to_string()))?;

        debug!("[SSH] SFTP subsystem opened for {}", self.label);
        Ok(sftp)
    }

    /// 断开连接，重复调用直接返回
    pub async fn close(&self) -> Result<(), SshError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("[SSH] Disconnecting {}", self.label);
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
