// SFTP 服务 - 封装 russh-sftp 客户端

use std::path::Path;

use async_trait::async_trait;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::TransferError;
use crate::models::path::basename;
use crate::models::ConnectionConfig;
use crate::ssh::{SshClient, SshConfig, SshSession};
use crate::transport::{RemoteReader, SftpApi, SftpDirEntry};

/// 把 russh-sftp 错误转换为带状态码的 TransferError
fn map_sftp_error(context: &str, e: SftpError) -> TransferError {
    match e {
        SftpError::Status(status) => TransferError::sftp(
            Some(status.status_code as u32),
            format!("{}: {}", context, status.error_message),
        ),
        other => TransferError::sftp(None, format!("{}: {}", context, other)),
    }
}

/// SFTP 服务
/// 持有 SSH 会话和其上的 SFTP 子系统
pub struct SftpService {
    /// 连接标识（用于日志）
    target: String,
    /// SSH 会话
    ssh: SshSession,
    /// russh-sftp 客户端会话
    sftp: SftpSession,
}

impl SftpService {
    /// 建立 SSH 连接并打开 SFTP 子系统
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, TransferError> {
        let target = config.display_target();
        info!("[SFTP] Creating SFTP service for {}", target);

        let ssh = SshClient::new(SshConfig::from(config)).connect().await?;
        let sftp = ssh.open_sftp().await?;

        info!("[SFTP] SFTP service created for {}", target);
        Ok(Self { target, ssh, sftp })
    }
}

#[async_trait]
impl SftpApi for SftpService {
    async fn read_dir(&self, path: &str) -> Result<Vec<SftpDirEntry>, TransferError> {
        let dir = self
            .sftp
            .read_dir(path)
            .await
            .map_err(|e| map_sftp_error(&format!("Failed to read directory {}", path), e))?;

        Ok(dir
            .map(|entry| {
                let attrs = entry.metadata();
                SftpDirEntry {
                    name: entry.file_name(),
                    is_dir: attrs.is_dir(),
                    size: attrs.size.unwrap_or(0),
                }
            })
            .collect())
    }

    async fn open(&self, path: &str) -> Result<RemoteReader, TransferError> {
        let file = self
            .sftp
            .open(path)
            .await
            .map_err(|e| map_sftp_error(&format!("Failed to open file {}", path), e))?;

        debug!("[SFTP] Opened {} for reading", path);
        Ok(Box::new(file))
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64, TransferError> {
        let mut local = tokio::fs::File::open(local_path).await?;
        let mut remote = self
            .sftp
            .create(remote_path)
            .await
            .map_err(|e| map_sftp_error(&format!("Failed to create file {}", remote_path), e))?;

        let bytes = tokio::io::copy(&mut local, &mut remote).await?;
        remote.shutdown().await?;
        Ok(bytes)
    }

    async fn remove_file(&self, path: &str) -> Result<(), TransferError> {
        self.sftp
            .remove_file(path)
            .await
            .map_err(|e| map_sftp_error(&format!("Failed to remove file {}", path), e))
    }

    async fn create_dir(&self, path: &str) -> Result<(), TransferError> {
        self.sftp
            .create_dir(path)
            .await
            .map_err(|e| map_sftp_error(&format!("Failed to create directory {}", path), e))
    }

    async fn stat(&self, path: &str) -> Result<SftpDirEntry, TransferError> {
        let attrs = self
            .sftp
            .metadata(path)
            .await
            .map_err(|e| map_sftp_error(&format!("Failed to stat {}", path), e))?;

        Ok(SftpDirEntry {
            name: basename(path).to_string(),
            is_dir: attrs.is_dir(),
            size: attrs.size.unwrap_or(0),
        })
    }

    async fn close(&self) -> Result<(), TransferError> {
        info!("[SFTP] Closing SFTP service for {}", self.target);
        let closed = self
            .sftp
            .close()
            .await
            .map_err(|e| map_sftp_error("Failed to close SFTP session", e));
        self.ssh.close().await?;
        closed
    }
}

impl Drop for SftpService {
    fn drop(&mut self) {
        debug!("[SFTP] Dropping SFTP service for {}", self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use russh_sftp::protocol::{Status, StatusCode};

    fn status(code: StatusCode, message: &str) -> SftpError {
        SftpError::Status(Status {
            id: 7,
            status_code: code,
            error_message: message.to_string(),
            language_tag: "en".to_string(),
        })
    }

    #[test]
    fn test_no_such_file_status_is_not_found() {
        let err = map_sftp_error("Failed to stat /gone", status(StatusCode::NoSuchFile, "No such file"));
        assert!(err.is_not_found());
        assert!(matches!(err, TransferError::Sftp { code: Some(2), .. }));
        assert!(err.to_string().contains("/gone"));
    }

    #[test]
    fn test_other_status_is_propagated() {
        let err = map_sftp_error(
            "Failed to stat /root",
            status(StatusCode::PermissionDenied, "Permission denied"),
        );
        assert!(!err.is_not_found());
        assert!(matches!(err, TransferError::Sftp { code: Some(3), .. }));
    }

    #[test]
    fn test_non_status_error_has_no_code() {
        let err = map_sftp_error("Failed to open file /a", SftpError::UnexpectedBehavior("eof".into()));
        assert!(!err.is_not_found());
        assert!(matches!(err, TransferError::Sftp { code: None, .. }));
    }
}
