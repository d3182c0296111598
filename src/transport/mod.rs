// 传输层
//
// 把两种协议的原生调用形态归一成同一个异步能力接口:
// - ftp: FTP 家族（阻塞调用，放到 tokio 阻塞线程池执行）
// - sftp: SFTP（原生异步调用）
// - deadline: 为任意传输加上操作超时

pub mod deadline;
pub mod ftp;
#[cfg(test)]
pub(crate) mod memory;
pub mod sftp;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tracing::info;

use crate::error::TransferError;
use crate::models::{ConnectionConfig, Protocol, RemoteEntry};
use crate::services::ftp::FtpService;
use crate::services::sftp::SftpService;

pub use deadline::DeadlineTransport;
pub use ftp::{FtpControl, FtpTransport, RetrieveSink};
pub use sftp::{SftpApi, SftpDirEntry, SftpTransport};

/// get 返回的远程文件字节流
pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;

/// 统一的传输能力接口
#[async_trait]
pub trait Transport: Send + Sync {
    /// 列出目录内容（顺序由服务器决定）
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError>;

    /// 读取远程文件
    async fn get(&self, path: &str) -> Result<RemoteReader, TransferError>;

    /// 上传本地文件
    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), TransferError>;

    /// 删除远程文件
    async fn delete(&self, path: &str) -> Result<(), TransferError>;

    /// 创建目录（总是递归创建中间目录）
    async fn mkdir(&self, path: &str) -> Result<(), TransferError>;

    /// 检查路径是否存在，协议的"不存在"信号转为 false
    async fn exists(&self, path: &str) -> Result<bool, TransferError>;

    /// 关闭连接
    async fn end(&self) -> Result<(), TransferError>;
}

/// 根据协议建立连接并返回归一化的传输
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn Transport>, TransferError> {
    config.validate()?;
    info!("[Transport] Get client for {}", config.display_target());

    let transport: Box<dyn Transport> = match config.protocol {
        Protocol::Ftp | Protocol::Ftps => {
            let service = FtpService::connect(config).await?;
            Box::new(FtpTransport::new(service))
        }
        Protocol::Sftp => {
            let service = SftpService::connect(config).await?;
            Box::new(SftpTransport::new(service))
        }
    };

    Ok(match config.operation_timeout {
        Some(secs) => Box::new(DeadlineTransport::new(transport, Duration::from_secs(secs))),
        None => transport,
    })
}
