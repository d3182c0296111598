// 统一客户端
//
// - mod: UnifiedClient 单文件操作与生命周期
// - batch: 批量下载、上传与递归列表

mod batch;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::error::TransferError;
use crate::models::{ConnectionConfig, Protocol, RemoteEntry};
use crate::transport::{self, RemoteReader, Transport};

/// 客户端生命周期状态
/// Connecting 只存在于 connect 内部，连接失败时不会产生客户端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Ready,
    Ended,
}

/// 统一的 FTP / FTPS / SFTP 客户端
/// 独占一个已连接的传输，直到 end
pub struct UnifiedClient {
    /// 连接配置
    config: ConnectionConfig,
    /// 已连接的传输
    transport: Box<dyn Transport>,
    /// 是否已结束
    ended: AtomicBool,
}

impl UnifiedClient {
    /// 按配置选择传输并建立连接
    pub async fn connect(config: ConnectionConfig) -> Result<Self, TransferError> {
        let transport = transport::connect(&config).await?;
        info!("[Client] Connected to {}", config.display_target());
        Ok(Self::from_transport(config, transport))
    }

    /// 使用已连接的传输构造客户端
    pub fn from_transport(config: ConnectionConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            ended: AtomicBool::new(false),
        }
    }

    /// 连接配置
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// 协议
    pub fn protocol(&self) -> Protocol {
        self.config.protocol
    }

    /// 当前状态
    pub fn state(&self) -> ClientState {
        if self.ended.load(Ordering::Acquire) {
            ClientState::Ended
        } else {
            ClientState::Ready
        }
    }

    fn transport(&self) -> Result<&dyn Transport, TransferError> {
        match self.state() {
            ClientState::Ready => Ok(self.transport.as_ref()),
            ClientState::Ended => Err(TransferError::Disconnected(format!(
                "client for {} has been ended",
                self.config.display_target()
            ))),
        }
    }

    /// 列出目录
    pub async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        self.transport()?.list(path).await
    }

    /// 读取远程文件，总是返回字节流
    pub async fn get(&self, path: &str) -> Result<RemoteReader, TransferError> {
        self.transport()?.get(path).await
    }

    /// 上传本地文件
    pub async fn put(
        &self,
        local_path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<(), TransferError> {
        self.transport()?.put(local_path.as_ref(), remote_path).await
    }

    /// 删除远程文件
    pub async fn delete(&self, path: &str) -> Result<(), TransferError> {
        self.transport()?.delete(path).await
    }

    /// 递归创建目录
    pub async fn mkdir(&self, path: &str) -> Result<(), TransferError> {
        self.transport()?.mkdir(path).await
    }

    /// 检查路径是否存在
    pub async fn exists(&self, path: &str) -> Result<bool, TransferError> {
        self.transport()?.exists(path).await
    }

    /// 关闭连接，重复调用无副作用
    pub async fn end(&self) -> Result<(), TransferError> {
        if self.ended.swap(true, Ordering::AcqRel) {
            debug!("[Client] end() called on an ended client");
            return Ok(());
        }
        info!("[Client] Closing {}", self.config.display_target());
        self.transport.end().await
    }
}
