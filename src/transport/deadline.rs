// 操作超时包装
// 不修改具体传输，只在外层为每个操作加上时限

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::warn;

use super::{RemoteReader, Transport};
use crate::error::TransferError;
use crate::models::RemoteEntry;

/// 为每个操作加上时限的传输
pub struct DeadlineTransport {
    inner: Box<dyn Transport>,
    limit: Duration,
}

impl DeadlineTransport {
    pub fn new(inner: Box<dyn Transport>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T: Send>(
        &self,
        op: &str,
        fut: impl Future<Output = Result<T, TransferError>> + Send,
    ) -> Result<T, TransferError> {
        match timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "[Transport] {} exceeded {}s deadline",
                    op,
                    self.limit.as_secs()
                );
                Err(TransferError::Timeout(self.limit.as_secs()))
            }
        }
    }
}

#[async_trait]
impl Transport for DeadlineTransport {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        self.bounded("list", self.inner.list(path)).await
    }

    async fn get(&self, path: &str) -> Result<RemoteReader, TransferError> {
        self.bounded("get", self.inner.get(path)).await
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), TransferError> {
        self.bounded("put", self.inner.put(local_path, remote_path))
            .await
    }

    async fn delete(&self, path: &str) -> Result<(), TransferError> {
        self.bounded("delete", self.inner.delete(path)).await
    }

    async fn mkdir(&self, path: &str) -> Result<(), TransferError> {
        self.bounded("mkdir", self.inner.mkdir(path)).await
    }

    async fn exists(&self, path: &str) -> Result<bool, TransferError> {
        self.bounded("exists", self.inner.exists(path)).await
    }

    async fn end(&self) -> Result<(), TransferError> {
        self.bounded("end", self.inner.end()).await
    }
}
