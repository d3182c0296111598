// 批量传输
// 逐个顺序执行，遇到第一个错误即停止，返回已完成的部分

use std::collections::HashSet;
use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use super::UnifiedClient;
use crate::error::TransferError;
use crate::models::path::{basename, join_path, parent_path};
use crate::models::{DownloadSource, TransferResult};

impl UnifiedClient {
    /// 批量下载到本地目录
    ///
    /// `source` 可以是远程目录（先 list，跳过子目录），也可以是文件列表。
    /// 本地文件名取远程路径的最后一段，已存在的本地文件会被覆盖。
    pub async fn download_files(
        &self,
        source: impl Into<DownloadSource>,
        target_folder: impl AsRef<Path>,
    ) -> TransferResult<'_> {
        let target = target_folder.as_ref();
        let mut result = TransferResult::new(self);

        let remote_files = match self.resolve_download_source(source.into()).await {
            Ok(files) => files,
            Err(e) => {
                error!("[Transfer] Failed to resolve download source: {}", e);
                result.error_message = Some(e.to_string());
                return result;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(target).await {
            error!("[Transfer] Failed to create {:?}: {}", target, e);
            result.error_message = Some(TransferError::from(e).to_string());
            return result;
        }

        for remote in remote_files {
            let local = target.join(basename(&remote));
            if tokio::fs::try_exists(&local).await.unwrap_or(false) {
                info!("[Transfer] {:?} already exists, overwrite ...", local);
            }

            match self.download_file(&remote, &local).await {
                Ok(bytes) => {
                    info!("[Transfer] Downloaded {} to {:?} ({} bytes)", remote, local, bytes);
                    result.paths.push(local.to_string_lossy().into_owned());
                }
                Err(e) => {
                    error!("[Transfer] Download of {} failed: {}", remote, e);
                    result.error_message = Some(e.to_string());
                    break;
                }
            }
        }

        result
    }

    /// 批量上传到远程目录
    ///
    /// 每个远程目录在一次调用中只检查一次，不存在则递归创建。
    /// 失败时不回滚已上传的文件和已创建的目录。
    pub async fn upload_files<P: AsRef<Path>>(
        &self,
        local_files: &[P],
        remote_folder: &str,
    ) -> TransferResult<'_> {
        let mut result = TransferResult::new(self);
        // 本次调用内已确认存在的远程目录
        let mut dir_cache: HashSet<String> = HashSet::new();

        for local in local_files {
            let local = local.as_ref();
            let Some(name) = local.file_name() else {
                error!("[Transfer] {:?} has no file name", local);
                result.error_message = Some(format!("Invalid local file path: {:?}", local));
                break;
            };

            let remote = join_path(remote_folder, &name.to_string_lossy());
            info!("[Transfer] Upload {:?} to {}", local, remote);

            if let Err(e) = self.upload_file(local, &remote, &mut dir_cache).await {
                error!("[Transfer] Upload of {:?} failed: {}", local, e);
                result.error_message = Some(e.to_string());
                break;
            }
            result.paths.push(remote);
        }

        result
    }

    /// 深度优先列出目录下的所有文件
    ///
    /// 顺序与每一级 list 的返回顺序一致。出错时记录日志并返回已收集的部分。
    pub async fn list_recursive(&self, folder: &str) -> TransferResult<'_> {
        let mut result = TransferResult::new(self);

        if let Err(e) = self.walk(folder.to_string(), &mut result.paths).await {
            error!("[Transfer] Recursive listing of {} stopped: {}", folder, e);
            result.error_message = Some(e.to_string());
        }

        debug!(
            "[Transfer] Found {} files under {}",
            result.paths.len(),
            folder
        );
        result
    }

    async fn resolve_download_source(
        &self,
        source: DownloadSource,
    ) -> Result<Vec<String>, TransferError> {
        match source {
            DownloadSource::Files(entries) => Ok(entries.into_iter().map(|e| e.name).collect()),
            DownloadSource::Folder(folder) => {
                let entries = self.list(&folder).await?;
                Ok(entries
                    .into_iter()
                    .filter(|e| {
                        if e.is_dir() {
                            debug!("[Transfer] Skipping directory {}", e.name);
                        }
                        e.is_file()
                    })
                    .map(|e| join_path(&folder, &e.name))
                    .collect())
            }
        }
    }

    /// 下载单个文件，写入完成后才返回
    async fn download_file(&self, remote: &str, local: &Path) -> Result<u64, TransferError> {
        let mut reader = self.get(remote).await?;
        let mut file = tokio::fs::File::create(local).await?;

        let written = async {
            let bytes = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            Ok::<u64, std::io::Error>(bytes)
        }
        .await;

        match written {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                // 删除不完整的文件
                drop(file);
                if let Err(cleanup) = tokio::fs::remove_file(local).await {
                    warn!("[Transfer] Failed to remove partial file {:?}: {}", local, cleanup);
                }
                Err(e.into())
            }
        }
    }

    /// 确认远程目录后上传单个文件
    async fn upload_file(
        &self,
        local: &Path,
        remote: &str,
        dir_cache: &mut HashSet<String>,
    ) -> Result<(), TransferError> {
        let remote_dir = parent_path(remote);
        if !dir_cache.contains(&remote_dir) {
            if !self.exists(&remote_dir).await? {
                info!("[Transfer] Creating remote directory {}", remote_dir);
                self.mkdir(&remote_dir).await?;
            }
            dir_cache.insert(remote_dir);
        }
        self.put(local, remote).await
    }

    fn walk<'a>(
        &'a self,
        dir: String,
        files: &'a mut Vec<String>,
    ) -> BoxFuture<'a, Result<(), TransferError>> {
        async move {
            let entries = self.list(&dir).await?;
            for entry in entries {
                let path = join_path(&dir, &entry.name);
                if entry.is_dir() {
                    self.walk(path, files).await?;
                } else {
                    files.push(path);
                }
            }
            Ok(())
        }
        .boxed()
    }
}
