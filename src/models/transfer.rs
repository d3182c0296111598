// 批量传输相关类型

use std::fmt;

use super::entry::RemoteEntry;
use crate::client::UnifiedClient;

/// 下载来源：显式的文件列表，或需要先 list 的远程目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    /// 远程目录
    Folder(String),
    /// 远程文件列表（按顺序下载）
    Files(Vec<RemoteEntry>),
}

impl From<&str> for DownloadSource {
    fn from(folder: &str) -> Self {
        DownloadSource::Folder(folder.to_string())
    }
}

impl From<String> for DownloadSource {
    fn from(folder: String) -> Self {
        DownloadSource::Folder(folder)
    }
}

impl From<Vec<RemoteEntry>> for DownloadSource {
    fn from(entries: Vec<RemoteEntry>) -> Self {
        DownloadSource::Files(entries)
    }
}

impl From<Vec<String>> for DownloadSource {
    fn from(names: Vec<String>) -> Self {
        DownloadSource::Files(names.into_iter().map(RemoteEntry::from).collect())
    }
}

impl From<&[&str]> for DownloadSource {
    fn from(names: &[&str]) -> Self {
        DownloadSource::Files(names.iter().map(|n| RemoteEntry::from(*n)).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DownloadSource {
    fn from(names: [&str; N]) -> Self {
        DownloadSource::Files(names.iter().map(|n| RemoteEntry::from(*n)).collect())
    }
}

/// 批量操作结果
/// 出错时 paths 只包含出错前成功的部分
pub struct TransferResult<'a> {
    /// 执行操作的客户端
    pub client: &'a UnifiedClient,
    /// 成功传输的路径（按输入顺序）
    pub paths: Vec<String>,
    /// 第一个错误的信息
    pub error_message: Option<String>,
}

impl<'a> TransferResult<'a> {
    pub(crate) fn new(client: &'a UnifiedClient) -> Self {
        Self {
            client,
            paths: Vec::new(),
            error_message: None,
        }
    }

    /// 是否全部成功
    pub fn is_complete(&self) -> bool {
        self.error_message.is_none()
    }

    /// 是否被错误截断
    pub fn is_partial(&self) -> bool {
        self.error_message.is_some()
    }
}

impl fmt::Debug for TransferResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferResult")
            .field("protocol", &self.client.protocol())
            .field("paths", &self.paths)
            .field("error_message", &self.error_message)
            .finish()
    }
}
