// 内存中的传输替身（仅测试使用）

use std::collections::{BTreeMap, HashSet};
use std::io::{self, Cursor};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::{RemoteReader, Transport};
use crate::error::TransferError;
use crate::models::path::{ancestors, basename, parent_path};
use crate::models::RemoteEntry;

#[derive(Default)]
pub(crate) struct MemoryState {
    /// 目录 -> 按插入顺序的列表
    pub listings: BTreeMap<String, Vec<RemoteEntry>>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub failing_gets: HashSet<String>,
    /// 读出这么多字节后流出错
    pub broken_gets: BTreeMap<String, usize>,
    pub failing_lists: HashSet<String>,
    /// 调用记录，形如 "exists:/up"
    pub calls: Vec<String>,
    pub ended: bool,
}

impl MemoryState {
    fn insert_entry(&mut self, path: &str, entry: RemoteEntry) {
        let parent = parent_path(path);
        let listing = self.listings.entry(parent).or_default();
        listing.retain(|e| e.name != entry.name);
        listing.push(entry);
    }

    fn add_dir(&mut self, path: &str) {
        if self.listings.contains_key(path) {
            return;
        }
        self.listings.insert(path.to_string(), Vec::new());
        if path != "/" {
            self.insert_entry(path, RemoteEntry::directory(basename(path)));
        }
    }

    fn add_file(&mut self, path: &str, data: Vec<u8>) {
        let size = data.len() as u64;
        self.files.insert(path.to_string(), data);
        self.insert_entry(path, RemoteEntry::file(basename(path)).with_size(size));
    }
}

/// 总是返回连接重置的读取端
struct ResetReader;

impl AsyncRead for ResetReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset mid-transfer",
        )))
    }
}

fn not_found(path: &str) -> TransferError {
    TransferError::sftp(Some(2), format!("{}: No such file", path))
}

#[derive(Clone, Default)]
pub(crate) struct MemoryTransport {
    pub state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().add_dir("/");
        transport
    }

    pub fn dir(self, path: &str) -> Self {
        self.state.lock().unwrap().add_dir(path);
        self
    }

    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.state.lock().unwrap().add_file(path, data.to_vec());
        self
    }

    pub fn fail_get(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_gets
            .insert(path.to_string());
        self
    }

    pub fn break_get_after(self, path: &str, bytes: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .broken_gets
            .insert(path.to_string(), bytes);
        self
    }

    pub fn fail_list(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(path.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    fn record(&self, op: &str, path: &str) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("{}:{}", op, path));
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        self.record("list", path);
        let state = self.state.lock().unwrap();
        if state.failing_lists.contains(path) {
            return Err(TransferError::sftp(Some(3), "Permission denied"));
        }
        state.listings.get(path).cloned().ok_or_else(|| not_found(path))
    }

    async fn get(&self, path: &str) -> Result<RemoteReader, TransferError> {
        self.record("get", path);
        let state = self.state.lock().unwrap();
        if state.failing_gets.contains(path) {
            return Err(TransferError::sftp(Some(4), format!("{}: Failure", path)));
        }
        let mut data = state.files.get(path).cloned().ok_or_else(|| not_found(path))?;
        if let Some(&limit) = state.broken_gets.get(path) {
            data.truncate(limit);
            return Ok(Box::new(Cursor::new(data).chain(ResetReader)));
        }
        Ok(Box::new(Cursor::new(data)))
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), TransferError> {
        self.record("put", remote_path);
        let data = tokio::fs::read(local_path).await?;
        let mut state = self.state.lock().unwrap();
        if !state.listings.contains_key(&parent_path(remote_path)) {
            return Err(not_found(remote_path));
        }
        state.add_file(remote_path, data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), TransferError> {
        self.record("delete", path);
        let mut state = self.state.lock().unwrap();
        state.files.remove(path).ok_or_else(|| not_found(path))?;
        let name = basename(path).to_string();
        if let Some(listing) = state.listings.get_mut(&parent_path(path)) {
            listing.retain(|e| e.name != name);
        }
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> Result<(), TransferError> {
        self.record("mkdir", path);
        let mut state = self.state.lock().unwrap();
        for prefix in ancestors(path) {
            state.add_dir(&prefix);
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, TransferError> {
        self.record("exists", path);
        let state = self.state.lock().unwrap();
        Ok(state.listings.contains_key(path) || state.files.contains_key(path))
    }

    async fn end(&self) -> Result<(), TransferError> {
        self.record("end", "");
        self.state.lock().unwrap().ended = true;
        Ok(())
    }
}
