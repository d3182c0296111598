// SFTP 传输归一化
// SftpApi 是原生的异步调用形态；这里补齐递归 mkdir，
// 并把 stat 的 NO_SUCH_FILE 转成 false

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{RemoteReader, Transport};
use crate::error::TransferError;
use crate::models::path::ancestors;
use crate::models::{EntryKind, RemoteEntry};

/// read_dir / stat 返回的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpDirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// SFTP 会话的原生调用
#[async_trait]
pub trait SftpApi: Send + Sync + 'static {
    /// 读取目录（可能包含 . 和 ..）
    async fn read_dir(&self, path: &str) -> Result<Vec<SftpDirEntry>, TransferError>;
    /// 打开远程文件用于读取
    async fn open(&self, path: &str) -> Result<RemoteReader, TransferError>;
    /// 上传本地文件，返回写入字节数
    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64, TransferError>;
    /// 删除文件
    async fn remove_file(&self, path: &str) -> Result<(), TransferError>;
    /// 创建单级目录
    async fn create_dir(&self, path: &str) -> Result<(), TransferError>;
    /// 获取属性
    async fn stat(&self, path: &str) -> Result<SftpDirEntry, TransferError>;
    /// 关闭会话
    async fn close(&self) -> Result<(), TransferError>;
}

/// SFTP 传输
pub struct SftpTransport<A: SftpApi> {
    api: A,
}

impl<A: SftpApi> SftpTransport<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: SftpApi> Transport for SftpTransport<A> {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        debug!("[SFTP] Reading directory: {}", path);
        let entries: Vec<RemoteEntry> = self
            .api
            .read_dir(path)
            .await?
            .into_iter()
            .filter(|e| e.name != "." && e.name != "..")
            .map(|e| RemoteEntry {
                name: e.name,
                kind: if e.is_dir {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: e.size,
            })
            .collect();
        debug!("[SFTP] Read {} entries from {}", entries.len(), path);
        Ok(entries)
    }

    async fn get(&self, path: &str) -> Result<RemoteReader, TransferError> {
        debug!("[SFTP] Reading file: {}", path);
        self.api.open(path).await
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), TransferError> {
        let bytes = self.api.put(local_path, remote_path).await?;
        debug!(
            "[SFTP] Uploaded {:?} -> {} ({} bytes)",
            local_path, remote_path, bytes
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), TransferError> {
        info!("[SFTP] Removing file: {}", path);
        self.api.remove_file(path).await
    }

    async fn mkdir(&self, path: &str) -> Result<(), TransferError> {
        info!("[SFTP] Creating directory tree: {}", path);
        for prefix in ancestors(path) {
            match self.api.stat(&prefix).await {
                Ok(_) => continue,
                Err(e) if e.is_not_found() => {
                    debug!("[SFTP] Creating directory: {}", prefix);
                    self.api.create_dir(&prefix).await?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, TransferError> {
        match self.api.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn end(&self) -> Result<(), TransferError> {
        if let Err(e) = self.api.close().await {
            warn!("[SFTP] Close failed: {}", e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;

    #[derive(Default)]
    struct SftpState {
        dirs: BTreeSet<String>,
        files: BTreeMap<String, Vec<u8>>,
        stat_code: Option<u32>,
        created: Vec<String>,
        closed: bool,
    }

    #[derive(Clone, Default)]
    struct MockSftp {
        state: Arc<Mutex<SftpState>>,
    }

    fn no_such_file(path: &str) -> TransferError {
        TransferError::sftp(Some(2), format!("{}: No such file", path))
    }

    #[async_trait]
    impl SftpApi for MockSftp {
        async fn read_dir(&self, path: &str) -> Result<Vec<SftpDirEntry>, TransferError> {
            let state = self.state.lock().unwrap();
            if !state.dirs.contains(path) {
                return Err(no_such_file(path));
            }
            let prefix = format!("{}/", path);
            let mut entries = vec![
                SftpDirEntry {
                    name: ".".to_string(),
                    is_dir: true,
                    size: 0,
                },
                SftpDirEntry {
                    name: "..".to_string(),
                    is_dir: true,
                    size: 0,
                },
            ];
            for dir in &state.dirs {
                if let Some(rest) = dir.strip_prefix(&prefix) {
                    if !rest.contains('/') {
                        entries.push(SftpDirEntry {
                            name: rest.to_string(),
                            is_dir: true,
                            size: 0,
                        });
                    }
                }
            }
            for (file, data) in &state.files {
                if let Some(rest) = file.strip_prefix(&prefix) {
                    if !rest.contains('/') {
                        entries.push(SftpDirEntry {
                            name: rest.to_string(),
                            is_dir: false,
                            size: data.len() as u64,
                        });
                    }
                }
            }
            Ok(entries)
        }

        async fn open(&self, path: &str) -> Result<RemoteReader, TransferError> {
            let state = self.state.lock().unwrap();
            let data = state.files.get(path).cloned().ok_or_else(|| no_such_file(path))?;
            Ok(Box::new(std::io::Cursor::new(data)))
        }

        async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64, TransferError> {
            let data = tokio::fs::read(local_path).await?;
            let len = data.len() as u64;
            self.state
                .lock()
                .unwrap()
                .files
                .insert(remote_path.to_string(), data);
            Ok(len)
        }

        async fn remove_file(&self, path: &str) -> Result<(), TransferError> {
            let mut state = self.state.lock().unwrap();
            state.files.remove(path).map(|_| ()).ok_or_else(|| no_such_file(path))
        }

        async fn create_dir(&self, path: &str) -> Result<(), TransferError> {
            let mut state = self.state.lock().unwrap();
            state.created.push(path.to_string());
            state.dirs.insert(path.to_string());
            Ok(())
        }

        async fn stat(&self, path: &str) -> Result<SftpDirEntry, TransferError> {
            let state = self.state.lock().unwrap();
            if let Some(code) = state.stat_code {
                return Err(TransferError::sftp(Some(code), "scripted status"));
            }
            if state.dirs.contains(path) {
                return Ok(SftpDirEntry {
                    name: path.to_string(),
                    is_dir: true,
                    size: 0,
                });
            }
            match state.files.get(path) {
                Some(data) => Ok(SftpDirEntry {
                    name: path.to_string(),
                    is_dir: false,
                    size: data.len() as u64,
                }),
                None => Err(no_such_file(path)),
            }
        }

        async fn close(&self) -> Result<(), TransferError> {
            self.state.lock().unwrap().closed = true;
            Ok(())
        }
    }

    fn mock_with(dirs: &[&str], files: &[(&str, &str)]) -> MockSftp {
        let mock = MockSftp::default();
        {
            let mut state = mock.state.lock().unwrap();
            for dir in dirs {
                state.dirs.insert(dir.to_string());
            }
            for (path, data) in files {
                state.files.insert(path.to_string(), data.as_bytes().to_vec());
            }
        }
        mock
    }

    #[tokio::test]
    async fn test_list_skips_dot_entries() {
        let mock = mock_with(&["/home", "/home/docs"], &[("/home/a.txt", "12345")]);
        let transport = SftpTransport::new(mock);

        let entries = transport.list("/home").await.unwrap();
        assert_eq!(
            entries,
            vec![
                RemoteEntry::directory("docs"),
                RemoteEntry::file("a.txt").with_size(5),
            ]
        );
    }

    #[tokio::test]
    async fn test_exists_translates_no_such_file() {
        let mock = mock_with(&["/home"], &[("/home/a.txt", "x")]);
        let transport = SftpTransport::new(mock.clone());

        assert!(transport.exists("/home").await.unwrap());
        assert!(transport.exists("/home/a.txt").await.unwrap());
        assert!(!transport.exists("/home/b.txt").await.unwrap());

        // SSH_FX_PERMISSION_DENIED 继续抛出
        mock.state.lock().unwrap().stat_code = Some(3);
        let err = transport.exists("/home").await.unwrap_err();
        assert!(matches!(err, TransferError::Sftp { code: Some(3), .. }));
    }

    #[tokio::test]
    async fn test_get_yields_stream() {
        let mock = mock_with(&["/home"], &[("/home/a.txt", "in memory")]);
        let transport = SftpTransport::new(mock);

        let mut reader = transport.get("/home/a.txt").await.unwrap();
        let mut sink = Vec::new();
        tokio::io::copy(&mut reader, &mut sink).await.unwrap();
        assert_eq!(sink, b"in memory");

        let mut reader = transport.get("/home/a.txt").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();
        assert_eq!(content, "in memory");

        let err = transport.get("/home/missing.txt").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mkdir_is_recursive() {
        let mock = mock_with(&["/home"], &[]);
        let transport = SftpTransport::new(mock.clone());

        transport.mkdir("/home/a/b/c").await.unwrap();
        assert_eq!(
            mock.state.lock().unwrap().created,
            vec!["/home/a", "/home/a/b", "/home/a/b/c"]
        );
    }

    #[tokio::test]
    async fn test_mkdir_propagates_other_errors() {
        let mock = mock_with(&[], &[]);
        mock.state.lock().unwrap().stat_code = Some(4);
        let transport = SftpTransport::new(mock.clone());

        assert!(transport.mkdir("/x").await.is_err());
        assert!(mock.state.lock().unwrap().created.is_empty());
    }

    #[tokio::test]
    async fn test_put_delete_end() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("note.txt");
        tokio::fs::write(&local, b"note").await.unwrap();

        let mock = mock_with(&["/home"], &[]);
        let transport = SftpTransport::new(mock.clone());

        transport.put(&local, "/home/note.txt").await.unwrap();
        assert!(transport.exists("/home/note.txt").await.unwrap());

        transport.delete("/home/note.txt").await.unwrap();
        assert!(!transport.exists("/home/note.txt").await.unwrap());

        transport.end().await.unwrap();
        assert!(mock.state.lock().unwrap().closed);
    }
}
