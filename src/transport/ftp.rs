// FTP 家族传输归一化
// FtpControl 是阻塞式的原生调用形态，这里把每次调用放到阻塞线程池执行，
// 调用方只看到异步接口

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use suppaftp::list::File as ListLine;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

use super::{RemoteReader, Transport};
use crate::error::TransferError;
use crate::models::path::{ancestors, basename};
use crate::models::{EntryKind, RemoteEntry};

/// 下载时阻塞线程与读取方之间缓冲的数据块数
const STREAM_CHUNKS: usize = 16;

/// RETR 数据的接收端
pub trait RetrieveSink: Write + Send {
    /// 数据连接已建立，此后的失败通过字节流报告
    fn opened(&mut self);
}

/// FTP 控制连接的原生调用
/// 所有方法阻塞直到服务器应答，FTP 应答错误通过 TransferError::Ftp 携带应答码
pub trait FtpControl: Send + 'static {
    /// LIST，返回原始行
    fn list(&mut self, path: &str) -> Result<Vec<String>, TransferError>;
    /// RETR，数据连接建立后调用 sink.opened()，再把内容写入 sink，返回字节数
    fn retrieve(&mut self, path: &str, sink: &mut dyn RetrieveSink) -> Result<u64, TransferError>;
    /// STOR，返回写入字节数
    fn store(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64, TransferError>;
    /// DELE
    fn remove(&mut self, path: &str) -> Result<(), TransferError>;
    /// MKD（单级）
    fn make_dir(&mut self, path: &str) -> Result<(), TransferError>;
    /// QUIT
    fn quit(&mut self) -> Result<(), TransferError>;
}

/// FTP 家族传输
/// 控制连接是单通道的，调用通过互斥锁串行化
pub struct FtpTransport<C: FtpControl> {
    control: Arc<Mutex<C>>,
    /// 有调用在服务器应答前被取消，之后的应答不再对应
    desynced: AtomicBool,
}

/// 调用未完成就被丢弃时标记控制连接失步
struct CancelGuard<'a> {
    desynced: &'a AtomicBool,
    armed: bool,
}

impl<'a> CancelGuard<'a> {
    fn new(desynced: &'a AtomicBool) -> Self {
        Self {
            desynced,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("[FTP] Call cancelled before the server replied, control connection is out of sync");
            self.desynced.store(true, Ordering::Release);
        }
    }
}

impl<C: FtpControl> FtpTransport<C> {
    pub fn new(control: C) -> Self {
        Self {
            control: Arc::new(Mutex::new(control)),
            desynced: AtomicBool::new(false),
        }
    }

    fn ensure_in_sync(&self) -> Result<(), TransferError> {
        if self.desynced.load(Ordering::Acquire) {
            return Err(TransferError::Disconnected(
                "FTP control connection is out of sync after a cancelled call".to_string(),
            ));
        }
        Ok(())
    }

    /// 在阻塞线程池中持锁执行一次控制连接调用
    fn spawn<T, F>(&self, op: F) -> JoinHandle<Result<T, TransferError>>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> Result<T, TransferError> + Send + 'static,
    {
        let control = Arc::clone(&self.control);
        tokio::task::spawn_blocking(move || {
            let mut guard = control.lock().map_err(|_| {
                TransferError::Disconnected("FTP control connection poisoned".to_string())
            })?;
            op(&mut guard)
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, TransferError>
    where
        T: Send + 'static,
        F: FnOnce(&mut C) -> Result<T, TransferError> + Send + 'static,
    {
        self.ensure_in_sync()?;
        let mut guard = CancelGuard::new(&self.desynced);
        let joined = self.spawn(op).await;
        guard.disarm();
        joined?
    }
}

/// 把 RETR 数据按块送进有界通道
struct ChannelSink {
    chunks: mpsc::Sender<io::Result<Bytes>>,
    opened: Option<oneshot::Sender<Result<(), TransferError>>>,
}

impl ChannelSink {
    /// 打开前失败交给 get 返回，打开后失败交给读取方
    fn fail(mut self, e: TransferError) {
        match self.opened.take() {
            Some(opened) => {
                let _ = opened.send(Err(e));
            }
            None => {
                let _ = self.chunks.blocking_send(Err(io::Error::other(e.to_string())));
            }
        }
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.chunks
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "download reader dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RetrieveSink for ChannelSink {
    fn opened(&mut self) {
        if let Some(opened) = self.opened.take() {
            let _ = opened.send(Ok(()));
        }
    }
}

fn chunk_reader(chunks: mpsc::Receiver<io::Result<Bytes>>) -> RemoteReader {
    let stream = futures::stream::unfold(chunks, |mut chunks| async move {
        chunks.recv().await.map(|chunk| (chunk, chunks))
    });
    Box::new(StreamReader::new(Box::pin(stream)))
}

/// 解析 LIST 输出的一行
fn parse_list_line(line: &str) -> Option<RemoteEntry> {
    match ListLine::try_from(line) {
        Ok(file) => {
            let name = basename(file.name());
            if name.is_empty() || name == "." || name == ".." {
                return None;
            }
            let kind = if file.is_directory() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            Some(RemoteEntry {
                name: name.to_string(),
                kind,
                size: file.size() as u64,
            })
        }
        Err(e) => {
            warn!("[FTP] Skipping unparsable LIST line {:?}: {:?}", line, e);
            None
        }
    }
}

/// 逐级创建目录，已存在的前缀跳过
fn make_dirs<C: FtpControl>(control: &mut C, path: &str) -> Result<(), TransferError> {
    for prefix in ancestors(path) {
        match control.list(&prefix) {
            Ok(_) => continue,
            Err(e) if e.is_not_found() => {
                debug!("[FTP] Creating directory: {}", prefix);
                control.make_dir(&prefix)?;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[async_trait]
impl<C: FtpControl> Transport for FtpTransport<C> {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, TransferError> {
        debug!("[FTP] Listing: {}", path);
        let target = path.to_string();
        let lines = self.run(move |c| c.list(&target)).await?;
        let entries: Vec<RemoteEntry> = lines.iter().filter_map(|l| parse_list_line(l)).collect();
        debug!("[FTP] Read {} entries from {}", entries.len(), path);
        Ok(entries)
    }

    /// 数据连接打开后立即返回，传输在阻塞线程中继续，
    /// 读完之前控制连接一直被占用
    async fn get(&self, path: &str) -> Result<RemoteReader, TransferError> {
        debug!("[FTP] Retrieving: {}", path);
        self.ensure_in_sync()?;

        let (chunks_tx, chunks_rx) = mpsc::channel(STREAM_CHUNKS);
        let (opened_tx, opened_rx) = oneshot::channel();
        let mut sink = ChannelSink {
            chunks: chunks_tx,
            opened: Some(opened_tx),
        };

        let target = path.to_string();
        let mut guard = CancelGuard::new(&self.desynced);
        let transfer = self.spawn(move |c| {
            match c.retrieve(&target, &mut sink) {
                Ok(bytes) => debug!("[FTP] Retrieved {} ({} bytes)", target, bytes),
                Err(e) => {
                    warn!("[FTP] RETR {} failed: {}", target, e);
                    sink.fail(e);
                }
            }
            Ok(())
        });
        let opened = opened_rx.await;
        guard.disarm();

        match opened {
            Ok(Ok(())) => Ok(chunk_reader(chunks_rx)),
            Ok(Err(e)) => Err(e),
            // 任务在调用 retrieve 之前就结束了
            Err(_) => {
                transfer.await??;
                Err(TransferError::Task(format!("RETR {} ended without a reply", path)))
            }
        }
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<(), TransferError> {
        let local = local_path.to_path_buf();
        let remote = remote_path.to_string();
        let bytes = self
            .run(move |c| {
                let mut file = std::fs::File::open(&local)?;
                c.store(&remote, &mut file)
            })
            .await?;
        debug!(
            "[FTP] Stored {:?} -> {} ({} bytes)",
            local_path, remote_path, bytes
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), TransferError> {
        info!("[FTP] Removing file: {}", path);
        let target = path.to_string();
        self.run(move |c| c.remove(&target)).await
    }

    async fn mkdir(&self, path: &str) -> Result<(), TransferError> {
        info!("[FTP] Creating directory tree: {}", path);
        let target = path.to_string();
        self.run(move |c| make_dirs(c, &target)).await
    }

    async fn exists(&self, path: &str) -> Result<bool, TransferError> {
        let target = path.to_string();
        match self.run(move |c| c.list(&target)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn end(&self) -> Result<(), TransferError> {
        if let Err(e) = self.run(|c| c.quit()).await {
            warn!("[FTP] QUIT failed: {}", e);
        }
        Ok(())
    }
}
