// BestFTP - FTP/FTPS/SFTP 统一客户端

pub mod client;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod ssh;
pub mod transport;

pub use client::{ClientState, UnifiedClient};
pub use error::TransferError;
pub use models::{
    ConnectionConfig, DownloadSource, EntryKind, Protocol, RemoteEntry, TransferResult,
};
pub use transport::Transport;
