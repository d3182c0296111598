// 数据模型模块

pub mod connection;
pub mod entry;
pub mod path;
pub mod transfer;

pub use connection::{ConnectionConfig, Protocol};
pub use entry::{EntryKind, RemoteEntry};
pub use transfer::{DownloadSource, TransferResult};
