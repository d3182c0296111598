// SSH 层，为 SFTP 传输提供已认证的会话
//
// - config: ConnectionConfig 到 SSH 参数的映射
// - client: 连接与认证
// - session: 会话及 sftp 子系统
// - handler: 服务器公钥与断开事件回调
// - error: SshError

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;

pub use client::SshClient;
pub use config::{AuthMethod, KeepaliveConfig, SshConfig};
pub use error::{ConnectStage, SshError};
pub use session::SshSession;
