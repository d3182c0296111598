// 协议相关常量

/// 默认端口
pub mod ports {
    /// FTP / FTPS 默认端口
    pub const FTP: u16 = 21;
    /// SFTP 默认端口
    pub const SFTP: u16 = 22;
}

/// 各协议表示"文件不存在"的状态码
pub mod not_found {
    /// FTP 550: Requested action not taken. File unavailable
    pub const FTP_FILE_UNAVAILABLE: u32 = 550;
    /// SSH_FX_NO_SUCH_FILE
    pub const SFTP_NO_SUCH_FILE: u32 = 2;
}

/// 连接超时默认值（秒）
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// 配置目录名
pub const CONFIG_DIR_NAME: &str = "bestftp";

/// 连接配置文件名
pub const PROFILES_FILE_NAME: &str = "connections.json";

/// 未显式提供密码时读取的环境变量
pub const PASSWORD_ENV: &str = "BESTFTP_PASSWORD";
