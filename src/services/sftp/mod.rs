// SFTP 后端 (russh + russh-sftp)

mod service;

pub use service::SftpService;
