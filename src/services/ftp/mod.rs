// FTP / FTPS 后端 (suppaftp)

mod service;

pub use service::FtpService;
