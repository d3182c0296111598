// FTP 服务 - 封装 suppaftp 阻塞客户端

use std::io::Read;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, NativeTlsConnector, NativeTlsFtpStream};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::TransferError;
use crate::models::{ConnectionConfig, Protocol};
use crate::transport::{FtpControl, RetrieveSink};

/// 控制连接（明文或隐式 TLS）
enum FtpConnection {
    Plain(FtpStream),
    Secure(NativeTlsFtpStream),
}

/// 对两种连接执行同样的调用
macro_rules! with_stream {
    ($conn:expr, $s:ident => $body:expr) => {
        match $conn {
            FtpConnection::Plain($s) => $body,
            FtpConnection::Secure($s) => $body,
        }
    };
}

/// 把 suppaftp 错误转换为带应答码的 TransferError
fn map_ftp_error(context: &str, e: FtpError) -> TransferError {
    match e {
        FtpError::UnexpectedResponse(response) => {
            let body = String::from_utf8_lossy(&response.body).trim().to_string();
            TransferError::ftp(
                Some(response.status.code()),
                format!("{}: {}", context, body),
            )
        }
        other => TransferError::ftp(None, format!("{}: {}", context, other)),
    }
}

/// FTP 服务
/// 持有一条已登录的控制连接
pub struct FtpService {
    /// 连接标识（用于日志）
    target: String,
    /// 控制连接
    conn: FtpConnection,
    /// 是否已发送 QUIT
    closed: bool,
}

impl FtpService {
    /// 建立连接并登录
    /// 阻塞的握手放到阻塞线程池执行，整体受 connect_timeout 约束
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, TransferError> {
        let config = config.clone();
        let secs = config.connect_timeout;
        let task = tokio::task::spawn_blocking(move || Self::connect_blocking(&config));

        match timeout(Duration::from_secs(secs), task).await {
            Ok(joined) => joined?,
            Err(_) => Err(TransferError::Timeout(secs)),
        }
    }

    fn connect_blocking(config: &ConnectionConfig) -> Result<Self, TransferError> {
        let target = config.display_target();
        let addr = resolve(&config.host, config.effective_port())?;
        info!("[FTP] Connecting to {} ({})", target, addr);

        let connect_timeout = Duration::from_secs(config.connect_timeout);
        let mut conn = match config.protocol {
            Protocol::Ftps => {
                // connect_secure_implicit 的 TCP 连接没有超时，先在限时内确认端口可达
                TcpStream::connect_timeout(&addr, connect_timeout)
                    .map_err(|e| TransferError::Connection(format!("{}: {}", target, e)))?;
                let tls = TlsConnector::new().map_err(|e| {
                    TransferError::Connection(format!("Failed to set up TLS: {}", e))
                })?;
                let stream = NativeTlsFtpStream::connect_secure_implicit(
                    addr,
                    NativeTlsConnector::from(tls),
                    &config.host,
                )
                .map_err(|e| TransferError::Connection(format!("{}: {}", target, e)))?;
                FtpConnection::Secure(stream)
            }
            _ => {
                let stream = FtpStream::connect_timeout(addr, connect_timeout)
                .map_err(|e| TransferError::Connection(format!("{}: {}", target, e)))?;
                FtpConnection::Plain(stream)
            }
        };

        with_stream!(&mut conn, s => {
            // 登录阶段的应答读取同样受 connect_timeout 约束
            set_socket_timeout(s.get_ref(), Some(connect_timeout))?;
            s.login(&config.user, &config.password)
                .map_err(|e| TransferError::Connection(format!("Login failed: {}", e)))?;
            s.transfer_type(FileType::Binary)
                .map_err(|e| map_ftp_error("TYPE I", e))?;
            set_socket_timeout(s.get_ref(), None)?;
        });

        info!("[FTP] Logged in to {}", target);

        Ok(Self {
            target,
            conn,
            closed: false,
        })
    }
}

/// 设置控制连接的读写超时
fn set_socket_timeout(socket: &TcpStream, limit: Option<Duration>) -> Result<(), TransferError> {
    socket.set_read_timeout(limit)?;
    socket.set_write_timeout(limit)?;
    Ok(())
}

/// 解析主机地址
fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransferError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| TransferError::Connection(format!("Failed to resolve {}: {}", host, e)))?
        .next()
        .ok_or_else(|| TransferError::Connection(format!("No valid address found for {}", host)))
}

impl FtpControl for FtpService {
    fn list(&mut self, path: &str) -> Result<Vec<String>, TransferError> {
        with_stream!(&mut self.conn, s => s.list(Some(path)))
            .map_err(|e| map_ftp_error(&format!("LIST {}", path), e))
    }

    fn retrieve(&mut self, path: &str, sink: &mut dyn RetrieveSink) -> Result<u64, TransferError> {
        let context = format!("RETR {}", path);
        with_stream!(&mut self.conn, s => {
            let mut data = s.retr_as_stream(path).map_err(|e| map_ftp_error(&context, e))?;
            sink.opened();
            let copied = std::io::copy(&mut data, sink);
            // 无论复制是否成功都要读取传输结束应答，保持控制连接同步
            let finished = s.finalize_retr_stream(data).map_err(|e| map_ftp_error(&context, e));
            let bytes = copied?;
            finished?;
            Ok(bytes)
        })
    }

    fn store(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64, TransferError> {
        let mut reader = reader;
        with_stream!(&mut self.conn, s => s.put_file(path, &mut reader))
            .map_err(|e| map_ftp_error(&format!("STOR {}", path), e))
    }

    fn remove(&mut self, path: &str) -> Result<(), TransferError> {
        with_stream!(&mut self.conn, s => s.rm(path))
            .map_err(|e| map_ftp_error(&format!("DELE {}", path), e))
    }

    fn make_dir(&mut self, path: &str) -> Result<(), TransferError> {
        with_stream!(&mut self.conn, s => s.mkdir(path))
            .map_err(|e| map_ftp_error(&format!("MKD {}", path), e))
    }

    fn quit(&mut self) -> Result<(), TransferError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        info!("[FTP] Closing connection to {}", self.target);
        with_stream!(&mut self.conn, s => s.quit()).map_err(|e| map_ftp_error("QUIT", e))
    }
}

impl Drop for FtpService {
    fn drop(&mut self) {
        if !self.closed {
            debug!("[FTP] Dropping connection to {} without QUIT", self.target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suppaftp::types::Response;
    use suppaftp::Status;

    fn reply(status: Status, body: &str) -> FtpError {
        FtpError::UnexpectedResponse(Response {
            status,
            body: body.as_bytes().to_vec(),
        })
    }

    #[test]
    fn test_file_unavailable_reply_is_not_found() {
        let err = map_ftp_error(
            "LIST /gone",
            reply(Status::FileUnavailable, "550 /gone: No such file or directory\r\n"),
        );
        assert!(err.is_not_found());
        assert!(matches!(err, TransferError::Ftp { code: Some(550), .. }));
        assert!(err.to_string().contains("LIST /gone"));
    }

    #[test]
    fn test_other_reply_is_propagated() {
        let err = map_ftp_error("LIST /", reply(Status::NotLoggedIn, "530 Please login\r\n"));
        assert!(!err.is_not_found());
        assert!(matches!(err, TransferError::Ftp { code: Some(530), .. }));
    }

    #[test]
    fn test_connection_error_has_no_code() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = map_ftp_error("RETR a.txt", FtpError::ConnectionError(io));
        assert!(!err.is_not_found());
        assert!(matches!(err, TransferError::Ftp { code: None, .. }));
    }

    #[tokio::test]
    async fn test_implicit_tls_connect_fails_fast_on_closed_port() {
        // 取一个刚释放的本地端口
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = ConnectionConfig::new(Protocol::Ftps, "127.0.0.1", "u", "p").with_port(port);
        config.connect_timeout = 5;

        let started = std::time::Instant::now();
        let err = FtpService::connect(&config).await.err().unwrap();
        assert!(matches!(err, TransferError::Connection(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
