// 协议后端与配置持久化
// ftp / sftp 实现各自的原生调用形态，由 transport 归一化

pub mod ftp;
pub mod sftp;
pub mod storage;
