// 连接配置持久化服务

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_DIR_NAME, PROFILES_FILE_NAME};
use crate::models::ConnectionConfig;

/// 命名的连接配置集合
pub type Profiles = BTreeMap<String, ConnectionConfig>;

/// 获取配置目录路径
/// macOS: ~/Library/Application Support/bestftp
/// Linux: ~/.config/bestftp
/// Windows: C:\Users\<用户名>\AppData\Roaming\bestftp
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("无法获取系统配置目录")?
        .join(CONFIG_DIR_NAME);
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).context("无法创建配置目录")?;
    }
    Ok(config_dir)
}

/// 获取连接配置文件路径
pub fn get_profiles_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(PROFILES_FILE_NAME))
}

/// 从指定文件加载连接配置，文件不存在时返回空集合
pub fn load_profiles_from(path: &Path) -> Result<Profiles> {
    if !path.exists() {
        return Ok(Profiles::new());
    }
    let content = fs::read_to_string(path).context("无法读取连接配置文件")?;
    let profiles: Profiles = serde_json::from_str(&content)
        .with_context(|| format!("无法解析连接配置文件 {}", path.display()))?;
    Ok(profiles)
}

/// 保存连接配置到指定文件
pub fn save_profiles_to(path: &Path, profiles: &Profiles) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("无法创建配置目录")?;
    }
    let content = serde_json::to_string_pretty(profiles).context("无法序列化连接配置")?;
    fs::write(path, content).context("无法写入连接配置文件")?;
    Ok(())
}

/// 加载默认位置的连接配置
pub fn load_profiles() -> Result<Profiles> {
    load_profiles_from(&get_profiles_file()?)
}

/// 按名称获取连接配置
pub fn load_profile(name: &str) -> Result<ConnectionConfig> {
    let mut profiles = load_profiles()?;
    profiles
        .remove(name)
        .with_context(|| format!("未找到连接配置: {}", name))
}
