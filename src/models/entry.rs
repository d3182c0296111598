// 远程目录条目

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryKind {
    /// 普通文件（符号链接等其他类型也归为文件）
    #[default]
    File,
    /// 目录
    Directory,
}

/// list 返回的远程条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// 文件名（不含目录）
    pub name: String,
    /// 条目类型
    pub kind: EntryKind,
    /// 文件大小（字节），未知时为 0
    pub size: u64,
}

impl RemoteEntry {
    /// 创建文件条目
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size: 0,
        }
    }

    /// 创建目录条目
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
        }
    }

    /// 设置大小
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// 格式化文件大小
    pub fn format_size(&self) -> String {
        if self.is_dir() {
            return "-".to_string();
        }

        let size = self.size as f64;
        if size >= 1_073_741_824.0 {
            format!("{:.1} GB", size / 1_073_741_824.0)
        } else if size >= 1_048_576.0 {
            format!("{:.1} MB", size / 1_048_576.0)
        } else if size >= 1_024.0 {
            format!("{:.1} KB", size / 1_024.0)
        } else {
            format!("{} B", self.size)
        }
    }
}

impl From<&str> for RemoteEntry {
    fn from(name: &str) -> Self {
        RemoteEntry::file(name)
    }
}

impl From<String> for RemoteEntry {
    fn from(name: String) -> Self {
        RemoteEntry::file(name)
    }
}
