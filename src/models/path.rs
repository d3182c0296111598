// 远程路径工具
// 远程路径统一使用 '/' 分隔

/// 获取父目录路径
pub fn parent_path(path: &str) -> String {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => path[..pos].to_string(),
        None => ".".to_string(),
    }
}

/// 连接路径
pub fn join_path(base: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        name.to_string()
    } else if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

/// 获取路径最后一段
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// 从浅到深列出路径的每一级前缀
/// "/a/b/c" -> ["/a", "/a/b", "/a/b/c"]
pub fn ancestors(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut current = String::new();
    let mut result = Vec::new();

    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if current.is_empty() {
            current = if absolute {
                format!("/{}", part)
            } else {
                part.to_string()
            };
        } else {
            current = format!("{}/{}", current, part);
        }
        result.push(current.clone());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), "/");
        assert_eq!(parent_path("/home"), "/");
        assert_eq!(parent_path("/home/user"), "/home");
        assert_eq!(parent_path("/home/user/"), "/home");
        assert_eq!(parent_path("upload/a.txt"), "upload");
        assert_eq!(parent_path("a.txt"), ".");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "home"), "/home");
        assert_eq!(join_path("/home", "user"), "/home/user");
        assert_eq!(join_path("/home/", "user"), "/home/user");
        assert_eq!(join_path("upload", "a.txt"), "upload/a.txt");
        assert_eq!(join_path("", "a.txt"), "a.txt");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/data/in/a.txt"), "a.txt");
        assert_eq!(basename("a.txt"), "a.txt");
        assert_eq!(basename("/data/in/"), "in");
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a", "/a/b", "/a/b/c"]);
        assert_eq!(ancestors("a//b/"), vec!["a", "a/b"]);
        assert!(ancestors("/").is_empty());
    }
}
