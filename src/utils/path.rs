//! # 路径工具函数
//!
//! - 获取应用数据目录路径（`~/.text2mindmap/`）
//! - 获取应用配置文件路径（`~/.text2mindmap/app-config.json`）

use std::path::PathBuf;

/// 应用配置文件名
pub const APP_CONFIG_FILE: &str = "app-config.json";

/// 获取应用数据目录的绝对路径
///
/// 本地设置、未登录时的工件、设置快速缓存和登录会话都保存在这里。
/// 使用 `dirs` crate 获取跨平台的主目录路径。
///
/// # 返回值
/// 返回 `~/.text2mindmap/` 目录的绝对路径。
///
/// # 错误
/// 如果无法确定用户主目录（极端情况，如无 HOME 环境变量），返回错误信息。
///
/// # 示例
/// - Windows: `C:\Users\username\.text2mindmap`
/// - Linux/macOS: `/home/username/.text2mindmap`
pub fn get_app_data_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "无法获取用户主目录".to_string())?;
    Ok(home.join(".text2mindmap"))
}

/// 获取应用配置文件的绝对路径
pub fn get_app_config_path() -> Result<PathBuf, String> {
    Ok(get_app_data_path()?.join(APP_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_lives_in_data_dir() {
        if let (Ok(data), Ok(config)) = (get_app_data_path(), get_app_config_path()) {
            assert!(data.ends_with(".text2mindmap"));
            assert_eq!(config.parent(), Some(data.as_path()));
        }
    }
}
