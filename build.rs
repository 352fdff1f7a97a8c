//! # text2mindmap - Cargo 构建脚本
//!
//! 仅在启用 `desktop` feature 时执行 Tauri 的构建前处理：
//! - 生成 Tauri 运行时所需的资源绑定代码
//! - 处理应用图标、权限清单等静态资源
//!
//! 核心库（生成流水线与持久化层）不依赖 Tauri，默认构建时此脚本为空操作。

/// 构建脚本入口函数
fn main() {
    #[cfg(feature = "desktop")]
    tauri_build::build()
}
