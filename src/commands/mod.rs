//! # Tauri Command 处理模块
//!
//! 本模块包含所有注册到 Tauri 的 command 处理函数，
//! 错误统一以 `String` 返回给前端。每个子模块对应一个功能域：
//! - `generate` - 生成并保存
//! - `settings` - 用户设置的读取与保存
//! - `artifacts` - 工件的列表、读取、更新与删除
//! - `auth` - 登录与登出

pub mod artifacts;
pub mod auth;
pub mod generate;
pub mod settings;
