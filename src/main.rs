//! # text2mindmap - Tauri 桌面应用原生入口点
//!
//! 仅负责启动应用，插件注册、状态初始化和 command 注册都在 `app_lib::run()` 中完成。

// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    app_lib::run();
}
