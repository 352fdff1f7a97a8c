//! # 数据模型模块
//!
//! 定义了与前端类型一一对应的 Rust 数据结构。
//! 所有结构体均派生 `Serialize` 和 `Deserialize`，用于 IPC 传输和 JSON 文件读写。
//! - `mindmap` - 思维导图、流程步骤与论文笔记文档
//! - `artifact` - 持久化工件及其创建/更新载荷
//! - `settings` - 用户设置
//! - `generation` - 生成请求与结果

pub mod artifact;
pub mod generation;
pub mod mindmap;
pub mod settings;
