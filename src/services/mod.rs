//! # 业务逻辑服务模块
//!
//! 包含核心业务逻辑的实现，与 Tauri command 层解耦：
//! - `prompts` - 思维导图、论文笔记与代码块修复的系统提示词
//! - `llm` - OpenAI 兼容的 chat/completions 客户端
//! - `repair` - 围栏剥离与代码块修复启发式
//! - `pipeline` - 生成流水线：按模式调用模型、解析输出、修复笔记
//! - `crypto` - 与 CryptoJS 口令格式兼容的凭据加解密
//! - `file_store` - 键值 JSON 文件存储：原子写入 + 备份回退
//! - `settings_cache` - 设置的进程缓存与快速缓存镜像
//! - `identity` - 身份提供者与 Supabase 认证会话
//! - `storage` - 本地/远程存储后端与按身份解析的持久化层
//! - `app_config` - 部署配置（Supabase、加密密钥、数据目录）
//! - `state` - 组装以上服务的应用全局状态

pub mod app_config;
pub mod crypto;
pub mod file_store;
pub mod identity;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod repair;
pub mod settings_cache;
pub mod state;
pub mod storage;
