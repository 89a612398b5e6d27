//! # Portmap State 模块
//!
//! 配置状态仓库：唯一持有全部状态切片的对象，所有变更都经过它的方法。
//!
//! ## 组成
//!
//! - `slice`：可订阅的状态切片（当前值 + 按变更顺序推送的后续值）
//! - `registry`：映射去重与按服务器统计映射端口数
//! - `store`：[`ConfigurationStore`]，变更方法与快照持久化
//! - `error`：仓库错误
//!
//! ## 约束
//!
//! - 单写者：变更方法在仓库级互斥锁内同步执行到底，切片推送顺序与变更顺序一致
//! - 每次变更后整体写入一次快照；写入失败不影响内存状态
//! - 服务器的 `total_mapped_ports` 只由仓库重算
//! - 仓库通过 `Arc<ConfigurationStore>` 显式传递，`teardown` 断开全部订阅

pub mod error;
pub mod registry;
pub mod slice;
pub mod store;

pub use error::StateError;
pub use slice::{Slice, SliceView, Subscription};
pub use store::{ConfigurationStore, ImportReport};
