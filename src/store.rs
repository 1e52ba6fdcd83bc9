//! The data-layer collaborator that connections open and close.
//!
//! The lifecycle only needs a capability that can be asked to open and close a
//! target and that reports the result asynchronously. Models use the same
//! capability to persist documents.
//!
//! 连接打开和关闭的数据层协作者。
//!
//! 生命周期只需要一个可以打开和关闭目标、并异步报告结果的能力。
//! 模型使用同一个能力来持久化文档。

use crate::{core::target::ConnectionTarget, error::Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

mod memory;
mod model;

pub use memory::MemoryStore;
pub use model::Model;

/// A stored document.
/// 存储的文档。
pub type Document = Map<String, Value>;

/// An asynchronous data-layer interface.
///
/// This trait allows swapping the storage behind the simulated connections,
/// for example to inject failures in tests.
///
/// 异步数据层接口。
///
/// 此trait允许替换模拟连接背后的存储，例如在测试中注入故障。
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Opens the database addressed by `target`.
    async fn open(&self, target: &ConnectionTarget) -> Result<()>;

    /// Closes the database addressed by `target`.
    async fn close(&self, target: &ConnectionTarget) -> Result<()>;

    /// Appends a document to a collection and returns the stored document.
    async fn insert(&self, database: &str, collection: &str, document: Document) -> Result<Document>;

    /// Returns the number of documents in a collection.
    async fn count(&self, database: &str, collection: &str) -> Result<usize>;
}
