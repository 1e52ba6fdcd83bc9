//! Model handles bound to a connection or to a session's default connection.
//! 绑定到某个连接或会话默认连接的模型句柄。

use super::Document;
use crate::{
    connection::{Connection, WeakConnection},
    core::lifecycle::StateValidator,
    error::{Error, Result},
    session::registry::ConnectionRegistry,
};
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tracing::debug;

enum ModelBinding {
    /// Session-level model, resolved against the default connection at use.
    /// 会话级模型，使用时解析为默认连接。
    Default(Weak<ConnectionRegistry>),
    Connection(WeakConnection),
}

struct ModelInner {
    name: String,
    collection: String,
    binding: ModelBinding,
}

/// A named handle to a collection.
///
/// The same name always yields the same `Model` within one scope; equality is
/// identity.
///
/// 集合的具名句柄。在同一作用域内相同的名称总是得到同一个 `Model`；相等即同一性。
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    pub(crate) fn registry_key(name: &str) -> String {
        name.to_lowercase()
    }

    fn new(name: &str, binding: ModelBinding) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                name: name.to_string(),
                collection: Self::registry_key(name),
                binding,
            }),
        }
    }

    pub(crate) fn bound_to_default(name: &str, registry: Weak<ConnectionRegistry>) -> Self {
        Self::new(name, ModelBinding::Default(registry))
    }

    pub(crate) fn bound_to_connection(name: &str, connection: WeakConnection) -> Self {
        Self::new(name, ModelBinding::Connection(connection))
    }

    /// The name the model was first defined with.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    /// Resolves the connection this model currently operates on.
    /// 解析此模型当前使用的连接。
    pub fn connection(&self) -> Result<Connection> {
        match &self.inner.binding {
            ModelBinding::Default(registry) => registry
                .upgrade()
                .and_then(|registry| registry.default_connection())
                .ok_or_else(|| Error::ModelUnbound(self.inner.name.clone())),
            ModelBinding::Connection(connection) => {
                connection.upgrade().ok_or(Error::ConnectionClosed)
            }
        }
    }

    async fn ready_connection(&self) -> Result<Connection> {
        let connection = self.connection()?;
        connection
            .opened()
            .await
            .map_err(|err| Error::ConnectionFailed(Box::new(err)))?;
        if !StateValidator::can_operate(connection.ready_state()) {
            return Err(Error::NotConnected);
        }
        Ok(connection)
    }

    fn database(connection: &Connection) -> Result<String> {
        connection
            .target()
            .map(|target| target.database().to_string())
            .ok_or(Error::NotConnected)
    }

    /// Persists a document once the bound connection is open.
    ///
    /// An `_id` is generated when the document has none. Completes with the
    /// stored document, or with the failure of the bound connection.
    ///
    /// 在绑定的连接打开后持久化一个文档。
    ///
    /// 文档没有 `_id` 时会生成一个。完成时返回存储的文档，或绑定连接的失败。
    pub async fn create(&self, document: Value) -> Result<Document> {
        let Value::Object(mut document) = document else {
            return Err(Error::InvalidDocument(self.inner.name.clone()));
        };
        let connection = self.ready_connection().await?;
        let database = Self::database(&connection)?;

        document
            .entry("_id")
            .or_insert_with(|| Value::String(generate_object_id()));
        debug!(conn_id = connection.id(), model = %self.inner.name, "Creating document");

        let store = connection.context().store().clone();
        store.insert(&database, &self.inner.collection, document).await
    }

    /// Counts the documents stored for this model.
    /// 统计此模型存储的文档数量。
    pub async fn count(&self) -> Result<usize> {
        let connection = self.ready_connection().await?;
        let database = Self::database(&connection)?;
        let store = connection.context().store().clone();
        store.count(&database, &self.inner.collection).await
    }
}

fn generate_object_id() -> String {
    rand::random::<[u8; 12]>()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Model {}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let binding = match self.inner.binding {
            ModelBinding::Default(_) => "default",
            ModelBinding::Connection(_) => "connection",
        };
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("collection", &self.inner.collection)
            .field("binding", &binding)
            .finish()
    }
}
