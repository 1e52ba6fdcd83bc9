#![deny(clippy::expect_used, clippy::unwrap_used)]

//! An in-process stand-in for a document-database driver's connection
//! lifecycle, so code written against the driver API runs in tests without a
//! live database.
//!
//! 文档数据库驱动连接生命周期的进程内替身，使针对驱动API编写的代码无需真实数据库即可在测试中运行。
//!
//! ```no_run
//! use mockgoose::{EventKind, Session};
//!
//! # async fn demo() -> mockgoose::Result<()> {
//! let session = Session::new();
//! let connection = session.connect("mongodb://localhost:27017/blah");
//! connection.on(EventKind::Open, |conn, _event| {
//!     assert_eq!(conn.ready_state().code(), 1);
//! });
//! connection.opened().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod session;
pub mod store;

pub use config::{Config, LifecycleConfig, TargetDefaults};
pub use connection::Connection;
pub use crate::core::{
    events::{ConnectionEvent, EventKind, ListenerId, ListenerMode},
    state::ReadyState,
    target::{ConnectArgs, ConnectionTarget, Options, PortArg},
};
pub use error::{Error, Result};
pub use session::{Session, SessionBuilder};
pub use store::{DataStore, Document, MemoryStore, Model};
