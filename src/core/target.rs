//! 连接目标与参数规范化
//! Connection targets and argument normalization
//!
//! 工厂入口接受几种固定的调用形式（`ConnectArgs`），本模块是把它们翻译成
//! 唯一规范形式 `ConnectionTarget` 的地方。下游组件只消费规范目标。
//!
//! The factory entry points accept a small set of call shapes (`ConnectArgs`).
//! This module is the single place that translates them into one canonical
//! `ConnectionTarget`; downstream components only consume the canonical form.

use crate::{
    config::TargetDefaults,
    error::{Error, Result},
};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

/// Driver options attached to a connection target.
/// 附加到连接目标上的驱动选项。
pub type Options = Map<String, Value>;

/// A port argument, given either as a number or as text.
/// 端口参数，可以是数字或文本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortArg {
    Number(u16),
    Text(String),
}

impl PortArg {
    fn resolve(&self) -> Result<u16> {
        match self {
            PortArg::Number(port) => Ok(*port),
            PortArg::Text(text) => text
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::InvalidPort(text.clone())),
        }
    }
}

impl From<u16> for PortArg {
    fn from(port: u16) -> Self {
        PortArg::Number(port)
    }
}

impl From<&str> for PortArg {
    fn from(port: &str) -> Self {
        PortArg::Text(port.to_string())
    }
}

impl From<String> for PortArg {
    fn from(port: String) -> Self {
        PortArg::Text(port)
    }
}

/// The accepted call shapes of `connect` / `create_connection`.
///
/// 可接受的 `connect` / `create_connection` 调用形式。
///
/// Later positional components override whatever the URI embeds.
/// 后面的位置参数会覆盖URI中内嵌的值。
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectArgs {
    /// `uri`
    Uri(String),
    /// `uri, database`
    UriDatabase(String, String),
    /// `uri, database, port`
    UriDatabasePort(String, String, PortArg),
    /// `uri, database, port, options`
    UriDatabasePortOptions(String, String, PortArg, Options),
}

impl ConnectArgs {
    /// The raw uri-or-host component, used as the identity of an input that
    /// fails to normalize.
    ///
    /// 原始的 uri 或主机部分，当输入无法规范化时用作其标识。
    pub fn raw_uri(&self) -> &str {
        match self {
            ConnectArgs::Uri(uri)
            | ConnectArgs::UriDatabase(uri, _)
            | ConnectArgs::UriDatabasePort(uri, _, _)
            | ConnectArgs::UriDatabasePortOptions(uri, _, _, _) => uri,
        }
    }

    fn overrides(&self) -> (Option<&str>, Option<&PortArg>, Option<&Options>) {
        match self {
            ConnectArgs::Uri(_) => (None, None, None),
            ConnectArgs::UriDatabase(_, db) => (Some(db), None, None),
            ConnectArgs::UriDatabasePort(_, db, port) => (Some(db), Some(port), None),
            ConnectArgs::UriDatabasePortOptions(_, db, port, options) => {
                (Some(db), Some(port), Some(options))
            }
        }
    }

    /// 规范化为连接目标
    /// Normalizes the arguments into a canonical target.
    pub fn normalize(&self, defaults: &TargetDefaults) -> Result<ConnectionTarget> {
        let raw = self.raw_uri().trim();
        let url = if raw.contains("://") {
            Url::parse(raw)?
        } else {
            Url::parse(&format!("{}://{}", defaults.scheme, raw))?
        };

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(Error::MissingHost(raw.to_string())),
        };

        let embedded_db = url.path().trim_matches('/');
        let embedded_db = (!embedded_db.is_empty()).then(|| embedded_db.to_string());

        let mut options: Options = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();

        let (db_override, port_override, options_override) = self.overrides();

        let database = db_override
            .map(|db| db.trim_matches('/').to_string())
            .filter(|db| !db.is_empty())
            .or(embedded_db)
            .unwrap_or_else(|| defaults.database.clone());

        let port = match port_override {
            Some(port) => port.resolve()?,
            None => url.port().unwrap_or(defaults.port),
        };

        if let Some(explicit) = options_override {
            options.extend(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(ConnectionTarget {
            scheme: url.scheme().to_string(),
            host,
            port,
            database,
            options,
        })
    }
}

impl From<&str> for ConnectArgs {
    fn from(uri: &str) -> Self {
        ConnectArgs::Uri(uri.to_string())
    }
}

impl From<String> for ConnectArgs {
    fn from(uri: String) -> Self {
        ConnectArgs::Uri(uri)
    }
}

impl<U, D> From<(U, D)> for ConnectArgs
where
    U: Into<String>,
    D: Into<String>,
{
    fn from((uri, database): (U, D)) -> Self {
        ConnectArgs::UriDatabase(uri.into(), database.into())
    }
}

impl<U, D, P> From<(U, D, P)> for ConnectArgs
where
    U: Into<String>,
    D: Into<String>,
    P: Into<PortArg>,
{
    fn from((uri, database, port): (U, D, P)) -> Self {
        ConnectArgs::UriDatabasePort(uri.into(), database.into(), port.into())
    }
}

impl<U, D, P> From<(U, D, P, Options)> for ConnectArgs
where
    U: Into<String>,
    D: Into<String>,
    P: Into<PortArg>,
{
    fn from((uri, database, port, options): (U, D, P, Options)) -> Self {
        ConnectArgs::UriDatabasePortOptions(uri.into(), database.into(), port.into(), options)
    }
}

/// The canonical descriptor of a logical connection.
/// 逻辑连接的规范描述符。
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionTarget {
    scheme: String,
    host: String,
    port: u16,
    database: String,
    options: Options,
}

impl ConnectionTarget {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The normalized string form. Two targets with the same key address the
    /// same logical database; options do not take part.
    ///
    /// 规范化的字符串形式。键相同的两个目标指向同一个逻辑数据库；选项不参与比较。
    pub fn key(&self) -> String {
        format!("{}://{}:{}/{}", self.scheme, self.host, self.port, self.database)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
