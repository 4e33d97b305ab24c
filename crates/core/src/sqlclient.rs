use std::collections::BTreeMap;
use std::path::PathBuf;

use url::Url;

use crate::{Result, UserError};

/// Drivers the URL grammar recognizes. Whether a driver is compiled into
/// the binary is the registry's concern, not the parser's.
const KNOWN_DRIVERS: &[&str] = &[
    "mysql",
    "mariadb",
    "postgres",
    "postgresql",
    "sqlite3",
    "mssql",
    "sqlserver",
    "tidb",
    "spanner",
    "clickhouse",
    "docker",
];

/// A parsed target URL:
/// `<driver>[+<subdriver>]://[user[:pass]@]<host>[:port]/<database>[?query]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    pub driver: String,
    pub subdriver: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: String,
    pub query: BTreeMap<String, String>,
    pub raw: String,
}

impl TargetUrl {
    /// The scheme key the driver registry resolves: mariadb and tidb ride
    /// the mysql driver, postgresql is an alias of postgres.
    pub fn registry_key(&self) -> &str {
        match self.driver.as_str() {
            "mariadb" | "tidb" => "mysql",
            "postgresql" => "postgres",
            "sqlserver" => "mssql",
            other => other,
        }
    }
}

pub fn parse_target_url(raw: &str) -> Result<TargetUrl> {
    let url = Url::parse(raw).map_err(|e| UserError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = url.scheme();
    let (driver, subdriver) = match scheme.split_once('+') {
        Some((driver, sub)) => (driver.to_string(), Some(sub.to_string())),
        None => (scheme.to_string(), None),
    };
    if !KNOWN_DRIVERS.contains(&driver.as_str()) {
        return Err(UserError::UnknownDriver { scheme: driver }.into());
    }

    // sqlite3 paths and docker image references are not host/database
    // pairs; the whole remainder is the payload.
    let database = if matches!(driver.as_str(), "sqlite3" | "docker") {
        format!("{}{}", url.host_str().unwrap_or_default(), url.path())
    } else {
        url.path().trim_start_matches('/').to_string()
    };
    let mut query = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        query.insert(k.into_owned(), v.into_owned());
    }

    Ok(TargetUrl {
        driver,
        subdriver,
        user: (!url.username().is_empty()).then(|| url.username().to_string()),
        password: url.password().map(str::to_string),
        host: url.host_str().map(str::to_string),
        port: url.port(),
        database,
        query,
        raw: raw.to_string(),
    })
}

/// A migration-directory URL: `file://<path>[?version=<v>]`. The version
/// query truncates the directory view at that version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirUrl {
    pub path: PathBuf,
    pub version_limit: Option<String>,
}

pub fn parse_dir_url(raw: &str) -> Result<DirUrl> {
    let url = Url::parse(raw).map_err(|e| UserError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.scheme() != "file" {
        return Err(UserError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported directory scheme {:?}", url.scheme()),
        }
        .into());
    }

    // Accept both file:///abs/path and the relative file://path form.
    let mut path = String::new();
    if let Some(host) = url.host_str() {
        path.push_str(host);
    }
    path.push_str(url.path());

    let version_limit = url
        .query_pairs()
        .find(|(k, _)| k == "version")
        .map(|(_, v)| v.into_owned());

    Ok(DirUrl {
        path: PathBuf::from(path),
        version_limit,
    })
}
