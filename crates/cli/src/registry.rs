use anyhow::Result;

use atlas_core::{Driver, TargetUrl, UserError, parse_target_url};

pub fn enabled_drivers() -> Vec<&'static str> {
    vec![
        #[cfg(feature = "mysql")]
        "mysql",
        #[cfg(feature = "postgres")]
        "postgres",
        #[cfg(feature = "sqlite")]
        "sqlite3",
    ]
}

/// Resolve a target URL to a connected driver. Recognized schemes without
/// a compiled driver fail as user errors naming the scheme; `docker://`
/// is the container runner's job and is rejected here.
pub fn open(raw: &str) -> Result<(TargetUrl, Box<dyn Driver>)> {
    let url = parse_target_url(raw)?;
    let driver: Box<dyn Driver> = match url.registry_key() {
        #[cfg(feature = "mysql")]
        "mysql" => Box::new(atlas_dialect_mysql::Mysql::connect(&url)?),
        #[cfg(feature = "postgres")]
        "postgres" => Box::new(atlas_dialect_postgres::Postgres::connect(&url)?),
        #[cfg(feature = "sqlite")]
        "sqlite3" => Box::new(atlas_dialect_sqlite::Sqlite::connect(&url)?),
        scheme => {
            return Err(UserError::DriverUnavailable {
                scheme: scheme.to_string(),
            }
            .into());
        }
    };
    Ok((url, driver))
}
