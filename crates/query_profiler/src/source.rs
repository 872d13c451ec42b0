use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Opts, OptsBuilder, Pool, Row};
use tracing::{debug, warn};

use crate::error::ProfilerError;

pub const PROCESSLIST_QUERY: &str = "SHOW FULL PROCESSLIST";

#[async_trait]
pub trait QuerySource {
    /// Text of every query currently executing on the server.
    async fn fetch_active_queries(&mut self) -> Result<Vec<String>, ProfilerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Hostname, or a Unix socket path when it starts with `/`.
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
}

impl ConnectionOptions {
    fn to_opts(&self) -> Opts {
        let builder = OptsBuilder::default()
            .user(Some(self.user.clone()))
            .pass(self.password.clone());
        let builder = if self.host.starts_with('/') {
            builder.socket(Some(self.host.clone()))
        } else {
            builder.ip_or_hostname(self.host.clone()).tcp_port(self.port)
        };
        builder.into()
    }

    /// Connection target for log lines; never includes the password.
    pub fn describe(&self) -> String {
        if self.host.starts_with('/') {
            format!("{}@unix:{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }
}

pub struct MySqlSource {
    pool: Pool,
}

impl MySqlSource {
    /// Opens the pool and proves the server is reachable. Failing here is a
    /// startup error, not a per-cycle one.
    pub async fn connect(options: &ConnectionOptions) -> Result<Self, ProfilerError> {
        let pool = Pool::new(options.to_opts());
        let conn = pool.get_conn().await.map_err(|err| {
            ProfilerError::Configuration(format!(
                "cannot connect to {}: {err}",
                options.describe()
            ))
        })?;
        drop(conn);
        Ok(Self { pool })
    }

    pub async fn disconnect(self) {
        if let Err(err) = self.pool.disconnect().await {
            warn!(error = %err, "failed to close connection pool cleanly");
        }
    }
}

#[async_trait]
impl QuerySource for MySqlSource {
    async fn fetch_active_queries(&mut self) -> Result<Vec<String>, ProfilerError> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<Row> = conn.query(PROCESSLIST_QUERY).await?;

        let queries = processlist_queries(&rows);
        debug!(rows = rows.len(), queries = queries.len(), "fetched processlist");
        Ok(queries)
    }
}

/// Rows that cannot be decoded are logged and skipped; the rest still count.
fn processlist_queries(rows: &[Row]) -> Vec<String> {
    let mut queries = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match processlist_info(index, row) {
            Ok(Some(info)) => queries.push(info),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "skipping processlist row"),
        }
    }
    queries
}

fn processlist_info(index: usize, row: &Row) -> Result<Option<String>, ProfilerError> {
    match row.get_opt::<Option<String>, _>("Info") {
        Some(Ok(info)) => Ok(info.filter(|info| is_profiled_query(info))),
        Some(Err(err)) => Err(ProfilerError::RowDecode {
            row: index,
            message: err.to_string(),
        }),
        None => Err(ProfilerError::RowDecode {
            row: index,
            message: "missing Info column".to_string(),
        }),
    }
}

/// Empty sessions and our own polling query are not workload.
pub fn is_profiled_query(info: &str) -> bool {
    !info.is_empty() && info != PROCESSLIST_QUERY
}
