//! MySQL option files. The `[client]` group is read from every file in order,
//! then `[client<suffix>]` is layered on top when a group suffix is given.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use tracing::{debug, warn};

use crate::error::ProfilerError;
use crate::source::ConnectionOptions;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;

type Groups = HashMap<String, HashMap<String, Option<String>>>;

/// Connection settings from one layer: CLI flags, option files or the login
/// environment. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ClientOptions {
    /// Fields set on `self` win over `lower`.
    pub fn or(self, lower: ClientOptions) -> ClientOptions {
        ClientOptions {
            host: self.host.or(lower.host),
            port: self.port.or(lower.port),
            user: self.user.or(lower.user),
            password: self.password.or(lower.password),
        }
    }

    pub fn into_connection_options(self) -> ConnectionOptions {
        ConnectionOptions {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            user: self.user.unwrap_or_default(),
            password: self.password,
        }
    }

    fn from_group(group: &HashMap<String, Option<String>>) -> Result<Self, ProfilerError> {
        let value = |key: &str| {
            group
                .get(key)
                .and_then(|value| value.as_deref())
                .map(unquote)
        };

        let port = value("port")
            .map(|port| {
                port.parse::<u16>().map_err(|_| {
                    ProfilerError::Configuration(format!("invalid port in option file: {port}"))
                })
            })
            .transpose()?;

        // The client library connects through the socket when the host is
        // local; a Unix socket path in `host` means the same here.
        let host = match (value("host"), value("socket")) {
            (None, Some(socket)) => Some(socket),
            (Some(host), Some(socket)) if host == DEFAULT_HOST => Some(socket),
            (host, _) => host,
        };

        Ok(Self {
            host,
            port,
            user: value("user"),
            password: value("password"),
        })
    }
}

/// `~/.my.cnf`, then the extra file if it exists.
pub fn option_file_paths(extra_file: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".my.cnf"));
    }
    if let Some(extra) = extra_file {
        if extra.is_file() {
            paths.push(extra.to_path_buf());
        } else {
            warn!(path = %extra.display(), "extra option file does not exist");
        }
    }
    paths
}

/// Missing files are skipped; a file that exists but cannot be parsed is a
/// configuration error.
pub fn read_option_files(
    paths: &[PathBuf],
    group_suffix: Option<&str>,
) -> Result<ClientOptions, ProfilerError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.is_file() {
            debug!(path = %path.display(), "option file not found, skipping");
            continue;
        }
        let groups = Ini::new().load(path).map_err(|err| {
            ProfilerError::Configuration(format!(
                "cannot read option file {}: {err}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "read option file");
        files.push(groups);
    }

    let mut options = merge_group(&files, "client")?;
    if let Some(suffix) = group_suffix.filter(|suffix| !suffix.is_empty()) {
        let group = format!("client{suffix}").to_lowercase();
        options = merge_group(&files, &group)?.or(options);
    }
    Ok(options)
}

/// Later files override earlier ones.
fn merge_group(files: &[Groups], name: &str) -> Result<ClientOptions, ProfilerError> {
    let mut options = ClientOptions::default();
    for groups in files {
        if let Some(group) = groups.get(name) {
            options = ClientOptions::from_group(group)?.or(options);
        }
    }
    Ok(options)
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_the_client_group() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "my.cnf",
            "[mysqld]\nport = 3307\n\n[client]\nhost = db.internal\nport = 3310\nuser = app\npassword = \"s3cret\"\nskip-ssl\n",
        );

        let options = read_option_files(&[path], None).unwrap();
        assert_eq!(
            options,
            ClientOptions {
                host: Some("db.internal".to_string()),
                port: Some(3310),
                user: Some("app".to_string()),
                password: Some("s3cret".to_string()),
            }
        );
    }

    #[test]
    fn group_suffix_overrides_the_client_group() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "my.cnf",
            "[client]\nhost = primary\nuser = app\n\n[client_replica]\nhost = replica\n",
        );

        let options = read_option_files(&[path.clone()], Some("_replica")).unwrap();
        assert_eq!(options.host.as_deref(), Some("replica"));
        assert_eq!(options.user.as_deref(), Some("app"));

        let options = read_option_files(&[path], Some("_missing")).unwrap();
        assert_eq!(options.host.as_deref(), Some("primary"));
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let home = write(&dir, "home.cnf", "[client]\nuser = me\npassword = one\n");
        let extra = write(&dir, "extra.cnf", "[client]\npassword = two\n");

        let options = read_option_files(&[home, extra], None).unwrap();
        assert_eq!(options.user.as_deref(), Some("me"));
        assert_eq!(options.password.as_deref(), Some("two"));
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = write(&dir, "my.cnf", "[client]\nuser = app\n");
        let missing = dir.path().join("nope.cnf");

        let options = read_option_files(&[missing, present], None).unwrap();
        assert_eq!(options.user.as_deref(), Some("app"));
        assert_eq!(read_option_files(&[], None).unwrap(), ClientOptions::default());
    }

    #[test]
    fn socket_is_used_for_local_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "my.cnf",
            "[client]\nhost = localhost\nsocket = /var/run/mysqld/mysqld.sock\n",
        );
        let options = read_option_files(&[path], None).unwrap();
        assert_eq!(options.host.as_deref(), Some("/var/run/mysqld/mysqld.sock"));

        let path = write(
            &dir,
            "remote.cnf",
            "[client]\nhost = db.internal\nsocket = /tmp/mysql.sock\n",
        );
        let options = read_option_files(&[path], None).unwrap();
        assert_eq!(options.host.as_deref(), Some("db.internal"));
    }

    #[test]
    fn invalid_port_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "my.cnf", "[client]\nport = mysql\n");

        let err = read_option_files(&[path], None).unwrap_err();
        assert!(matches!(err, ProfilerError::Configuration(_)), "{err}");
    }

    #[test]
    fn explicit_flags_override_the_option_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "my.cnf",
            "[client]\nhost = db.internal\nport = 3310\nuser = app\npassword = filepw\n",
        );
        let from_files = read_option_files(&[path], None).unwrap();
        let flags = ClientOptions {
            user: Some("admin".to_string()),
            port: Some(3320),
            ..ClientOptions::default()
        };
        let login = ClientOptions {
            user: Some("login".to_string()),
            ..ClientOptions::default()
        };

        let resolved = flags.or(from_files).or(login).into_connection_options();
        assert_eq!(
            resolved,
            ConnectionOptions {
                host: "db.internal".to_string(),
                port: 3320,
                user: "admin".to_string(),
                password: Some("filepw".to_string()),
            }
        );
    }

    #[test]
    fn unset_options_fall_back_to_defaults() {
        let login = ClientOptions {
            user: Some("login".to_string()),
            ..ClientOptions::default()
        };
        let resolved = ClientOptions::default().or(login).into_connection_options();
        assert_eq!(
            resolved,
            ConnectionOptions {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                user: "login".to_string(),
                password: None,
            }
        );
    }

    #[test]
    fn extra_file_is_listed_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let extra = write(&dir, "extra.cnf", "[client]\n");

        let paths = option_file_paths(Some(&extra));
        assert_eq!(paths.last(), Some(&extra));

        let missing = dir.path().join("missing.cnf");
        assert!(!option_file_paths(Some(&missing)).contains(&missing));
    }
}
