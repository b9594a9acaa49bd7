use std::env;
use std::str::FromStr;
use std::time::Duration;

use fieldgate_application::PermissionServiceConfig;
use fieldgate_core::AppError;
use fieldgate_domain::{AccessLevel, Operation, RoleName};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Migrate,
    Bootstrap,
    Resolve {
        operation: Operation,
        roles: Vec<RoleName>,
    },
}

impl Command {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, AppError> {
        let mut args = args.into_iter();

        match args.next().as_deref() {
            None | Some("bootstrap") => Ok(Self::Bootstrap),
            Some("migrate") => Ok(Self::Migrate),
            Some("resolve") => {
                let (Some(access_level), Some(entity_type)) = (args.next(), args.next()) else {
                    return Err(AppError::Validation(
                        "usage: resolve <access_level> <EntityType> [ROLE...]".to_owned(),
                    ));
                };

                let operation =
                    Operation::new(AccessLevel::from_str(access_level.as_str())?, entity_type)?;
                let roles = args.collect::<Vec<_>>();
                let roles = RoleName::parse_all(roles.iter().map(String::as_str))?;

                Ok(Self::Resolve { operation, roles })
            }
            Some(other) => Err(AppError::Validation(format!(
                "unknown command '{other}', expected 'migrate', 'bootstrap' or 'resolve'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub command: Command,
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_timeout: Duration,
    pub permission_policy_path: Option<String>,
    pub entity_descriptors_path: Option<String>,
}

impl BootstrapConfig {
    pub fn load() -> Result<Self, AppError> {
        let command = Command::parse(env::args().skip(1))?;

        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(10);
        let store_timeout = env::var("PERMISSION_STORE_TIMEOUT_MS")
            .ok()
            .map(|value| {
                value.parse::<u64>().map_err(|error| {
                    AppError::Validation(format!("invalid PERMISSION_STORE_TIMEOUT_MS: {error}"))
                })
            })
            .transpose()?
            .map_or(
                PermissionServiceConfig::default().store_timeout,
                Duration::from_millis,
            );

        Ok(Self {
            command,
            database_url,
            database_max_connections,
            store_timeout,
            permission_policy_path: optional_env("PERMISSION_POLICY_PATH"),
            entity_descriptors_path: optional_env("ENTITY_DESCRIPTORS_PATH"),
        })
    }

    pub fn service_config(&self) -> PermissionServiceConfig {
        PermissionServiceConfig {
            store_timeout: self.store_timeout,
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
