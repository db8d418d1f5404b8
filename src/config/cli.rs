use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the yatube binary.
#[derive(Debug, Parser)]
#[command(name = "yatube", version, about = "Yatube blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "YATUBE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
    /// Manage authors on behalf of the identity provider.
    #[command(subcommand)]
    Author(AuthorCommand),
    /// Manage post groups.
    #[command(subcommand)]
    Group(GroupCommand),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the number of posts per page.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Toggle the home page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override how long a cached home page stays fresh.
    #[arg(long = "cache-home-ttl-seconds", value_name = "SECONDS")]
    pub cache_home_ttl_seconds: Option<u64>,

    /// Override the request header carrying the authenticated username.
    #[arg(long = "auth-viewer-header", value_name = "HEADER")]
    pub auth_viewer_header: Option<String>,

    /// Override the login page anonymous visitors are sent to.
    #[arg(long = "auth-login-url", value_name = "URL")]
    pub auth_login_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Subcommand, Clone)]
pub enum AuthorCommand {
    /// Register a new author.
    Add(AuthorArgs),
    /// Remove an author together with their posts, comments and follows.
    Remove(AuthorArgs),
}

#[derive(Debug, Args, Clone)]
pub struct AuthorArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Username as known to the identity provider.
    #[arg(value_name = "USERNAME")]
    pub username: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum GroupCommand {
    /// Create a group.
    Add(GroupAddArgs),
    /// Delete a group; its posts are kept without a group.
    Remove(GroupRemoveArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GroupAddArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Human-readable title.
    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Explicit slug; derived from the title when omitted.
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,

    /// Group description.
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,
}

#[derive(Debug, Args, Clone)]
pub struct GroupRemoveArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(value_name = "SLUG")]
    pub slug: String,
}

impl Command {
    /// Database override carried by the subcommand.
    pub fn database_override(&self) -> &DatabaseOverride {
        match self {
            Command::Serve(args) => &args.overrides.database,
            Command::Migrate(args) => &args.database,
            Command::Author(AuthorCommand::Add(args) | AuthorCommand::Remove(args)) => {
                &args.database
            }
            Command::Group(GroupCommand::Add(args)) => &args.database,
            Command::Group(GroupCommand::Remove(args)) => &args.database,
        }
    }
}
