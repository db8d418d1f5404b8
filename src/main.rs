use std::{process, sync::Arc, time::Duration};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        authors::AuthorService,
        error::AppError,
        feed::FeedService,
        follow::FollowService,
        groups::{GroupDraft, GroupService},
        pagination::Paginator,
        posts::PostService,
    },
    cache::{CacheConfig, PageCache, SystemClock},
    config::{self, AuthorCommand, GroupCommand},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};

const SOURCE: &str = "yatube::main";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Author(command) => run_author(settings, command).await,
        config::Command::Group(command) => run_group(settings, command).await,
    }
}

async fn connect(settings: &config::Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn migrate(repositories: &PostgresRepositories) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = connect(&settings).await?;
    migrate(&repositories).await?;
    info!(target = SOURCE, "database migrations applied");
    Ok(())
}

async fn run_author(settings: config::Settings, command: AuthorCommand) -> Result<(), AppError> {
    let repositories = connect(&settings).await?;
    let authors = AuthorService::new(repositories.clone(), repositories);

    match command {
        AuthorCommand::Add(args) => {
            let author = authors.register(&args.username).await?;
            println!("Registered author {} ({})", author.username, author.id);
        }
        AuthorCommand::Remove(args) => {
            let author = authors.remove(&args.username).await?;
            println!("Removed author {}", author.username);
        }
    }
    Ok(())
}

async fn run_group(settings: config::Settings, command: GroupCommand) -> Result<(), AppError> {
    let repositories = connect(&settings).await?;
    let groups = GroupService::new(repositories.clone(), repositories);

    match command {
        GroupCommand::Add(args) => {
            let group = groups
                .create_group(GroupDraft {
                    title: args.title,
                    slug: args.slug,
                    description: args.description,
                })
                .await?;
            println!("Created group {} ({})", group.title, group.slug);
        }
        GroupCommand::Remove(args) => {
            let group = groups.delete_group(&args.slug).await?;
            println!("Deleted group {}", group.slug);
        }
    }
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = connect(&settings).await?;
    migrate(&repositories).await?;

    let state = build_http_state(repositories, &settings);
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        target = SOURCE,
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = SOURCE, "server stopped");
    Ok(())
}

fn build_http_state(repositories: Arc<PostgresRepositories>, settings: &config::Settings) -> HttpState {
    let paginator = Paginator::new(settings.pagination.page_size);

    let feed = FeedService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        paginator,
    );
    let follows = FollowService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    );
    let posts = PostService::new(
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
        repositories.clone(),
    );

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = cache_config
        .enabled
        .then(|| Arc::new(PageCache::new(&cache_config, Arc::new(SystemClock))));

    HttpState {
        feed: Arc::new(feed),
        follows: Arc::new(follows),
        posts: Arc::new(posts),
        authors: repositories.clone(),
        auth: Arc::new(settings.auth.clone()),
        db: repositories,
        cache,
    }
}

/// Resolve on Ctrl-C. In-flight requests get `grace` to finish before the
/// process exits regardless.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = SOURCE, error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!(
        target = SOURCE,
        grace_seconds = grace.as_secs(),
        "shutdown requested; draining connections"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target = SOURCE, "graceful shutdown timed out");
        process::exit(1);
    });
}
