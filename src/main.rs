use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use webkomik::app::AppError;
use webkomik::config::normalize_base_url;
use webkomik::net::http::ApiError;
use webkomik::net::types::ComicInput;
use webkomik::router::{NavigationError, RouteMatch};
use webkomik::state::auth::{AuthState, SignUpOutcome};
use webkomik::{App, AppConfig};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("startup failed: {0}")]
    App(#[from] AppError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("request failed: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Catalogue(String),
    #[error("invalid comic id `{0}`")]
    InvalidComicId(String),
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "webkomik", about = "Webkomik comics catalogue client")]
struct Cli {
    #[arg(long, env = "API_BASE_URL")]
    api_base_url: Option<String>,

    #[arg(long, env = "WEBKOMIK_SESSION_FILE", default_value = ".webkomik-session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the current session.
    Session,
    Login(Credentials),
    Register(Credentials),
    Logout,
    /// Navigate to a client route and print what it shows.
    Open {
        path: String,
    },
    Comics(ComicsCommand),
}

#[derive(Args, Debug)]
struct Credentials {
    email: String,
    #[arg(long, env = "WEBKOMIK_PASSWORD")]
    password: String,
}

#[derive(Args, Debug)]
struct ComicsCommand {
    #[command(subcommand)]
    command: ComicsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ComicsSubcommand {
    List,
    Show {
        id: i64,
    },
    Create {
        title: String,
        #[command(flatten)]
        fields: ComicFields,
    },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: ComicFields,
    },
}

#[derive(Args, Debug)]
struct ComicFields {
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    author_name: Option<String>,
    #[arg(long)]
    genre_id: Option<i64>,
    #[arg(long)]
    cover_image_url: Option<String>,
}

impl ComicFields {
    fn into_input(self, title: Option<String>) -> ComicInput {
        ComicInput {
            title,
            description: self.description,
            author_name: self.author_name,
            genre_id: self.genre_id,
            cover_image_url: self.cover_image_url,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(url) = cli.api_base_url.as_deref() {
        config.api_base_url = normalize_base_url(Some(url));
    }
    config.session_file = Some(cli.session_file);

    let app = App::new(&config)?;
    match cli.command {
        Command::Session => run_session(&app).await,
        Command::Login(creds) => run_login(&app, creds).await,
        Command::Register(creds) => run_register(&app, creds).await,
        Command::Logout => run_logout(&app).await,
        Command::Open { path } => run_open(&app, &path).await,
        Command::Comics(comics) => run_comics(&app, comics).await,
    }
}

async fn run_session(app: &App) -> Result<(), CliError> {
    app.session.fetch_session().await;
    let state = app.session.snapshot();
    print_json(&auth_summary(&state))?;
    auth_result(&state)
}

async fn run_login(app: &App, creds: Credentials) -> Result<(), CliError> {
    app.session.login(&creds.email, &creds.password).await;
    let state = app.session.snapshot();
    print_json(&auth_summary(&state))?;
    auth_result(&state)?;
    print_location(app);
    Ok(())
}

async fn run_register(app: &App, creds: Credentials) -> Result<(), CliError> {
    let outcome = app.session.sign_up(&creds.email, &creds.password).await;
    let state = app.session.snapshot();
    if let Some(notice) = &state.notice {
        eprintln!("{notice}");
    }
    print_json(&auth_summary(&state))?;
    if outcome == SignUpOutcome::Failed {
        return auth_result(&state);
    }
    print_location(app);
    Ok(())
}

async fn run_logout(app: &App) -> Result<(), CliError> {
    app.session.fetch_session().await;
    app.session.logout().await;
    print_json(&auth_summary(&app.session.snapshot()))?;
    print_location(app);
    Ok(())
}

async fn run_open(app: &App, path: &str) -> Result<(), CliError> {
    let landed = app.router.navigate(path).await?;
    if landed.full_path != path {
        eprintln!("redirected to {}", landed.full_path);
    }

    match landed.route.name {
        "Home" => list_comics(app).await,
        "ComicDetail" => {
            let raw = landed.param("id").unwrap_or_default();
            let id = raw.parse::<i64>().map_err(|_| CliError::InvalidComicId(raw.to_owned()))?;
            show_comic(app, id).await
        }
        _ => print_json(&route_summary(&landed, &app.session.snapshot())),
    }
}

async fn run_comics(app: &App, comics: ComicsCommand) -> Result<(), CliError> {
    match comics.command {
        ComicsSubcommand::List => list_comics(app).await,
        ComicsSubcommand::Show { id } => show_comic(app, id).await,
        ComicsSubcommand::Create { title, fields } => {
            app.session.fetch_session().await;
            let input = fields.into_input(Some(title));
            match app.catalogue.create_new_comic(&input).await {
                Ok(comic) => print_json(&json!(comic)),
                Err(_) => Err(catalogue_error(app)),
            }
        }
        ComicsSubcommand::Update { id, title, fields } => {
            app.session.fetch_session().await;
            let input = fields.into_input(title);
            match app.catalogue.update_existing_comic(id, &input).await {
                Ok(comic) => print_json(&json!(comic)),
                Err(_) => Err(catalogue_error(app)),
            }
        }
    }
}

async fn list_comics(app: &App) -> Result<(), CliError> {
    app.catalogue.fetch_all_comics().await;
    let state = app.catalogue.snapshot();
    if state.error.is_some() {
        return Err(catalogue_error(app));
    }
    print_json(&json!(state.comics))
}

async fn show_comic(app: &App, id: i64) -> Result<(), CliError> {
    app.catalogue.fetch_comic_by_id(id).await;
    let state = app.catalogue.snapshot();
    if state.error.is_some() {
        return Err(catalogue_error(app));
    }
    print_json(&json!(state.current_comic))
}

fn catalogue_error(app: &App) -> CliError {
    CliError::Catalogue(app.catalogue.snapshot().error.unwrap_or_default())
}

fn auth_result(state: &AuthState) -> Result<(), CliError> {
    match &state.error {
        Some(message) => Err(CliError::Auth(message.clone())),
        None => Ok(()),
    }
}

fn auth_summary(state: &AuthState) -> Value {
    json!({
        "authenticated": state.is_authenticated(),
        "admin": state.is_admin(),
        "email": state.user_email(),
        "user_id": state.user_id(),
        "role": state.role.as_ref().map(ToString::to_string),
        "error": state.error,
    })
}

fn route_summary(landed: &RouteMatch, state: &AuthState) -> Value {
    json!({
        "route": landed.route.name,
        "path": landed.full_path,
        "authenticated": state.is_authenticated(),
        "admin": state.is_admin(),
    })
}

fn print_location(app: &App) {
    if let Some(current) = app.router.current() {
        eprintln!("now at {}", current.full_path);
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
