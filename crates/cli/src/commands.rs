//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use examdesk_core::{
    AuthState, Decision, FileStore, RenderTarget, Role, RouteTable, Settings, default_route_for,
    guard,
};
use examdesk_http::ExamdeskClient;
use examdesk_session::{ApiRequest, RequestPipeline, SessionStore, TracingNavigator};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "EXAMDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Evaluate the route guard for a path
    Route {
        /// Requested path, e.g. /admin
        path: String,

        /// Roles allowed on the path; defaults to the application's route map
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<Role>>,
    },

    /// Issue a GET through the authenticated pipeline and print the JSON body
    Get {
        /// API path relative to the base URL, e.g. /examens/
        path: String,

        /// Query parameter as key=value; repeatable
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },

    /// Ask for a password reset code
    RequestReset {
        #[arg(long)]
        email: String,
    },

    /// Set a new password with a reset code
    ResetPassword {
        #[arg(long)]
        email: String,

        #[arg(long, env = "EXAMDESK_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,

        /// Verification code from the reset request
        #[arg(long)]
        code: Option<String>,
    },

    /// Change the password of the logged-in account
    ChangePassword {
        #[arg(long, env = "EXAMDESK_PASSWORD", hide_env_values = true)]
        old_password: String,

        #[arg(long, env = "EXAMDESK_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },

    /// Change the login email; ends the session
    ChangeEmail {
        #[arg(long)]
        new_email: String,

        /// Current password
        #[arg(long, env = "EXAMDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}

/// Session wiring shared by every command
struct AppContext {
    client: ExamdeskClient,
    session: SessionStore,
    pipeline: RequestPipeline,
}

impl AppContext {
    fn new(settings: &Settings) -> Result<Self> {
        let client = ExamdeskClient::from_settings(&settings.api)
            .context("Failed to build HTTP client")?;
        let storage = Arc::new(FileStore::new(settings.storage_path()));
        let session = SessionStore::new(Arc::new(client.clone()), storage);
        let pipeline =
            RequestPipeline::new(client.clone(), session.clone(), Arc::new(TracingNavigator));

        Ok(Self {
            client,
            session,
            pipeline,
        })
    }
}

impl Commands {
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let ctx = AppContext::new(settings)?;
        ctx.session.initialize().await;

        match self {
            Self::Login { email, password } => login(&ctx, &email, &password).await,
            Self::Logout => {
                ctx.session.logout().await;
                println!("Logged out");
                Ok(())
            }
            Self::Whoami => whoami(&ctx.session.state()),
            Self::Route { path, roles } => {
                route(&ctx.session.state(), &path, roles.as_deref());
                Ok(())
            }
            Self::Get { path, query } => get(&ctx, path, query).await,
            Self::RequestReset { email } => {
                let response = ctx.client.request_password_reset(&email).await?;
                println!("{}", response.message);
                if let Some(code) = response.code {
                    println!("Verification code: {code}");
                }
                Ok(())
            }
            Self::ResetPassword {
                email,
                new_password,
                code,
            } => {
                let response = ctx
                    .client
                    .reset_password(&email, &new_password, code.as_deref())
                    .await?;
                println!("{}", response.message);
                Ok(())
            }
            Self::ChangePassword {
                old_password,
                new_password,
            } => {
                let response = ctx
                    .pipeline
                    .change_password(&old_password, &new_password)
                    .await?;
                println!("{}", response.message);
                Ok(())
            }
            Self::ChangeEmail {
                new_email,
                password,
            } => {
                let response = ctx.pipeline.change_email(&new_email, &password).await?;
                println!("{}", response.message);
                println!("Log in again with {new_email}");
                Ok(())
            }
        }
    }
}

async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let identity = ctx.session.login(email, password).await?;
    info!(email = %identity.email, "Session stored");
    println!("Welcome, {}!", identity.display_name);
    println!("Landing page: {}", default_route_for(identity.role));
    Ok(())
}

fn whoami(state: &AuthState) -> Result<()> {
    let Some(identity) = &state.identity else {
        bail!("Not logged in");
    };
    println!("{} <{}>", identity.display_name, identity.email);
    println!("Role: {}", identity.role);
    println!("Landing page: {}", default_route_for(identity.role));
    Ok(())
}

fn route(state: &AuthState, path: &str, roles: Option<&[Role]>) {
    let decision = match roles {
        Some(roles) => guard(state, path, Some(roles)),
        None => RouteTable::default().resolve(state, path),
    };

    match decision {
        Decision::Render(RenderTarget::Loading) => println!("render loading indicator"),
        Decision::Render(RenderTarget::View(view)) => println!("render {view}"),
        Decision::RedirectTo(target) => println!("redirect {target}"),
    }
}

async fn get(ctx: &AppContext, path: String, query: Vec<(String, String)>) -> Result<()> {
    let request = query
        .into_iter()
        .fold(ApiRequest::get(path), |request, (key, value)| {
            request.query(key, value)
        });

    let body: Value = ctx.pipeline.execute(&request).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
