//! GB Green Guide CLI - shop the catalog from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password may also come from GBG_PASSWORD)
//! gbg login -e karim@example.com -p hunter22
//!
//! # Browse
//! gbg products --search apricot
//! gbg gallery --search hunza
//!
//! # Manage the cart
//! gbg cart add 12 -q 2
//! gbg cart set 12 3
//! gbg cart show
//!
//! # Place a cash-on-delivery order
//! gbg checkout --city Gilgit --address "Jutial Road 4" --notes "Call on arrival"
//! ```
//!
//! Configuration is read from the environment (and `.env`); see
//! `ClientConfig::from_env` for the variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gb_green_guide_client::config::ClientConfig;
use gb_green_guide_client::state::AppContext;
use gb_green_guide_client::ClientError;
use gb_green_guide_core::ProductId;

mod commands;

#[derive(Parser)]
#[command(name = "gbg")]
#[command(author, version, about = "GB Green Guide shop client")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "GBG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "GBG_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Log out and forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place a cash-on-delivery order for the current cart
    Checkout(commands::checkout::CheckoutArgs),
    /// List products
    Products {
        /// Filter by name or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Browse place photos
    Gallery {
        /// Filter by place, city or caption
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List reviews for a product
    Reviews {
        /// Product id
        product: ProductId,
    },
    /// Review a product
    Review {
        /// Product id
        product: ProductId,

        /// Stars, 1 to 5
        #[arg(short, long)]
        rating: u8,

        #[arg(short, long)]
        comment: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its totals
    Show,
    /// Add a product
    Add {
        /// Product id
        product: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product entirely
    Remove {
        /// Product id
        product: ProductId,
    },
    /// Set a product's quantity (0 removes it)
    Set {
        /// Product id
        product: ProductId,
        quantity: u32,
    },
    /// Empty the cart
    Clear,
}

/// Initialize Sentry error tracking.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// If `SENTRY_DSN` is not configured, returns `None` and Sentry is disabled.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            print_error(&ClientError::from(e));
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays pipeable.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gb_green_guide_client=info,gbg=info".into());
    let json_layer = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!cli.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let ctx = AppContext::new(config);
    let result = run(&ctx, cli.command).await;
    ctx.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stderr)]
fn print_error(err: &ClientError) {
    eprintln!("Error: {}", err.user_message());
}

async fn run(ctx: &AppContext, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Login { email, password } => commands::auth::login(ctx, &email, &password).await,
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
        } => {
            let registration = gb_green_guide_client::auth::Registration {
                email,
                password,
                first_name,
                last_name,
                phone,
            };
            commands::auth::register(ctx, registration).await
        }
        Commands::Logout => {
            commands::auth::logout(ctx).await;
            Ok(())
        }
        Commands::Whoami => commands::auth::whoami(ctx),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(ctx).await,
            CartAction::Add { product, quantity } => {
                commands::cart::add(ctx, product, quantity).await
            }
            CartAction::Remove { product } => commands::cart::remove(ctx, product).await,
            CartAction::Set { product, quantity } => {
                commands::cart::set(ctx, product, quantity).await
            }
            CartAction::Clear => commands::cart::clear(ctx).await,
        },
        Commands::Checkout(args) => commands::checkout::place_order(ctx, args).await,
        Commands::Products { search } => {
            commands::catalog::products(ctx, search.as_deref().unwrap_or_default()).await
        }
        Commands::Gallery { search } => {
            commands::catalog::gallery(ctx, search.as_deref().unwrap_or_default()).await
        }
        Commands::Reviews { product } => commands::catalog::reviews(ctx, product).await,
        Commands::Review {
            product,
            rating,
            comment,
        } => commands::catalog::review(ctx, product, rating, &comment).await,
    }
}
