//! pricewatch - track product prices from the terminal.
//!
//! Sign in once; the session token is kept between runs and sent with every
//! request until you log out or the backend stops accepting it.

use std::io::{self, Write};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricewatch_core::auth::TokenStore;
use pricewatch_core::forms::{submit_login, submit_signup, LoginForm, SignupForm, TrackForm};
use pricewatch_core::models::Product;
use pricewatch_core::utils::format::MAX_URL_DISPLAY_LEN;
use pricewatch_core::utils::{format_price, format_timestamp, truncate_string};
use pricewatch_core::{ApiClient, Config, SessionManager};

type Session = SessionManager<ApiClient, Box<dyn TokenStore>>;

#[derive(Parser, Debug)]
#[command(name = "pricewatch", about = "Track product prices and get told when they drop")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "PRICEWATCH_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in to your account
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is signed in
    Whoami {
        /// Print the session state as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your tracked products
    List,
    /// Start tracking a product
    Track {
        #[arg(long)]
        url: String,
        /// Desired price
        #[arg(long)]
        price: String,
        /// Where to send the price alert (defaults to your account email)
        #[arg(long)]
        email: Option<String>,
    },
    /// Stop tracking a product
    Delete { product_id: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };

    let api_url = cli.api_url.clone().unwrap_or_else(|| config.api_url());
    debug!(%api_url, store = ?config.token_store, "Config loaded");

    let api = ApiClient::with_timeout(&api_url, config.request_timeout())?;
    let mut session: Session = SessionManager::new(api, config.token_store()?);

    match cli.command {
        Command::Login { email } => login(&mut session, &mut config, email).await,
        Command::Signup { name, email } => signup(&mut session, &mut config, name, email).await,
        Command::Logout => {
            session.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami { json } => whoami(&mut session, json).await,
        Command::List => list(&mut session).await,
        Command::Track { url, price, email } => track(&mut session, url, price, email).await,
        Command::Delete { product_id } => delete(&mut session, &product_id).await,
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

async fn login(session: &mut Session, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let form = LoginForm {
        password: rpassword::prompt_password(format!("Password for {}: ", email))?,
        email,
    };

    let outcome = submit_login(session, &form).await;
    if !outcome.success {
        bail!(outcome.message);
    }

    remember_email(config, &form.email);
    info!("Login successful");
    println!("{}", outcome.message);
    Ok(())
}

async fn signup(session: &mut Session, config: &mut Config, name: String, email: String) -> Result<()> {
    let form = SignupForm {
        name,
        email,
        password: rpassword::prompt_password("Password (min 6 characters): ")?,
        confirm_password: rpassword::prompt_password("Confirm Password: ")?,
    };

    let outcome = submit_signup(session, &form).await;
    if !outcome.success {
        bail!(outcome.message);
    }

    remember_email(config, &form.email);
    println!("{}", outcome.message);
    Ok(())
}

async fn whoami(session: &mut Session, json: bool) -> Result<()> {
    session.start().await;

    if json {
        println!("{}", serde_json::to_string_pretty(session.state())?);
        return Ok(());
    }

    match session.user() {
        Some(user) => match user.email {
            Some(ref email) => println!("Signed in as {} <{}>", user.name, email),
            None => println!("Signed in as {}", user.name),
        },
        None => println!("Not signed in."),
    }
    Ok(())
}

/// Restore the stored session; the product commands need a signed-in user.
async fn require_user(session: &mut Session) -> Result<()> {
    session.start().await;
    if !session.shows_main_view() {
        bail!("Not logged in. Run `pricewatch login` first.");
    }
    Ok(())
}

fn print_product(product: &Product) {
    println!("[{}] {}", product.price_status(), product.display_name());
    println!("  URL: {}", truncate_string(&product.url, MAX_URL_DISPLAY_LEN));

    let mut prices = format!("  Target: {}", format_price(product.desired_price));
    if let Some(current) = product.current_price {
        prices.push_str(&format!("   Current: {}", format_price(current)));
    }
    println!("{}", prices);

    if let Some(ref checked) = product.last_checked {
        println!("  Last Checked: {}", format_timestamp(checked));
    }
    if let Some(ref added) = product.created_at {
        println!("  Added: {}", format_timestamp(added));
    }
    println!("  ID: {}", product.id);
}

async fn list(session: &mut Session) -> Result<()> {
    require_user(session).await?;

    let products = match session.backend().list_products().await {
        Ok(products) => products,
        Err(e) => {
            let reason = e.backend_message().map(str::to_string).unwrap_or_else(|| e.to_string());
            bail!("Failed to fetch products: {}", reason);
        }
    };

    println!("My Tracked Products ({})", products.len());
    if products.is_empty() {
        println!("You haven't tracked any products yet. Add some products to get started!");
        return Ok(());
    }
    for product in &products {
        println!();
        print_product(product);
    }
    Ok(())
}

async fn track(session: &mut Session, url: String, price: String, email: Option<String>) -> Result<()> {
    require_user(session).await?;

    let user_email = email
        .or_else(|| session.user().and_then(|u| u.email.clone()))
        .unwrap_or_default();
    let form = TrackForm {
        url,
        desired_price: price,
        user_email,
    };
    let request = form.validate()?;

    match session.backend().track_product(&request).await {
        Ok(resp) => {
            println!("{}", resp.message.unwrap_or_else(|| "Product added for tracking.".to_string()));
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Track request failed");
            bail!("Failed to add product for tracking.");
        }
    }
}

async fn delete(session: &mut Session, product_id: &str) -> Result<()> {
    require_user(session).await?;

    match session.backend().delete_product(product_id).await {
        Ok(()) => {
            println!("Product deleted successfully!");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, product_id, "Delete request failed");
            bail!("Failed to delete product.");
        }
    }
}
