use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use nutrichat::auth::{AuthController, UserSession};
use nutrichat::camera::{Camera, FileQueueCamera};
use nutrichat::flows::{MealAdviceController, ProductAdviceController};
use nutrichat::profile::{PersonalDataForm, ProfileController};
use nutrichat::{AppError, AppState};

#[derive(Debug, Parser)]
#[command(name = "nutrichat", version, about = "Nutrition advice from photos of packaged food")]
struct Cli {
    #[arg(long, env = "NUTRICHAT_EMAIL", global = true)]
    email: Option<String>,
    #[arg(long, env = "NUTRICHAT_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account and its profile document
    SignUp {
        #[arg(long)]
        username: String,
    },
    /// Sign in and print the user id
    SignIn,
    /// Show or update personal data
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Advice on a meal made of several packaged products
    Meal {
        #[arg(long, allow_negative_numbers = true)]
        products: i64,
        /// Photos in capture order: ingredients, nutrition table, per product
        images: Vec<PathBuf>,
    },
    /// Advice on a single product
    Product { ingredients: PathBuf, nutrition: PathBuf },
}

#[derive(Debug, Subcommand)]
enum ProfileAction {
    Show,
    Update {
        #[arg(long, default_value = "")]
        age: String,
        #[arg(long)]
        gender: String,
        /// 1 (sedentary) to 5 (very active)
        #[arg(long)]
        activity_level: String,
        #[arg(long, default_value = "")]
        height: String,
        #[arg(long, default_value = "")]
        weight: String,
        #[arg(long, default_value = "")]
        target_weight: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutrichat=debug,reqwest=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let state = AppState::init()?;

    if let Err(e) = run(cli, state).await {
        match e.downcast_ref::<AppError>() {
            Some(app) => {
                tracing::error!(error = %app, "command failed");
                eprintln!("{}", app.user_message());
            }
            None => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    let auth = AuthController::new(state.clone());
    let email = cli
        .email
        .context("--email or NUTRICHAT_EMAIL is required")?;
    let password = cli
        .password
        .context("--password or NUTRICHAT_PASSWORD is required")?;

    let session = match &cli.command {
        Command::SignUp { username } => auth.sign_up(&email, &password, username).await,
        _ => auth.sign_in(&email, &password).await,
    }
    .map_err(AppError::from)?;

    match cli.command {
        Command::SignUp { .. } | Command::SignIn => println!("{}", session.user_id),
        Command::Profile { action } => profile(&state, &session, action).await?,
        Command::Meal { products, images } => {
            let camera = queue_camera(&state, images);
            let mut meal = MealAdviceController::new(state, camera, session.clone());
            meal.open().await?;
            meal.start(products)?;
            let advice = meal.advise_once().await?;
            println!("{}", advice.text);
        }
        Command::Product {
            ingredients,
            nutrition,
        } => {
            let camera = queue_camera(&state, vec![ingredients, nutrition]);
            let mut product = ProductAdviceController::new(state, camera, session.clone());
            product.open().await?;
            let advice = product.advise_once().await?;
            println!("{}", advice.text);
        }
    }
    auth.sign_out(session);
    Ok(())
}

async fn profile(state: &AppState, session: &UserSession, action: ProfileAction) -> anyhow::Result<()> {
    let mut controller = ProfileController::new(state.clone(), session.clone());
    match action {
        ProfileAction::Show => match controller.load().await? {
            Some(profile) => {
                for (label, value) in profile.summary() {
                    println!("{label}: {value}");
                }
            }
            None => println!("No personal data found for this user."),
        },
        ProfileAction::Update {
            age,
            gender,
            activity_level,
            height,
            weight,
            target_weight,
        } => {
            let form = PersonalDataForm {
                age,
                gender,
                activity_level,
                height,
                weight,
                target_weight,
            };
            controller.update(&form).await?;
            println!("Personal data updated successfully");
        }
    }
    Ok(())
}

/// Photos are replayed from the given files; shots land in the cache dir before the photo store moves them.
fn queue_camera(state: &AppState, images: Vec<PathBuf>) -> Arc<dyn Camera> {
    let scratch = state.config.cache_dir.join("camera");
    Arc::new(FileQueueCamera::new(images, scratch))
}
