use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use tastepedia_core::models::{
    CartItem, EntityKey, EntityValue, FavoriteState, FilterState, NewPost, PriceTier,
};
use tastepedia_core::store::{CartStore, EntityStateStore};
use tastepedia_core::{
    CoreConfig, CoreEvent, Gateway, HttpGateway, MutationController, MutationOutcome,
    QueryComposer,
};

#[derive(Parser)]
#[command(name = "tastepedia-cli")]
#[command(about = "Drive the Tastepedia client core against a live backend")]
struct Cli {
    /// Base URL of the API
    #[arg(long)]
    api_base: Option<String>,

    /// Directory for locally persisted state (default: platform data dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Actor id the server attributes likes/votes to
    #[arg(long, default_value = "cli")]
    actor: String,

    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Favorite a recipe (optimistically, then reconcile)
    Favorite {
        recipe_id: String,
        /// Remove from favorites instead of adding
        #[arg(long)]
        remove: bool,
    },

    /// Toggle a like on a community post
    Like { post_id: String },

    /// Cast a vote on a poll post
    Vote { post_id: String, option_id: u32 },

    /// Run a debounced, minimized search
    Search {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        max_calories: Option<u32>,
        #[arg(long)]
        max_minutes: Option<u32>,
        #[arg(long)]
        max_protein: Option<u32>,
        /// May be given multiple times
        #[arg(long = "cuisine")]
        cuisines: Vec<String>,
        /// low, medium, or high; may be given multiple times
        #[arg(long = "price")]
        price_tiers: Vec<String>,
    },

    /// Create a community post or poll
    CreatePost {
        /// post, question, or tip
        #[arg(long, default_value = "post")]
        post_type: String,
        #[arg(long)]
        content: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Turns the submission into a poll
        #[arg(long)]
        poll_question: Option<String>,
        #[arg(long = "poll-option")]
        poll_options: Vec<String>,
    },

    /// Local ingredient cart
    #[command(subcommand)]
    Cart(CartCommands),
}

#[derive(Subcommand)]
enum CartCommands {
    /// Merge an item into the cart
    Add {
        name: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long, default_value = "")]
        recipe: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Print the cart
    List,
    /// Remove one line by key
    Remove { key: String },
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    tracing::debug!(data_dir = %data_dir.display(), "local state directory");

    let mut config = CoreConfig::new(&data_dir);
    if let Some(api_base) = &cli.api_base {
        config = config.with_api_base(api_base.clone());
    }

    match &cli.command {
        Commands::Cart(command) => run_cart(&cli, &data_dir, command),
        command => run_remote(&cli, &config, command).await,
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("tastepedia")
}

fn print_json<T: serde::Serialize>(cli: &Cli, value: &T) -> Result<()> {
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

fn run_cart(cli: &Cli, data_dir: &std::path::Path, command: &CartCommands) -> Result<()> {
    let mut cart = CartStore::load(data_dir);
    match command {
        CartCommands::Add {
            name,
            quantity,
            recipe,
            image,
        } => {
            let mut item = CartItem::new(name, *quantity, recipe.clone());
            if let Some(image) = image {
                item = item.with_image(image);
            }
            cart.add_items(vec![item])?;
        }
        CartCommands::List => {}
        CartCommands::Remove { key } => cart.remove(key)?,
        CartCommands::Clear => cart.clear()?,
    }
    print_json(
        cli,
        &serde_json::json!({
            "items": cart.items(),
            "totalItems": cart.total_items(),
            "subtotal": cart.subtotal(),
        }),
    )
}

async fn run_remote(cli: &Cli, config: &CoreConfig, command: &Commands) -> Result<()> {
    let gateway = Arc::new(HttpGateway::new(config.api_base.clone()));
    let store = Arc::new(Mutex::new(EntityStateStore::new()));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<CoreEvent>();
    let controller = MutationController::new(
        Arc::clone(&store),
        gateway.clone() as Arc<dyn Gateway>,
        events_tx.clone(),
        cli.actor.clone(),
        config.mutation_timeout,
    );

    match command {
        Commands::Favorite { recipe_id, remove } => {
            let favorited = gateway.check_favorite(recipe_id).await.unwrap_or(false);
            controller.observe(
                EntityKey::new(recipe_id.as_str()),
                EntityValue::Favorite(FavoriteState { favorited }),
            );
            let handle = controller.set_favorite(recipe_id, !remove)?;
            report_outcome(cli, handle.await?, &controller, recipe_id)
        }
        Commands::Like { post_id } => {
            observe_post(&gateway, &controller, &cli.actor, post_id, false).await?;
            let handle = controller.toggle_like(post_id)?;
            report_outcome(cli, handle.await?, &controller, post_id)
        }
        Commands::Vote { post_id, option_id } => {
            observe_post(&gateway, &controller, &cli.actor, post_id, true).await?;
            let handle = controller.vote_poll(post_id, *option_id)?;
            report_outcome(cli, handle.await?, &controller, post_id)
        }
        Commands::Search {
            keyword,
            max_calories,
            max_minutes,
            max_protein,
            cuisines,
            price_tiers,
        } => {
            let mut state = FilterState::default();
            if let Some(keyword) = keyword {
                state.keyword = keyword.clone();
            }
            if let Some(max) = max_calories {
                state.max_calories = *max;
            }
            if let Some(max) = max_minutes {
                state.max_minutes = *max;
            }
            state.max_protein_g = *max_protein;
            state.cuisines = cuisines.iter().cloned().collect();
            state.price_tiers = parse_price_tiers(price_tiers)?;

            let composer = QueryComposer::new(
                gateway.clone() as Arc<dyn Gateway>,
                events_tx,
                config.debounce,
            );
            composer.on_filter_change(state);

            let deadline = config.debounce + config.mutation_timeout;
            loop {
                let event = tokio::time::timeout(deadline, events_rx.recv())
                    .await
                    .context("timed out waiting for search results")?
                    .context("event channel closed")?;
                match event {
                    CoreEvent::SearchResults { results, .. } => {
                        return print_json(cli, &results);
                    }
                    CoreEvent::SearchFailed { reason, .. } => bail!("search failed: {reason}"),
                    CoreEvent::AuthRequired => bail!("search failed: authentication required"),
                    _ => {}
                }
            }
        }
        Commands::CreatePost {
            post_type,
            content,
            tags,
            poll_question,
            poll_options,
        } => {
            let mut post = match poll_question {
                Some(question) => {
                    if poll_options.len() < 2 {
                        bail!("a poll needs at least two --poll-option values");
                    }
                    NewPost::poll(question.clone(), poll_options.clone())
                }
                None => NewPost::text(post_type.clone(), content.clone()),
            };
            post.content = content.clone();
            post.tags = tags.clone();

            let created = gateway.create_post(post).await?;
            print_json(
                cli,
                &serde_json::json!({
                    "id": created.id,
                    "type": created.post_type,
                    "content": created.content,
                    "tags": created.tags,
                }),
            )
        }
        Commands::Cart(_) => unreachable!("cart handled before remote setup"),
    }
}

/// Seed the store with a post's observed like or poll state before mutating it.
async fn observe_post(
    gateway: &HttpGateway,
    controller: &MutationController,
    actor: &str,
    post_id: &str,
    want_poll: bool,
) -> Result<()> {
    let posts = gateway.fetch_posts().await?;
    let post = posts
        .iter()
        .find(|p| p.id == post_id)
        .with_context(|| format!("post {post_id} not found"))?;

    let key = EntityKey::new(post_id);
    if want_poll {
        let poll = post
            .poll_state(actor)
            .with_context(|| format!("post {post_id} carries no poll"))?;
        controller.observe(key, EntityValue::Poll(poll));
    } else {
        controller.observe(key, EntityValue::Like(post.like_state(actor)));
    }
    Ok(())
}

fn report_outcome(
    cli: &Cli,
    outcome: MutationOutcome,
    controller: &MutationController,
    entity_id: &str,
) -> Result<()> {
    let visible = controller.visible(&EntityKey::new(entity_id));
    let status = match &outcome {
        MutationOutcome::Applied => "applied".to_string(),
        MutationOutcome::RolledBack(reason) => format!("rolled back ({reason:?})"),
        MutationOutcome::Stale => "stale/ignored".to_string(),
    };
    print_json(
        cli,
        &serde_json::json!({
            "outcome": status,
            "state": visible,
        }),
    )?;
    if let MutationOutcome::RolledBack(reason) = outcome {
        bail!("mutation rolled back: {reason:?}");
    }
    Ok(())
}

fn parse_price_tiers(raw: &[String]) -> Result<BTreeSet<PriceTier>> {
    raw.iter()
        .map(|tier| match tier.to_ascii_lowercase().as_str() {
            "low" => Ok(PriceTier::Low),
            "medium" => Ok(PriceTier::Medium),
            "high" => Ok(PriceTier::High),
            other => bail!("unknown price tier '{other}' (expected low, medium, or high)"),
        })
        .collect()
}
