//! mypokedex - command-line client for the MyPokedex backend
//!
//! Each invocation runs one command. Session cookies, favorites and the team
//! are kept in the local storage file between invocations.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dex_client::catalog::Catalog;
use dex_client::compare::{resolve_token, CompareSelection};
use dex_client::filter::{self, Facets, SortKey, TypeFacet, ViewState};
use dex_client::guard::{can_activate, Access};
use dex_client::{render, DexContext};
use dex_common::config::{default_config_path, read_toml_config, CompiledDefaults, ConfigResolver};
use dex_common::models::Pokemon;

/// Command-line arguments for mypokedex
#[derive(Parser, Debug)]
#[command(name = "mypokedex")]
#[command(about = "Browse, favorite, team up and compare Pokémon")]
#[command(version)]
struct Args {
    /// Backend base URL (overrides MYPOKEDEX_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for local storage (overrides MYPOKEDEX_DATA_DIR and the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file to read instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and keep the session for later commands
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MYPOKEDEX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a trainer account (does not log in)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "MYPOKEDEX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show the logged-in trainer
    Whoami,
    /// List Pokémon with optional filters
    List {
        /// Name or pokedex-number substring
        #[arg(short, long, default_value = "")]
        query: String,
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Type filter, `all` for none
        #[arg(long = "type", default_value = "all")]
        type_filter: String,
        #[arg(long, default_value_t = 0)]
        min_hp: i64,
        #[arg(long, default_value_t = 0)]
        min_attack: i64,
        #[arg(long, default_value_t = 0)]
        min_defense: i64,
        #[arg(long, default_value_t = 0)]
        min_speed: i64,
        /// dex, name, hp, attack or speed
        #[arg(long, default_value = "dex")]
        sort: SortKey,
    },
    /// Show one Pokémon by id
    Show { id: i64 },
    /// Type-ahead suggestions for a query
    Suggest { query: String },
    /// List every type present in the catalog
    Types,
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
    /// Manage the team (up to six)
    Team {
        #[command(subcommand)]
        action: TeamCommand,
    },
    /// Compare Pokémon by name, id or pokedex number
    Compare {
        /// Names or numbers, space- or comma-separated
        picks: Vec<String>,
        /// List picker candidates matching this text instead of comparing
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum FavoritesCommand {
    Add { pokemon: String },
    Remove { pokemon: String },
    Toggle { pokemon: String },
    List {
        #[arg(short, long, default_value = "")]
        query: String,
    },
}

#[derive(Subcommand, Debug)]
enum TeamCommand {
    Add { pokemon: String },
    Remove { pokemon: String },
    Clear,
    Show,
    /// Catalog entries that could still join the team
    Candidates {
        #[arg(default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level lives in the config file, so resolve before tracing is up
    // and report problems once it is
    let config_path = args.config.clone().or_else(default_config_path);
    let (toml, unreadable) = match read_toml_config(config_path.as_deref()) {
        Ok(toml) => (toml, None),
        Err(e) => (Default::default(), Some(e)),
    };
    let config = ConfigResolver::new()
        .with_cli_api_url(args.api_url.clone())
        .with_cli_data_dir(args.data_dir.clone())
        .with_config_path(args.config.clone())
        .with_toml(toml)
        .resolve();
    match &config {
        Ok(config) => init_tracing(&config.log_level),
        Err(_) => init_tracing(&CompiledDefaults::for_current_platform().log_level),
    }
    if let Some(e) = unreadable {
        warn!("Ignoring unreadable config file: {}", e);
    }

    debug!(
        git_hash = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "mypokedex {}",
        env!("CARGO_PKG_VERSION")
    );

    let config = config.context("Invalid configuration")?;
    info!(api = %config.api_base_url, data_dir = %config.data_dir.display(), "Configuration resolved");

    let ctx = DexContext::from_config(&config).context("Failed to initialize client")?;
    run(&ctx, args.command).await
}

fn init_tracing(level: &str) {
    let default_filter = if level.contains('=') {
        level.to_string()
    } else {
        format!("mypokedex={0},dex_client={0},dex_common={0}", level)
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(ctx: &DexContext, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let identity = ctx
                .session
                .login(&email, &password)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("Logged in as {}", render::trainer(&identity));
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            let identity = ctx
                .session
                .register(&name, &email, &password)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("Registered {}. Log in to continue.", render::trainer(&identity));
        }
        Command::Logout => {
            ctx.session.logout().await;
            println!("Logged out");
        }
        Command::Whoami => {
            if !ctx.session.is_authenticated() {
                ctx.session.probe().await;
            }
            let state = ctx.session.current();
            match (&state.user, state.is_authenticated()) {
                (Some(user), true) => println!("{}", render::trainer(user)),
                (None, true) => println!("Logged in"),
                (_, false) => println!("Not logged in"),
            }
        }
        Command::List {
            query,
            favorites,
            type_filter,
            min_hp,
            min_attack,
            min_defense,
            min_speed,
            sort,
        } => {
            let catalog = protected_catalog(ctx).await?;
            let view = ViewState {
                query,
                favorites_only: favorites,
                facets: Facets {
                    type_facet: TypeFacet::parse(&type_filter),
                    min_hp,
                    min_attack,
                    min_defense,
                    min_speed,
                },
                sort_key: sort,
            };
            let rows = ctx.roster(&catalog, &view);
            print!(
                "{}",
                render::roster(&rows, catalog.ceiling(), |p| ctx.favorites.is_favorite(p.id))
            );
        }
        Command::Show { id } => {
            require_session(ctx).await?;
            let detail = ctx.detail(id).await.map_err(|e| backend_error(ctx, e))?;
            print!(
                "{}",
                render::detail(&detail.pokemon, detail.favorite, &detail.ceiling)
            );
        }
        Command::Suggest { query } => {
            let catalog = protected_catalog(ctx).await?;
            for entry in catalog.suggestions().suggest(&query) {
                println!("{}", entry);
            }
        }
        Command::Types => {
            let catalog = protected_catalog(ctx).await?;
            for type_name in catalog.type_options() {
                println!("{}", type_name);
            }
        }
        Command::Favorites { action } => {
            let catalog = protected_catalog(ctx).await?;
            run_favorites(ctx, &catalog, action)?;
        }
        Command::Team { action } => {
            let catalog = protected_catalog(ctx).await?;
            run_team(ctx, &catalog, action)?;
        }
        Command::Compare { picks, search } => {
            let catalog = protected_catalog(ctx).await?;
            if let Some(query) = search {
                for pokemon in filter::search_candidates(catalog.pokemons(), &query) {
                    let favorite = ctx.favorites.is_favorite(pokemon.id);
                    println!("{}", render::pokemon_row(pokemon, favorite, catalog.ceiling()));
                }
                return Ok(());
            }

            let mut selection = CompareSelection::new();
            selection.add_from_input(&picks.join(","), &catalog);
            match selection
                .compare(&ctx.api)
                .await
                .map_err(|e| backend_error(ctx, e))?
            {
                Some(view) => print!("{}", render::comparison(&view)),
                None => println!("Nothing to compare. Name at least one known Pokémon."),
            }
        }
    }
    Ok(())
}

fn run_favorites(ctx: &DexContext, catalog: &Catalog, action: FavoritesCommand) -> Result<()> {
    match action {
        FavoritesCommand::Add { pokemon } => {
            let pokemon = lookup(catalog, &pokemon)?;
            if ctx.favorites.add(pokemon.id) {
                println!("Added {} to favorites", pokemon.name);
            } else {
                println!("{} is already a favorite", pokemon.name);
            }
        }
        FavoritesCommand::Remove { pokemon } => {
            let pokemon = lookup(catalog, &pokemon)?;
            if ctx.favorites.remove(pokemon.id) {
                println!("Removed {} from favorites", pokemon.name);
            } else {
                println!("{} was not a favorite", pokemon.name);
            }
        }
        FavoritesCommand::Toggle { pokemon } => {
            let pokemon = lookup(catalog, &pokemon)?;
            if ctx.favorites.toggle(pokemon.id) {
                println!("{} is now a favorite", pokemon.name);
            } else {
                println!("{} is no longer a favorite", pokemon.name);
            }
        }
        FavoritesCommand::List { query } => {
            let rows = ctx.favorites_view(catalog, &query);
            if rows.is_empty() {
                println!("No favorites yet");
            } else {
                print!("{}", render::roster(&rows, catalog.ceiling(), |_| true));
            }
        }
    }
    Ok(())
}

fn run_team(ctx: &DexContext, catalog: &Catalog, action: TeamCommand) -> Result<()> {
    match action {
        TeamCommand::Add { pokemon } => {
            let pokemon = lookup(catalog, &pokemon)?;
            if ctx.team.contains(pokemon.id) {
                println!("{} is already on the team", pokemon.name);
            } else if ctx.team.add(pokemon.id) {
                println!("Added {} to the team", pokemon.name);
            } else {
                bail!("The team already has {} Pokémon", ctx.team.capacity());
            }
        }
        TeamCommand::Remove { pokemon } => {
            let pokemon = lookup(catalog, &pokemon)?;
            if ctx.team.remove(pokemon.id) {
                println!("Removed {} from the team", pokemon.name);
            } else {
                println!("{} is not on the team", pokemon.name);
            }
        }
        TeamCommand::Clear => {
            ctx.team.clear();
            println!("Team cleared");
        }
        TeamCommand::Show => {
            let slots = ctx.team.slots(|id| catalog.get(id));
            print!("{}", render::team_slots(&slots, catalog.ceiling()));
        }
        TeamCommand::Candidates { query } => {
            let rows = ctx.team_candidates(catalog, &query);
            print!(
                "{}",
                render::roster(&rows, catalog.ceiling(), |p| ctx.favorites.is_favorite(p.id))
            );
        }
    }
    Ok(())
}

fn lookup<'a>(catalog: &'a Catalog, token: &str) -> Result<&'a Pokemon> {
    resolve_token(token, catalog).ok_or_else(|| anyhow!("No Pokémon matches {:?}", token))
}

/// Stop with a login hint unless the session is valid
async fn require_session(ctx: &DexContext) -> Result<()> {
    match can_activate(&ctx.session).resolve().await {
        Access::Granted => Ok(()),
        Access::RedirectToLogin => {
            bail!("Not logged in. Run `mypokedex login --email <EMAIL>` first.")
        }
    }
}

async fn protected_catalog(ctx: &DexContext) -> Result<std::sync::Arc<Catalog>> {
    require_session(ctx).await?;
    ctx.ensure_catalog()
        .await
        .map_err(|e| backend_error(ctx, e))
        .context("Failed to load the catalog")
}

/// Trainer-facing error; a rejected session is also dropped locally
fn backend_error(ctx: &DexContext, error: dex_common::Error) -> anyhow::Error {
    if ctx.session.observe_error(&error) {
        return anyhow!("{} Run `mypokedex login --email <EMAIL>`.", error.user_message());
    }
    anyhow!(error.user_message())
}
