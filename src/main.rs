use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use site_admin::api::PasswordChange;
use site_admin::domain::{ContentSchema, ItemId, RemoteId};
use site_admin::sync::{ContactForm, ContactSync};
use site_admin::{ApiClient, ClientConfig, CollectionSync};

#[derive(Parser)]
#[command(name = "site-admin", version, about = "Manage the content of the marketing site")]
struct Cli {
    /// JSON config file; environment variables override its values
    #[arg(long, default_value = "site-admin.json")]
    config: PathBuf,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the items of a content type in display order
    List { content: String },
    /// Delete one item
    Delete { content: String, id: String },
    /// Save a new order; every item id must be listed once
    Reorder {
        content: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Move one item to a position (0-based) and save the resulting order
    Move {
        content: String,
        id: String,
        position: usize,
    },
    /// Show the contact entries
    Contacts,
    /// Change the address of a contact entry
    SetEmail { id: String, address: String },
    /// Sign in and print the session token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "SITE_ADMIN_PASSWORD")]
        password: String,
        /// Store the token in the config file
        #[arg(long)]
        save: bool,
    },
    /// Change the admin password
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

/// Log lines replayed on stderr when a command fails
const CONTEXT_LINES: usize = 20;

fn load_config(path: &Path) -> Result<ClientConfig, site_admin::ConfigError> {
    if path.exists() {
        ClientConfig::load(path)?.with_env()
    } else {
        let _ = rolling_logger::warn(&format!(
            "no config file at {}, using environment only",
            path.display()
        ));
        ClientConfig::from_env()
    }
}

fn schema(name: &str) -> Result<ContentSchema, String> {
    ContentSchema::by_name(name).ok_or_else(|| {
        let known: Vec<String> = ContentSchema::all().into_iter().map(|s| s.name).collect();
        format!("unknown content type {} (expected one of: {})", name, known.join(", "))
    })
}

/// Ids given on the command line: integers stay integers
fn parse_id(raw: &str) -> RemoteId {
    match raw.parse::<i64>() {
        Ok(n) => RemoteId::Int(n),
        Err(_) => RemoteId::Str(raw.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    rolling_logger::init_logger(cli.log_dir.clone(), "site-admin")?;
    let _ = rolling_logger::info(&format!("site-admin {} started", env!("CARGO_PKG_VERSION")));

    if let Err(e) = run(cli).await {
        let _ = rolling_logger::error(&format!("command failed: {}", e));
        eprintln!("recent log:");
        for line in rolling_logger::recent_lines(CONTEXT_LINES) {
            eprintln!("  {}", line);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)?;
    let api = Arc::new(ApiClient::from_config(&config)?);

    match cli.command {
        Commands::List { content } => {
            let schema = schema(&content)?;
            let sync = CollectionSync::new(schema.clone(), api);
            for item in sync.load().await? {
                println!("{:>4}  {:<8}  {}", item.sort_id, item.id.to_string(), item.title(&schema));
            }
        }
        Commands::Delete { content, id } => {
            let sync = CollectionSync::new(schema(&content)?, api);
            sync.load().await?;
            sync.remove(&ItemId::Persisted(parse_id(&id))).await?;
            println!("deleted {} {}", content, id);
        }
        Commands::Reorder { content, ids } => {
            let sync = CollectionSync::new(schema(&content)?, api);
            sync.load().await?;
            let order: Vec<RemoteId> = ids.iter().map(|id| parse_id(id)).collect();
            sync.reorder(&order).await?;
            println!("saved order of {} {} items", order.len(), content);
        }
        Commands::Move {
            content,
            id,
            position,
        } => {
            let sync = CollectionSync::new(schema(&content)?, api);
            sync.load().await?;
            let mut session = sync.reorder_session().await;
            if !session.move_to(&parse_id(&id), position) {
                return Err(format!("no {} item {}", content, id).into());
            }
            if !session.is_dirty() {
                println!("order unchanged");
                return Ok(());
            }
            sync.reorder(&session.confirm()).await?;
            println!("moved {} {} to position {}", content, id, position);
        }
        Commands::Contacts => {
            let sync = ContactSync::new(api);
            for contact in sync.load().await? {
                println!("{:<6}  {}", contact.id.to_string(), contact.email);
                println!("        background: {}", contact.background_image.to_source());
                println!("        logo:       {}", contact.logo.to_source());
            }
        }
        Commands::SetEmail { id, address } => {
            let sync = ContactSync::new(api);
            let id = parse_id(&id);
            let contact = sync
                .load()
                .await?
                .into_iter()
                .find(|contact| contact.id == id)
                .ok_or_else(|| format!("no contact {}", id))?;
            let mut form = ContactForm::from_contact(&contact);
            form.email = address;
            sync.submit(&form).await?;
            println!("updated contact {}", id);
        }
        Commands::Login {
            username,
            password,
            save,
        } => {
            let session = api.login(&username, &password).await?;
            let token = session.token().unwrap_or_default().to_string();
            if save {
                let mut stored = if cli.config.exists() {
                    ClientConfig::load(&cli.config)?
                } else {
                    ClientConfig::new(&config.api_url)
                };
                stored.token = Some(token);
                stored.save(&cli.config)?;
                println!("token saved to {}", cli.config.display());
            } else {
                println!("{}", token);
            }
        }
        Commands::Password {
            current,
            new,
            confirm,
        } => {
            let change = PasswordChange::new(&current, &new, &confirm)?;
            api.change_password(&change).await?;
            println!("password changed");
        }
    }

    Ok(())
}
