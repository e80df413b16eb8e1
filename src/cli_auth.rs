use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use streaming_portal::catalog::{ContentKind, Tier};
use streaming_portal::cli_style::get_styles;
use streaming_portal::store::{CatalogAdminStore, CredentialStore, SqliteStore};
use streaming_portal::user::StoredCredential;

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    Tier::from_str(s).ok_or_else(|| format!("Invalid tier '{}'. Valid tiers are: free, premium", s))
}

fn parse_content_kind(s: &str) -> Result<ContentKind, String> {
    ContentKind::from_str(s)
        .ok_or_else(|| format!("Invalid kind '{}'. Valid kinds are: track, podcast", s))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    #[clap(value_parser = parse_path)]
    pub path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a user with the given identity and password.
    AddUser {
        identity: String,
        password: String,
        #[arg(long, value_parser = parse_tier, default_value = "free")]
        tier: Tier,
    },

    /// Moves a user to another tier. Open sessions keep their tier until they end.
    SetTier {
        identity: String,
        #[arg(value_parser = parse_tier)]
        tier: Tier,
    },

    /// Replaces the password of a user.
    SetPassword { identity: String, password: String },

    /// Verifies the password of a given user without changing anything.
    CheckPassword { identity: String, password: String },

    /// Shows account information of a given user.
    Show { identity: String },

    /// Lists users, optionally only those of one tier.
    ListUsers {
        #[arg(long, value_parser = parse_tier)]
        tier: Option<Tier>,
    },

    /// Adds a track or a podcast to the catalog.
    AddContent {
        #[arg(value_parser = parse_content_kind)]
        kind: ContentKind,
        title: String,
        artist: String,
        duration_sec: u32,
    },

    /// Adds a playlist owned by the given user.
    AddPlaylist {
        owner: String,
        title: String,
        track_count: u32,
    },

    /// Shows the path of the current db and its row counts.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn execute_command(line: String, store: &SqliteStore, db_path: String) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match cli.command {
                InnerCommand::AddUser {
                    identity,
                    password,
                    tier,
                } => {
                    let credential = match StoredCredential::from_plain(&password) {
                        Ok(x) => x,
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    match store.create_user(&identity, &credential, tier) {
                        Ok(id) => println!("Created {} user {} with id {}", tier, identity, id),
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::SetTier { identity, tier } => {
                    if let Err(err) = store.set_user_tier(&identity, tier) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    println!("User {} is now {}", identity, tier);
                }
                InnerCommand::SetPassword { identity, password } => {
                    let credential = match StoredCredential::from_plain(&password) {
                        Ok(x) => x,
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    if let Err(err) = store.set_user_credential(&identity, &credential) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                }
                InnerCommand::CheckPassword { identity, password } => {
                    let user = match store.find_users_by_identity(&identity) {
                        Ok(mut users) if users.len() == 1 => users.remove(0),
                        Ok(users) if users.is_empty() => {
                            return CommandExecutionResult::Error(format!(
                                "User {} not found.",
                                identity
                            ));
                        }
                        Ok(users) => {
                            return CommandExecutionResult::Error(format!(
                                "Identity {} matches {} accounts.",
                                identity,
                                users.len()
                            ));
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    let msg = match user.credential.verify(&password) {
                        Ok(true) => "The password provided is correct!",
                        Ok(false) => "Wrong password.",
                        Err(err) => &format!(
                            "Could not verify the password, something went wrong: {}",
                            err
                        ),
                    };
                    println!("{}", msg);
                }
                InnerCommand::Show { identity } => {
                    let users = match store.find_users_by_identity(&identity) {
                        Ok(x) => x,
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    if users.is_empty() {
                        return CommandExecutionResult::Error(format!(
                            "User {} not found.",
                            identity
                        ));
                    }
                    for user in users.iter() {
                        println!("{:#?}", user);
                    }

                    match store.list_playlists_by_owner(&identity) {
                        Ok(playlists) => {
                            println!("\nPlaylists:");
                            if playlists.is_empty() {
                                println!("  (no playlists)");
                            }
                            for playlist in playlists.iter() {
                                println!(
                                    "  - [{}] {} ({} tracks)",
                                    playlist.id, playlist.title, playlist.track_count
                                );
                            }
                        }
                        Err(err) => println!("\nFailed to get playlists: {}", err),
                    }
                }
                InnerCommand::ListUsers { tier } => {
                    let tiers = match tier {
                        Some(tier) => vec![tier],
                        None => vec![Tier::Free, Tier::Premium],
                    };
                    for tier in tiers {
                        match store.list_users_by_tier(tier) {
                            Ok(users) => {
                                println!("{}:", tier);
                                for user in users.iter() {
                                    println!("  - [{}] {}", user.account_id, user.identity);
                                }
                            }
                            Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                        }
                    }
                }
                InnerCommand::AddContent {
                    kind,
                    title,
                    artist,
                    duration_sec,
                } => match store.add_content(kind, &title, &artist, duration_sec) {
                    Ok(id) => println!("Added {:?} {} with id {}", kind, title, id),
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::AddPlaylist {
                    owner,
                    title,
                    track_count,
                } => match store.add_playlist(&owner, &title, track_count) {
                    Ok(id) => println!("Added playlist {} for {} with id {}", title, owner, id),
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::Where => {
                    println!("{}", db_path);
                    match store.table_counts() {
                        Ok(counts) => {
                            for (table, count) in counts {
                                println!("  {}: {} rows", table, count);
                            }
                        }
                        Err(err) => println!("Failed to count rows: {}", err),
                    }
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct CommandHelper {
    commands_names: Vec<String>,
}

impl CommandHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandHelper { commands_names }
    }
}

impl Completer for CommandHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandHelper {}
impl Validator for CommandHelper {}
impl Helper for CommandHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let db_path = match cli_args.path {
        Some(path) => path,
        None => SqliteStore::infer_path().with_context(|| {
            "Could not infer the portal DB file path, please specify it explicitly."
        })?,
    };
    let store = SqliteStore::new(&db_path, Duration::from_millis(2000))?;

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(CommandHelper::new()));
    let _ = rl.clear_screen();

    loop {
        let readline = rl.readline(PROMPT);

        let _ = rl.clear_screen();
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &store, db_path.display().to_string()) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
