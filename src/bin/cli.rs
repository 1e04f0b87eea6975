//! UNIVERSAL PASSPORT client CLI
//!
//! Drives the library against a live portal: lists bulletins and classes,
//! reports new bulletins, and generates the test-fixture file.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use unipa::{
    client::UnipaClient,
    error::{Result, UnipaError},
    models::{
        BulletinDetailsExpectation, BulletinListExpectation, Config, Fixture,
        PublicationPeriodExpectation,
    },
    services::{BulletinBoard, ClassSchedule},
    utils::datetime::format_datetime,
};

/// unipa - UNIVERSAL PASSPORT portal client
#[derive(Parser, Debug)]
#[command(name = "unipa", version, about = "UNIVERSAL PASSPORT portal client")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List bulletin-board posts
    Bulletins {
        /// Also fetch the detail view of every post
        #[arg(long)]
        details: bool,

        /// Download attachments into this directory (implies --details)
        #[arg(long)]
        download_dir: Option<PathBuf>,
    },

    /// List the class schedule
    Classes,

    /// Report bulletins not seen in a previous run
    New {
        /// Path to the seen-titles state file
        #[arg(long, default_value = "new_bulletins.json")]
        state: PathBuf,
    },

    /// Generate the test-fixture file from a live session
    GenTest {
        /// Output path for the fixture
        #[arg(long, default_value = "tests.json")]
        output: PathBuf,

        /// Download attachments and record their SHA-256 hashes
        #[arg(long)]
        hash_files: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Create a client and log in with the configured credentials.
async fn login_client(config: &Config) -> Result<UnipaClient> {
    let mut client = UnipaClient::new(&config.base_url)?;
    if !client.login(&config.username, &config.password).await? {
        let status = client.last_response().map(|r| r.status).unwrap_or(0);
        log::error!("Login POST was answered with status {status}");
        return Err(UnipaError::Transport {
            url: config.base_url.clone(),
            status,
        });
    }
    log::info!("Logged in to {}", config.base_url);
    Ok(client)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Bulletins {
            details,
            download_dir,
        } => {
            let mut client = login_client(&config).await?;
            let mut board = BulletinBoard::new(&mut client);
            let items = board.fetch_all().await?;
            log::info!("{} bulletin posts", items.len());

            for item in &items {
                log::info!(
                    "[{}{}{}] {}",
                    if item.is_attention { "!" } else { "-" },
                    if item.is_flag { "F" } else { "-" },
                    if item.is_unread { "U" } else { "-" },
                    item.title
                );

                if details || download_dir.is_some() {
                    let detail = board.fetch_details(item).await?;
                    log::info!(
                        "    {} / {} / files: {}",
                        detail.author,
                        detail.category,
                        detail.files.len()
                    );
                    if let Some(dir) = &download_dir {
                        for file in &detail.files {
                            let template = dir.join("{filename}").to_string_lossy().to_string();
                            let path = board.download(file, &template).await?;
                            log::info!("    saved {}", path.display());
                        }
                    }
                }
            }
        }

        Command::Classes => {
            let mut client = login_client(&config).await?;
            let classes = ClassSchedule::new(&mut client).fetch_all().await?;
            log::info!("{} classes", classes.len());
            for class in &classes {
                log::info!(
                    "{} {} - {} ({})",
                    class.lecture_at.day_of_week,
                    class
                        .lecture_at
                        .period_of_time
                        .map(|p| format!("{p}限"))
                        .unwrap_or_default(),
                    class.name,
                    class.class_code.as_deref().unwrap_or("-")
                );
            }
        }

        Command::New { state } => {
            let mut seen: HashSet<String> = if state.exists() {
                serde_json::from_str(&std::fs::read_to_string(&state)?)?
            } else {
                HashSet::new()
            };

            let mut client = login_client(&config).await?;
            let items = BulletinBoard::new(&mut client).fetch_all().await?;

            let mut new_count = 0;
            for item in &items {
                if seen.insert(item.title.clone()) {
                    log::info!("NEW ITEM: {}", item.title);
                    new_count += 1;
                }
            }
            log::info!("{new_count} new of {} posts", items.len());

            std::fs::write(&state, serde_json::to_string_pretty(&seen)?)?;
            log::info!("State saved to {}", state.display());
        }

        Command::GenTest { output, hash_files } => {
            let mut client = login_client(&config).await?;
            let mut board = BulletinBoard::new(&mut client);
            let items = board.fetch_all().await?;
            log::info!("Generating fixture from {} posts", items.len());

            let mut fixture = Fixture::default();
            for item in &items {
                fixture.bulletin_list.push(BulletinListExpectation {
                    title: item.title.clone(),
                    target_s: item.target_s.clone(),
                    target_p: item.target_p.clone(),
                    flag_id: item.flag_id.clone(),
                    unread_id: item.unread_id.clone(),
                    is_attention: item.is_attention,
                    is_flag: item.is_flag,
                    is_unread: item.is_unread,
                });

                let details = board.fetch_details(item).await?;
                let mut file_hashes = Vec::new();
                if hash_files {
                    for file in &details.files {
                        let dir = std::env::temp_dir().join("unipa-gen-test");
                        let template = dir.join("{filename}").to_string_lossy().to_string();
                        let path = board.download(file, &template).await?;
                        file_hashes.push(hash_file(&path)?);
                    }
                }

                fixture.bulletin_details.push(BulletinDetailsExpectation {
                    title: details.title.clone(),
                    author: details.author.clone(),
                    category: details.category.clone(),
                    content_html: details.content_html.clone(),
                    publication_period: PublicationPeriodExpectation {
                        start_date: details
                            .publication_period
                            .start
                            .as_ref()
                            .map(format_datetime)
                            .unwrap_or_default(),
                        end_date: details
                            .publication_period
                            .end
                            .as_ref()
                            .map(format_datetime)
                            .unwrap_or_default(),
                    },
                    file_hashes,
                });
            }

            fixture.save(&output)?;
            log::info!("Fixture saved to {}", output.display());
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("Config OK");
        }
    }

    log::info!("Done!");

    Ok(())
}

/// SHA-256 of a file's content, hex-encoded.
fn hash_file(path: &std::path::Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
