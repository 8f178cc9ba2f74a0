//! Command-line interface handling
//!
//! `blog-service [serve]` starts the server; the other subcommands are
//! one-shot administrative tasks against the configured database or cache.

use anyhow::{bail, Context};

use crate::cache::{PageCache, RedisPageCache};
use crate::config::Config;
use crate::db::{create_pool, run_migrations, BlogRepository, PgRepository};
use crate::models::NewGroup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve,
    Healthcheck,
    Migrate,
    CreateGroup {
        slug: String,
        title: String,
        description: String,
    },
    DeleteGroup {
        slug: String,
    },
    DeleteUser {
        username: String,
    },
    ClearCache,
}

const USAGE: &str = "usage: blog-service [serve | healthcheck | migrate | create-group <slug> <title> [description] | delete-group <slug> | delete-user <username> | clear-cache]";

const MAX_SLUG_LEN: usize = 50;
const MAX_TITLE_LEN: usize = 200;

/// Slugs appear in `/group/<slug>/` and must match `[-A-Za-z0-9_]+`.
fn validate_group(slug: &str, title: &str) -> anyhow::Result<()> {
    if slug.is_empty() || slug.chars().count() > MAX_SLUG_LEN {
        bail!("slug must be 1 to {} characters", MAX_SLUG_LEN);
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        bail!("slug '{}' may only contain letters, digits, '-' and '_'", slug);
    }
    if title.trim().is_empty() || title.chars().count() > MAX_TITLE_LEN {
        bail!("title must be 1 to {} characters", MAX_TITLE_LEN);
    }
    Ok(())
}

impl Command {
    /// Parse the arguments following the binary name.
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            None | Some("serve") => Command::Serve,
            Some("healthcheck") => Command::Healthcheck,
            Some("migrate") => Command::Migrate,
            Some("create-group") => {
                let (Some(slug), Some(title)) = (args.next(), args.next()) else {
                    bail!("create-group needs <slug> <title>\n{}", USAGE);
                };
                validate_group(&slug, &title)?;
                Command::CreateGroup {
                    slug,
                    title,
                    description: args.next().unwrap_or_default(),
                }
            }
            Some("delete-group") => match args.next() {
                Some(slug) => Command::DeleteGroup { slug },
                None => bail!("delete-group needs <slug>\n{}", USAGE),
            },
            Some("delete-user") => match args.next() {
                Some(username) => Command::DeleteUser { username },
                None => bail!("delete-user needs <username>\n{}", USAGE),
            },
            Some("clear-cache") => Command::ClearCache,
            Some(other) => bail!("unknown command '{}'\n{}", other, USAGE),
        };

        if let Some(extra) = args.next() {
            bail!("unexpected argument '{}'\n{}", extra, USAGE);
        }
        Ok(command)
    }
}

/// Run a non-serve command.
pub async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Serve => Ok(()),
        Command::Healthcheck => healthcheck(config).await,
        Command::Migrate => {
            let pool = create_pool(&config.database)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool).await.context("migration failed")?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::CreateGroup {
            slug,
            title,
            description,
        } => {
            let repo = connect(config).await?;
            let group = repo
                .create_group(&NewGroup {
                    title,
                    slug,
                    description,
                })
                .await?;
            println!("created group '{}' ({})", group, group.slug);
            Ok(())
        }
        Command::DeleteGroup { slug } => {
            let repo = connect(config).await?;
            if !repo.delete_group(&slug).await? {
                bail!("no group with slug '{}'", slug);
            }
            println!("deleted group '{}'", slug);
            Ok(())
        }
        Command::DeleteUser { username } => {
            let repo = connect(config).await?;
            if !repo.delete_user(&username).await? {
                bail!("no user named '{}'", username);
            }
            println!("deleted user '{}'", username);
            Ok(())
        }
        Command::ClearCache => match config.cache.url.as_deref() {
            Some(url) => {
                let cache = RedisPageCache::connect(url)
                    .await
                    .context("failed to connect to redis")?;
                cache.clear().await?;
                println!("cleared cached pages");
                Ok(())
            }
            None => {
                tracing::info!("no shared cache configured; in-process pages expire with the server");
                Ok(())
            }
        },
    }
}

async fn connect(config: &Config) -> anyhow::Result<PgRepository> {
    let pool = create_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    Ok(PgRepository::new(pool))
}

/// Performs HTTP health check against the running service
async fn healthcheck(config: &Config) -> anyhow::Result<()> {
    let url = format!("http://127.0.0.1:{}/health", config.app.port);

    let resp = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .with_context(|| format!("healthcheck error: {}", url))?;
    if !resp.status().is_success() {
        bail!("healthcheck failed: HTTP {}", resp.status());
    }
    tracing::info!("Healthcheck passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Command> {
        Command::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_serves() {
        assert_eq!(parse(&[]).unwrap(), Command::Serve);
        assert_eq!(parse(&["serve"]).unwrap(), Command::Serve);
    }

    #[test]
    fn create_group_takes_optional_description() {
        assert_eq!(
            parse(&["create-group", "cats", "Cats"]).unwrap(),
            Command::CreateGroup {
                slug: "cats".into(),
                title: "Cats".into(),
                description: String::new(),
            }
        );
        assert!(parse(&["create-group", "cats"]).is_err());
    }

    #[test]
    fn create_group_validates_slug_and_title() {
        assert!(parse(&["create-group", "cats-and_dogs-2", "Pets"]).is_ok());
        assert!(parse(&["create-group", "cats and dogs", "Pets"]).is_err());
        assert!(parse(&["create-group", "../admin", "Pets"]).is_err());
        assert!(parse(&["create-group", "кошки", "Cats"]).is_err());
        assert!(parse(&["create-group", &"s".repeat(51), "Pets"]).is_err());
        assert!(parse(&["create-group", &"s".repeat(50), "Pets"]).is_ok());
        assert!(parse(&["create-group", "cats", &"t".repeat(201)]).is_err());
        assert!(parse(&["create-group", "cats", "  "]).is_err());
    }

    #[test]
    fn clear_cache_takes_no_arguments() {
        assert_eq!(parse(&["clear-cache"]).unwrap(), Command::ClearCache);
        assert!(parse(&["clear-cache", "now"]).is_err());
    }

    #[test]
    fn unknown_or_extra_arguments_fail() {
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["migrate", "now"]).is_err());
    }
}
