//! Subcommand handlers.

use anyhow::{Context, Result};
use serde::Serialize;
use skillmart_catalog::achievements::label;
use skillmart_catalog::{
    Author, CatalogError, ProfileSummary, SkillDraft, SkillPublisher, SkillRecord, SlugResolver,
    SkillUpdate, is_valid_slug, load_profile, sanitize, slug_from_filename,
};
use skillmart_store::{ActivityStore, Database, SkillStore};
use tracing::{info, warn};

use crate::cli::Commands;
use crate::config::SkillmartConfig;

/// Shared state for handlers that touch the database.
struct CommandContext {
    config: SkillmartConfig,
    json: bool,
}

pub async fn run(command: Commands, config: SkillmartConfig, json: bool) -> Result<()> {
    let ctx = CommandContext { config, json };

    match command {
        Commands::Slugify {
            text,
            max_length,
            filename,
        } => cmd_slugify(&ctx, &text, max_length, filename),
        Commands::Validate { slug } => cmd_validate(&ctx, &slug),
        Commands::Migrate => cmd_migrate(&ctx).await,
        Commands::Publish {
            name,
            archive,
            author,
            username,
            slug,
            description,
            version,
            tags,
            dry_run,
        } => {
            let mut draft = match (name, archive) {
                (_, Some(archive)) => {
                    let file_name = archive
                        .file_name()
                        .and_then(|n| n.to_str())
                        .with_context(|| {
                            format!("archive path has no file name: {}", archive.display())
                        })?;
                    SkillDraft::from_archive(file_name, description)
                }
                (Some(name), None) => SkillDraft::new(name, description),
                (None, None) => anyhow::bail!("either --name or --archive is required"),
            };
            if slug.is_some() {
                draft.slug = slug;
            }
            draft.version = version;
            draft.tags = tags;

            let author = Author::new(author, username);
            cmd_publish(&ctx, draft, &author, dry_run).await
        }
        Commands::Show { slug } => cmd_show(&ctx, &slug).await,
        Commands::Update {
            slug,
            name,
            description,
            version,
            tags,
        } => {
            let update = SkillUpdate {
                name,
                description,
                version,
                tags: (!tags.is_empty()).then_some(tags),
            };
            cmd_update(&ctx, &slug, update).await
        }
        Commands::Delete { slug } => cmd_delete(&ctx, &slug).await,
        Commands::Install { slug, user } => cmd_install(&ctx, &slug, &user).await,
        Commands::Uninstall { slug, user } => cmd_uninstall(&ctx, &slug, &user).await,
        Commands::Use { slug, user } => cmd_use(&ctx, &slug, &user).await,
        Commands::Review {
            slug,
            user,
            rating,
            body,
        } => cmd_review(&ctx, &slug, &user, rating, body.as_deref()).await,
        Commands::Profile { user } => cmd_profile(&ctx, &user).await,
    }
}

// ---------------------------------------------------------------------------
// Offline commands
// ---------------------------------------------------------------------------

fn cmd_slugify(
    ctx: &CommandContext,
    text: &str,
    max_length: Option<usize>,
    filename: bool,
) -> Result<()> {
    let max_length = max_length.unwrap_or(ctx.config.slugs.max_length);
    let slug = if filename {
        slug_from_filename(text)
    } else {
        sanitize(text, max_length)
    };

    if ctx.json {
        return print_json(&serde_json::json!({ "input": text, "slug": slug }));
    }
    if slug.is_empty() {
        println!("  (empty) -- `{text}` has no characters usable in a slug");
    } else {
        println!("  {slug}");
    }
    Ok(())
}

fn cmd_validate(ctx: &CommandContext, slug: &str) -> Result<()> {
    let valid = is_valid_slug(slug);
    if ctx.json {
        return print_json(&serde_json::json!({ "slug": slug, "valid": valid }));
    }
    if valid {
        println!("  `{slug}` is a valid slug");
    } else {
        let suggestion = sanitize(slug, ctx.config.slugs.max_length);
        println!("  `{slug}` is NOT a valid slug; it would sanitize to `{suggestion}`");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Catalog commands
// ---------------------------------------------------------------------------

async fn cmd_migrate(ctx: &CommandContext) -> Result<()> {
    let db = open_db(&ctx.config).await?;
    let version = db.schema_version().await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "schema_version": version }));
    }
    let location = db
        .path()
        .map_or_else(|| "memory".to_string(), |p| p.display().to_string());
    println!("  Database ready at {location} (schema v{version})");
    Ok(())
}

async fn cmd_publish(
    ctx: &CommandContext,
    draft: SkillDraft,
    author: &Author,
    dry_run: bool,
) -> Result<()> {
    let db = open_db(&ctx.config).await?;
    let resolver = SlugResolver::new(ctx.config.slugs.max_attempts);
    let publisher = SkillPublisher::new(SkillStore::new(db))
        .with_resolver(resolver)
        .with_max_length(ctx.config.slugs.max_length);

    if dry_run {
        let base = publisher.base_slug(&draft)?;
        let resolution = resolver
            .resolve(publisher.repository(), &base, author.username.as_deref())
            .await
            .map_err(explain_exhaustion)?;
        if ctx.json {
            return print_json(&resolution);
        }
        println!(
            "  Would publish as `{}`{} (candidate {} of {})",
            resolution.slug,
            modified_note(resolution.modified),
            resolution.attempt + 1,
            resolver.max_attempts()
        );
        return Ok(());
    }

    let published = publisher
        .publish(draft, author)
        .await
        .map_err(explain_exhaustion)?;

    if ctx.json {
        return print_json(&published);
    }
    println!(
        "  Published `{}` as `{}`{}",
        published.record.name,
        published.record.slug,
        modified_note(published.slug_modified)
    );
    Ok(())
}

async fn cmd_show(ctx: &CommandContext, slug: &str) -> Result<()> {
    let store = SkillStore::new(open_db(&ctx.config).await?);
    let record = store
        .get(slug)
        .await?
        .with_context(|| format!("skill not found: {slug}"))?;
    if ctx.json {
        return print_json(&record);
    }
    print_record(&record);
    Ok(())
}

async fn cmd_update(ctx: &CommandContext, slug: &str, update: SkillUpdate) -> Result<()> {
    if update.is_empty() {
        warn!(slug = %slug, "nothing to update");
    }
    let store = SkillStore::new(open_db(&ctx.config).await?);
    let record = store.update(slug, update).await?;
    if ctx.json {
        return print_json(&record);
    }
    print_record(&record);
    Ok(())
}

async fn cmd_delete(ctx: &CommandContext, slug: &str) -> Result<()> {
    let store = SkillStore::new(open_db(&ctx.config).await?);
    let deleted = store.delete(slug).await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "slug": slug, "deleted": deleted }));
    }
    if deleted {
        println!("  Deleted `{slug}`");
    } else {
        println!("  No skill with slug `{slug}`");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Activity commands
// ---------------------------------------------------------------------------

async fn cmd_install(ctx: &CommandContext, slug: &str, user: &str) -> Result<()> {
    let activity = ActivityStore::new(open_db(&ctx.config).await?);
    let new = activity.record_install(user, slug).await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "slug": slug, "user": user, "new": new }));
    }
    if new {
        println!("  Installed `{slug}` for {user}");
    } else {
        println!("  `{slug}` is already installed for {user}");
    }
    Ok(())
}

async fn cmd_uninstall(ctx: &CommandContext, slug: &str, user: &str) -> Result<()> {
    let activity = ActivityStore::new(open_db(&ctx.config).await?);
    let removed = activity.uninstall(user, slug).await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "slug": slug, "user": user, "removed": removed }));
    }
    if removed {
        println!("  Uninstalled `{slug}` for {user}");
    } else {
        println!("  `{slug}` was not installed for {user}");
    }
    Ok(())
}

async fn cmd_use(ctx: &CommandContext, slug: &str, user: &str) -> Result<()> {
    let activity = ActivityStore::new(open_db(&ctx.config).await?);
    let usage = activity.record_usage(user, slug).await?;
    if ctx.json {
        return print_json(&serde_json::json!({ "slug": slug, "user": user, "usage_count": usage }));
    }
    println!("  `{slug}` used {usage} time(s) by {user}");
    Ok(())
}

async fn cmd_review(
    ctx: &CommandContext,
    slug: &str,
    user: &str,
    rating: u8,
    body: Option<&str>,
) -> Result<()> {
    let activity = ActivityStore::new(open_db(&ctx.config).await?);
    let review = activity.add_review(user, slug, rating, body).await?;
    if ctx.json {
        return print_json(&review);
    }
    println!("  {user} rated `{slug}` {}", stars(review.rating));
    Ok(())
}

/// Profile output: the summary plus the skills the user has published.
#[derive(Serialize)]
struct ProfileView {
    user: String,
    #[serde(flatten)]
    summary: ProfileSummary,
    skills: Vec<SkillRecord>,
}

async fn profile_view(db: Database, user: &str) -> Result<ProfileView> {
    let summary = load_profile(&ActivityStore::new(db.clone()), user).await?;
    let skills = SkillStore::new(db).list_by_author(user).await?;
    Ok(ProfileView {
        user: user.to_owned(),
        summary,
        skills,
    })
}

async fn cmd_profile(ctx: &CommandContext, user: &str) -> Result<()> {
    let view = profile_view(open_db(&ctx.config).await?, user).await?;
    if ctx.json {
        return print_json(&view);
    }
    print_profile(&view);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn open_db(config: &SkillmartConfig) -> Result<Database> {
    let path = config.database.path.clone();
    let db = Database::open_and_migrate(path.clone())
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    info!(path = %path.display(), "store initialized");
    Ok(db)
}

/// Attach the advisory fallback to an exhaustion error.
fn explain_exhaustion(err: CatalogError) -> anyhow::Error {
    match &err {
        CatalogError::SlugExhausted { suggestion, .. } => {
            let hint = format!("choose a different name, or pass --slug {suggestion}");
            anyhow::Error::new(err).context(hint)
        }
        _ => err.into(),
    }
}

fn modified_note(modified: bool) -> &'static str {
    if modified {
        " (name was taken; slug adjusted)"
    } else {
        ""
    }
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "*".repeat(filled), ".".repeat(5 - filled))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_record(record: &SkillRecord) {
    println!();
    println!("  {} ({})", record.name, record.slug);
    if !record.description.is_empty() {
        println!("    {}", record.description);
    }
    match &record.author_username {
        Some(username) => println!("    author:   {} (@{username})", record.author_id),
        None => println!("    author:   {}", record.author_id),
    }
    if let Some(version) = &record.version {
        println!("    version:  {version}");
    }
    if !record.tags.is_empty() {
        println!("    tags:     {}", record.tags.join(", "));
    }
    println!("    installs: {}", record.install_count);
    println!("    rating:   {:.1} ({} reviews)", record.rating, record.rating_count);
    println!();
}

fn print_profile(view: &ProfileView) {
    let (user, summary) = (&view.user, &view.summary);
    let c = &summary.counters;
    println!();
    println!("  Profile: {user}");
    println!("  ==================");
    println!(
        "  installed {} | uses {} | published {} | installs of own skills {} | reviews {}",
        c.installed_count, c.usage_count, c.created_count, c.total_installs, c.review_count
    );
    println!("  average rating of published skills: {:.2}", summary.average_rating);
    println!();
    println!(
        "  Achievements ({}/{}):",
        summary.unlocked_count,
        summary.achievements.len()
    );
    for achievement in &summary.achievements {
        let title = label(achievement.id).map_or(achievement.id, |l| l.title);
        let mark = if achievement.unlocked { "[x]" } else { "[ ]" };
        println!(
            "    {mark} {title:<18} {:>5.1}%  ({}/{})",
            achievement.progress, achievement.current, achievement.threshold
        );
    }
    if !view.skills.is_empty() {
        println!();
        println!("  Published skills ({}):", view.skills.len());
        for skill in &view.skills {
            println!(
                "    {:<24} {:>5} installs  {:.1} ({} reviews)",
                skill.slug, skill.install_count, skill.rating, skill.rating_count
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_render() {
        assert_eq!(stars(5), "*****");
        assert_eq!(stars(3), "***..");
        assert_eq!(stars(1), "*....");
    }

    #[test]
    fn exhaustion_hint_mentions_suggestion() {
        let err = explain_exhaustion(CatalogError::SlugExhausted {
            base: "tool".into(),
            attempts: 10,
            suggestion: "tool-bob-123".into(),
        });
        let rendered = format!("{err:#}");
        assert!(rendered.contains("--slug tool-bob-123"));
        assert!(rendered.contains("no free slug"));
    }

    #[tokio::test]
    async fn publish_and_profile_against_temp_db() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SkillmartConfig::default();
        config.database.path = dir.path().join("cli.db");
        let ctx = CommandContext { config, json: true };

        let author = Author::new("u1", Some("bob".into()));
        cmd_publish(&ctx, SkillDraft::new("Cli Skill", ""), &author, false)
            .await
            .unwrap();
        cmd_publish(&ctx, SkillDraft::new("Cli Skill", ""), &author, true)
            .await
            .unwrap();
        cmd_install(&ctx, "cli-skill", "u2").await.unwrap();
        cmd_review(&ctx, "cli-skill", "u2", 4, None).await.unwrap();
        cmd_profile(&ctx, "u1").await.unwrap();

        let text = CommandContext {
            config: ctx.config.clone(),
            json: false,
        };
        cmd_migrate(&text).await.unwrap();
        cmd_publish(&text, SkillDraft::new("Cli Skill", ""), &author, true)
            .await
            .unwrap();
        cmd_profile(&text, "u1").await.unwrap();

        let store = SkillStore::new(open_db(&ctx.config).await.unwrap());
        let record = store.get("cli-skill").await.unwrap().unwrap();
        assert_eq!(record.install_count, 1);
        assert_eq!(record.rating_count, 1);
        // Dry run stored nothing.
        assert!(store.get("cli-skill-bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_view_lists_published_skills() {
        let db = Database::in_memory_migrated().await.unwrap();
        let publisher = SkillPublisher::new(SkillStore::new(db.clone()));
        let author = Author::new("u1", None);
        for name in ["First Tool", "Second Tool"] {
            publisher
                .publish(SkillDraft::new(name, ""), &author)
                .await
                .unwrap();
        }
        ActivityStore::new(db.clone())
            .record_install("u2", "first-tool")
            .await
            .unwrap();

        let view = profile_view(db, "u1").await.unwrap();
        let mut slugs: Vec<_> = view.skills.iter().map(|s| s.slug.as_str()).collect();
        slugs.sort_unstable();
        assert_eq!(slugs, ["first-tool", "second-tool"]);
        assert_eq!(view.summary.counters.created_count, 2);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["user"], "u1");
        assert_eq!(json["counters"]["total_installs"], 1);
        assert_eq!(json["skills"].as_array().unwrap().len(), 2);
    }
}
