//! CLI argument definitions for SkillMart.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SkillMart -- publish, install and review AI skills.
#[derive(Parser)]
#[command(
    name = "skillmart",
    version,
    about = "SkillMart -- marketplace for AI skills",
    long_about = "Publish skills under unique slugs, track installs and reviews, and \
                  inspect per-user achievements."
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to config/default.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the slug a name or file name would sanitize to.
    Slugify {
        /// Skill name or file name.
        text: String,
        /// Length cap (defaults to the configured one).
        #[arg(long)]
        max_length: Option<usize>,
        /// Treat the text as a file name and drop its extension.
        #[arg(long)]
        filename: bool,
    },

    /// Check whether a slug is well-formed.
    Validate {
        slug: String,
    },

    /// Create or upgrade the database schema.
    Migrate,

    /// Publish a new skill under a unique slug.
    Publish {
        /// Skill name as shown to users.
        #[arg(long, required_unless_present = "archive")]
        name: Option<String>,
        /// Uploaded package; name and slug are derived from its file name.
        #[arg(long, conflicts_with = "name")]
        archive: Option<PathBuf>,
        /// Publishing user's id.
        #[arg(long)]
        author: String,
        /// Publishing user's handle, used to disambiguate slugs.
        #[arg(long)]
        username: Option<String>,
        /// Explicit slug instead of one derived from the name.
        #[arg(long)]
        slug: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        version: Option<String>,
        /// Tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Resolve the slug but do not store anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a published skill.
    Show {
        slug: String,
    },

    /// Edit a published skill.
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        version: Option<String>,
        /// Replace all tags (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a published skill with its installs and reviews.
    Delete {
        slug: String,
    },

    /// Install a skill for a user.
    Install {
        slug: String,
        #[arg(long)]
        user: String,
    },

    /// Remove a user's install.
    Uninstall {
        slug: String,
        #[arg(long)]
        user: String,
    },

    /// Record one use of an installed skill.
    Use {
        slug: String,
        #[arg(long)]
        user: String,
    },

    /// Review a skill (replaces the user's earlier review).
    Review {
        slug: String,
        #[arg(long)]
        user: String,
        /// 1 to 5 stars.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
        #[arg(long)]
        body: Option<String>,
    },

    /// Show a user's achievements and average rating.
    Profile {
        user: String,
    },
}
