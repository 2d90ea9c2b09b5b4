//! Output formatting for CLI display
//!
//! Helpers that render posts, clauses and summaries. Colors are applied with
//! `colored`, which honours `NO_COLOR` and non-terminal output.

use colored::Colorize;

use crate::model::Post;
use crate::query::{Clause, Polarity, Term};

/// Format a post id, with its tags unless `quiet`
#[must_use]
pub fn post_line(post: &Post, quiet: bool) -> String {
    if quiet {
        return post.id.to_string();
    }
    let tags: Vec<&str> = post.tag_names().collect();
    if tags.is_empty() {
        format!("  {} (no tags)", post.id.to_string().bold())
    } else {
        format!("  {} [{}]", post.id.to_string().bold(), tags.join(", "))
    }
}

/// Format a bare post id
#[must_use]
pub fn post_id(id: u64, quiet: bool) -> String {
    if quiet {
        id.to_string()
    } else {
        format!("  {}", id.to_string().bold())
    }
}

/// Format a token from the tokenizer
#[must_use]
pub fn term(term: &Term) -> String {
    let quoted = if term.quoted { " (quoted)" } else { "" };
    format!("  {}{}{quoted}", term.prefix.as_str().yellow(), term.body)
}

/// Format a parsed clause, colored by polarity
#[must_use]
pub fn clause(clause: &Clause) -> String {
    let text = clause.to_string();
    let colored = match clause.polarity {
        Polarity::Required => text.green(),
        Polarity::Excluded => text.red(),
        Polarity::Optional => text.cyan(),
    };
    format!("  {colored}")
}

/// Section heading
#[must_use]
pub fn heading(title: &str) -> String {
    format!("{}", title.bold())
}

/// Summary line for a search
#[must_use]
pub fn result_summary(count: usize, query: &str) -> String {
    if count == 0 {
        format!("No posts found matching '{query}'")
    } else {
        format!("Found {count} post(s) matching '{query}':")
    }
}

/// Success message
#[must_use]
pub fn success(message: &str) -> String {
    format!("{}", message.green())
}

/// Error message
#[must_use]
pub fn error(message: &str) -> String {
    format!("{} {message}", "error:".red().bold())
}
