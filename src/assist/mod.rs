//! Natural-language to SQL assist.
//!
//! The model itself lives outside this crate. [`SqlGenerator`] is the seam; callers pass the
//! schema script from [`Database::schema_sql`](crate::Database::schema_sql) as context.

mod command;

pub use command::CommandGenerator;

use crate::Result;

/// Something that can turn a request plus schema into SQL text.
///
/// Implementations return [`Error::AssistUnavailable`](crate::Error::AssistUnavailable) when no
/// backend is reachable and [`Error::AssistPermission`](crate::Error::AssistPermission) when the
/// user has not consented. Returned text may still carry Markdown fences; use [`generate_sql`].
pub trait SqlGenerator {
    fn generate(&self, prompt: &str, schema_sql: &str) -> Result<String>;
}

/// Ask `generator` for SQL and strip any code fences from its answer.
pub fn generate_sql(generator: &dyn SqlGenerator, prompt: &str, schema_sql: &str) -> Result<String> {
    let raw = generator.generate(prompt, schema_sql)?;
    Ok(strip_code_fences(&raw))
}

/// Full instruction text sent to the model.
pub fn build_prompt(prompt: &str, schema_sql: &str) -> String {
    format!(
        "You are a SQLite expert. Given the database schema below, generate ONLY the SQL query \
         (no explanation, no markdown fences) for the user's request.\n\n\
         Schema:\n{schema_sql}\n\nRequest: {prompt}"
    )
}

/// Remove a leading ```` ``` ```` fence (with optional language tag) and a trailing one.
pub fn strip_code_fences(text: &str) -> String {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Language tag runs to the end of the fence line.
        s = match rest.find('\n') {
            Some(nl) if rest[..nl].chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => {
                &rest[nl + 1..]
            }
            _ => rest,
        };
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim().to_string()
}
