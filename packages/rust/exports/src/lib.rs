//! Export serializers for link records.
//!
//! Pure functions from `&[PersistedLink]` to text, one per output format.
//! All of them preserve the wire field names (`slug`, `name`, `url`,
//! `is_affiliate`, `network`).

use linkforge_shared::{LinkForgeError, PersistedLink, Result};

/// SQL table name used by [`to_sql`].
const SQL_TABLE: &str = "affiliate_links";

/// Serialize records as a pretty-printed JSON array.
pub fn to_json(records: &[PersistedLink]) -> Result<String> {
    serde_json::to_string_pretty(records)
        .map_err(|e| LinkForgeError::validation(format!("JSON export failed: {e}")))
}

/// Serialize records as CSV with a fixed header row.
pub fn to_csv(records: &[PersistedLink]) -> String {
    let mut out = String::from("slug,name,url,is_affiliate,network\n");

    for record in records {
        out.push_str(&csv_field(&record.slug));
        out.push(',');
        out.push_str(&csv_field(&record.name));
        out.push(',');
        out.push_str(&csv_field(&record.url));
        out.push(',');
        out.push_str(if record.is_affiliate { "true" } else { "false" });
        out.push(',');
        out.push_str(&csv_field(record.network.as_deref().unwrap_or("")));
        out.push('\n');
    }

    out
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Serialize records as a SQL batch: table creation plus one upsert per
/// record (`ON CONFLICT(slug) DO UPDATE`, new value wins).
pub fn to_sql(records: &[PersistedLink]) -> String {
    let mut out = format!(
        "CREATE TABLE IF NOT EXISTS {SQL_TABLE} (\n\
         \x20 slug TEXT PRIMARY KEY,\n\
         \x20 name TEXT NOT NULL,\n\
         \x20 url TEXT NOT NULL,\n\
         \x20 is_affiliate BOOLEAN NOT NULL,\n\
         \x20 network TEXT\n\
         );\n\n"
    );

    for record in records {
        let network = match &record.network {
            Some(n) => format!("'{}'", sql_escape(n)),
            None => "NULL".to_string(),
        };

        out.push_str(&format!(
            "INSERT INTO {SQL_TABLE} (slug, name, url, is_affiliate, network)\n\
             \x20 VALUES ('{}', '{}', '{}', {}, {})\n\
             \x20 ON CONFLICT(slug) DO UPDATE SET\n\
             \x20   name = excluded.name,\n\
             \x20   url = excluded.url,\n\
             \x20   is_affiliate = excluded.is_affiliate,\n\
             \x20   network = excluded.network;\n",
            sql_escape(&record.slug),
            sql_escape(&record.name),
            sql_escape(&record.url),
            if record.is_affiliate { "TRUE" } else { "FALSE" },
            network,
        ));
    }

    out
}

/// Escape a SQL string literal by doubling single quotes.
fn sql_escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// Serialize records as a Markdown pipe table.
pub fn to_markdown(records: &[PersistedLink]) -> String {
    let mut out = String::from(
        "| Slug | Name | URL | Affiliate | Network |\n\
         | --- | --- | --- | --- | --- |\n",
    );

    for record in records {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            md_cell(&record.slug),
            md_cell(&record.name),
            md_cell(&record.url),
            if record.is_affiliate { "yes" } else { "no" },
            md_cell(record.network.as_deref().unwrap_or("—")),
        ));
    }

    out
}

/// Escape pipe characters so cell content cannot break the table.
fn md_cell(value: &str) -> String {
    value.replace('|', "\\|")
}
