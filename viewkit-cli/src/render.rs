//! Human- and machine-readable renderings of views.

use std::fmt::Write;

use serde_json::Value as JsonValue;
use viewkit::View;

/// Renders the given view as plain text. The revision history is only
/// included if `full` is set.
pub fn render_view(view: &View, full: bool) -> String {
    let mut out = String::new();
    // Writing to a `String` cannot fail.
    let _ = write_view(&mut out, view, full);
    out
}

fn write_view(out: &mut String, view: &View, full: bool) -> std::fmt::Result {
    writeln!(out, "View: {}", view.name)?;
    match view.query.as_deref() {
        Some(query) if !query.is_empty() => writeln!(out, "Query:\n{}\n", query)?,
        _ => writeln!(out, "Query: <none>")?,
    }
    match view.sdl.as_deref() {
        Some(sdl) if !sdl.is_empty() => writeln!(out, "SDL:\n{}\n", sdl)?,
        _ => writeln!(out, "SDL: <none>")?,
    }
    writeln!(out, "Lenses:")?;
    if view.transform.is_empty() {
        writeln!(out, " - (empty)")?;
    }
    for lens in &view.transform.lenses {
        writeln!(out, " - {} ({})", lens.label, lens.path)?;
        if !lens.arguments.is_empty() {
            writeln!(out, "   Arguments:")?;
            for (k, v) in &lens.arguments {
                writeln!(out, "     {}: {}", k, v)?;
            }
        }
    }
    writeln!(out)?;

    let meta = &view.metadata;
    writeln!(out, "Metadata:")?;
    writeln!(out, " - Version: {}", meta.version)?;
    writeln!(out, " - Total: {}", meta.total)?;
    writeln!(out, " - Created At: {}", meta.created_at.to_rfc3339())?;
    writeln!(out, " - Updated At: {}", meta.updated_at.to_rfc3339())?;

    if full && !meta.revisions.is_empty() {
        writeln!(out, "Revisions ({}):", meta.revisions.len())?;
        for rev in &meta.revisions {
            writeln!(
                out,
                " - Version {} ({}):\n   {}",
                rev.version,
                rev.timestamp.to_rfc3339(),
                rev.diff
            )?;
        }
    }
    Ok(())
}

/// Renders the given view as pretty-printed JSON. The revision history is
/// only included if `full` is set.
pub fn render_view_json(view: &View, full: bool) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(view)?;
    if !full {
        if let Some(JsonValue::Object(meta)) = value.get_mut("metadata") {
            meta.remove("revisions");
        }
    }
    serde_json::to_string_pretty(&value)
}

#[cfg(test)]
mod test {
    use super::*;
    use viewkit::{Revision, Timestamp};

    fn view() -> View {
        let mut view = View::new("testrollback", Timestamp::from_unix(0));
        view.query = Some("Log { address }".to_string());
        view.metadata.version = 1;
        view.metadata.total = 1;
        view.metadata.revisions.push(Revision {
            version: 0,
            timestamp: Timestamp::from_unix(60),
            diff: r#"{"query":null}"#.to_string(),
        });
        view
    }

    #[test]
    fn plain_text_rendering() {
        let expected = "View: testrollback
Query:
Log { address }

SDL: <none>
Lenses:
 - (empty)

Metadata:
 - Version: 1
 - Total: 1
 - Created At: 1970-01-01T00:00:00Z
 - Updated At: 1970-01-01T00:00:00Z
";
        assert_eq!(render_view(&view(), false), expected);
        let full = render_view(&view(), true);
        assert!(full.starts_with(expected));
        assert!(full.ends_with("Revisions (1):\n - Version 0 (1970-01-01T00:01:00Z):\n   {\"query\":null}\n"));
    }

    #[test]
    fn json_rendering_hides_revisions_unless_full() {
        let short: JsonValue = serde_json::from_str(&render_view_json(&view(), false).unwrap()).unwrap();
        assert!(short["metadata"].get("revisions").is_none());
        assert_eq!(short["metadata"]["_v"], 1);
        let full: JsonValue = serde_json::from_str(&render_view_json(&view(), true).unwrap()).unwrap();
        assert_eq!(full["metadata"]["revisions"].as_array().unwrap().len(), 1);
    }
}
