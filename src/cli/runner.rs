use crate::cursor::{self, CursorCodec};
use crate::token;
use std::error::Error;
use std::io::Write;

use super::command::Command;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

/// Runs `cmd` with human-readable output on stdout.
///
/// # Errors
/// See [`run_with_format`].
pub fn run(codec: &CursorCodec, cmd: Command) -> Result<(), Box<dyn Error>> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_format(codec, cmd, OutputMode::Human, &mut out)
}

/// Runs `cmd`, writing its result to `out`.
///
/// # Errors
/// Returns an error if the input is not valid JSON, the token or cursor cannot be decoded,
/// or writing fails.
pub fn run_with_format(
    codec: &CursorCodec,
    cmd: Command,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Encode { json } => {
            let payload: serde_json::Value = serde_json::from_str(&json)?;
            let token = token::encode(&payload)?;
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::json!({"token": token, "length": token.len()}))?,
                OutputMode::Plain => writeln!(out, "{token}")?,
                OutputMode::Human => writeln!(out, "token={token} length={}", token.len())?,
            }
            Ok(())
        }
        Command::Decode { token } => {
            let decoded = token::decode_with_limit(Some(&token), codec.config().max_inflated_bytes);
            match (decoded, mode) {
                (Ok(value), OutputMode::Json | OutputMode::Plain) => writeln!(out, "{value}")?,
                (Ok(value), OutputMode::Human) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
                (Err(e), OutputMode::Json) => {
                    let fault = e.token_fault().map(|f| f.to_string());
                    writeln!(out, "{}", serde_json::json!({"error": e.to_string(), "fault": fault}))?;
                    return Err(Box::new(e));
                }
                (Err(e), _) => return Err(Box::new(e)),
            }
            Ok(())
        }
        Command::Inspect { cursor } => {
            let p = codec.parse(&cursor)?;
            let range = p.item_range();
            let cursors = [
                ("current_page", p.current_page_cursor(codec)?),
                ("next_page", p.next_page_cursor(codec)?),
                ("previous_page", p.previous_page_cursor(codec)?),
                ("first_page", p.first_page_cursor(codec)?),
                ("last_page", p.last_page_cursor(codec)?),
                ("recordset", Some(p.recordset_cursor(codec)?)),
            ];
            match mode {
                OutputMode::Json => {
                    let mut report = cursor::to_wire(&p);
                    if let Some(obj) = report.as_object_mut() {
                        obj.insert("item_range".into(), serde_json::json!([range.start(), range.end()]));
                        obj.insert("snapshot".into(), serde_json::Value::Bool(p.is_snapshot()));
                        let links: serde_json::Map<String, serde_json::Value> = cursors
                            .iter()
                            .map(|(k, v)| ((*k).to_string(), v.clone().map_or(serde_json::Value::Null, serde_json::Value::String)))
                            .collect();
                        obj.insert("cursors".into(), serde_json::Value::Object(links));
                    }
                    writeln!(out, "{report}")?;
                }
                OutputMode::Plain => {
                    writeln!(
                        out,
                        "offset={} per_page={} total_items={} range={}..{}",
                        p.offset,
                        p.per_page,
                        p.total_items,
                        range.start(),
                        range.end()
                    )?;
                }
                OutputMode::Human => {
                    writeln!(out, "query={}", serde_json::Value::Object(p.query.clone()))?;
                    writeln!(out, "sort={}", p.sort.visible().to_json())?;
                    if p.sort.is_raw() || matches!(&p.sort, crate::sort::Sort::Map(m) if m.has_raw_keys()) {
                        writeln!(out, "sort_has_raw_expression=true")?;
                    }
                    writeln!(out, "offset={} per_page={} total_items={}", p.offset, p.per_page, p.total_items)?;
                    writeln!(out, "items={}..{}", range.start(), range.end())?;
                    for (name, token) in &cursors {
                        writeln!(out, "{name}={}", token.as_deref().unwrap_or("-"))?;
                    }
                }
            }
            Ok(())
        }
    }
}

