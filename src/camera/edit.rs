//! In-place edits of the camera keys in the document text.
//!
//! `marked-yaml` locates the lines holding the keys of one path entry; only
//! those lines are replaced, deleted or appended to. Every other byte of the
//! document, comments and quoting included, is carried over as it was.

use crate::camera::config::*;
use crate::camera::document;
use crate::error::ConfigError;
use serde_yaml::Value;

/// What a save does to one recognized key.
#[derive(Debug, Clone, PartialEq)]
enum KeyEdit {
    Set(Value),
    Remove,
    Keep,
}

/// Per-key edits for `config`, in the order new keys are appended.
fn planned_edits(config: &CameraConfig) -> [(&'static str, KeyEdit); 8] {
    let count = |value: u32| {
        if value > 0 {
            KeyEdit::Set(Value::from(value))
        } else {
            KeyEdit::Remove
        }
    };
    let text = |value: &str| {
        if value.is_empty() {
            KeyEdit::Remove
        } else {
            KeyEdit::Set(Value::String(value.to_string()))
        }
    };
    let lens = match config.lens_position {
        LensPosition::Untouched => KeyEdit::Keep,
        LensPosition::Set(value) => KeyEdit::Set(Value::from(value)),
        LensPosition::Cleared => KeyEdit::Remove,
    };

    [
        (KEY_VFLIP, KeyEdit::Set(Value::Bool(config.vflip))),
        (KEY_HFLIP, KeyEdit::Set(Value::Bool(config.hflip))),
        (KEY_WIDTH, count(config.width)),
        (KEY_HEIGHT, count(config.height)),
        (KEY_AWB, text(&config.awb)),
        (KEY_MODE, text(&config.mode)),
        (KEY_AF_MODE, text(&config.af_mode)),
        (KEY_LENS_POSITION, lens),
    ]
}

/// One key of the path entry and the lines `[start, end)` it occupies.
#[derive(Debug)]
struct Entry {
    key: String,
    start: usize,
    end: usize,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_filler(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

fn is_sequence_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed == "-" || trimmed.starts_with("- ")
}

/// Length of the key token (quotes included) when `line` opens a block
/// mapping entry for `key`.
fn key_token_len(line: &str, key: &str) -> Option<usize> {
    let body = line.trim_start_matches(' ');
    let token = [format!("\"{}\"", key), format!("'{}'", key), key.to_string()]
        .into_iter()
        .find(|token| body.starts_with(token.as_str()))?;
    let after = body[token.len()..].trim_start_matches(' ');
    after.starts_with(':').then_some(token.len())
}

/// End of the entry whose key sits on line `start`: the last following line
/// indented deeper than the key, or a sequence item at the key's level.
/// Trailing comments and blank lines stay outside.
fn entry_end(lines: &[&str], start: usize) -> usize {
    let indent = indent_of(lines[start]);
    let mut end = start + 1;
    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        if is_filler(line) {
            continue;
        }
        let depth = indent_of(line);
        if depth < indent || (depth == indent && !is_sequence_item(line)) {
            break;
        }
        end = index + 1;
    }
    end
}

/// Keys of `paths.<path_name>` with their line spans, in document order.
fn path_entries(text: &str, lines: &[&str], path_name: &str) -> Result<Vec<Entry>, ConfigError> {
    let root = marked_yaml::parse_yaml(0, text).map_err(|e| ConfigError::Locate(e.to_string()))?;
    let node = root
        .as_mapping()
        .and_then(|root| root.get_mapping("paths"))
        .and_then(|paths| paths.get_mapping(path_name))
        .ok_or_else(|| ConfigError::PathNotFound(path_name.to_string()))?;

    let mut entries = Vec::new();
    for (key_node, _) in node.iter() {
        let key = key_node.as_str();
        let start = key_node
            .span()
            .start()
            .and_then(|marker| marker.line().checked_sub(1))
            .filter(|&line| line < lines.len())
            .ok_or_else(|| ConfigError::Locate(format!("no position for {}", key)))?;
        if key_token_len(lines[start], key).is_none() {
            return Err(ConfigError::Layout(format!(
                "{} under path {:?} is not a block mapping entry",
                key, path_name
            )));
        }
        entries.push(Entry {
            key: key.to_string(),
            start,
            end: entry_end(lines, start),
        });
    }

    if entries.is_empty() {
        return Err(ConfigError::Layout(format!("path {:?} has no block mapping keys", path_name)));
    }
    entries.sort_by_key(|entry| entry.start);
    Ok(entries)
}

/// Plain YAML text of a scalar, quoted only where YAML needs it.
fn scalar_text(value: &Value) -> Result<String, ConfigError> {
    serde_yaml::to_string(value)
        .map(|text| text.trim_end().to_string())
        .map_err(ConfigError::Serialize)
}

/// Offset of a trailing `# comment` in the value part of a line, including
/// the whitespace before it.
fn comment_start(rest: &str) -> Option<usize> {
    let mut quote = None;
    let mut previous = ' ';
    for (offset, c) in rest.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (None, '#') if previous.is_whitespace() => {
                let value_end = rest[..offset].trim_end().len();
                return Some(value_end);
            }
            _ => {}
        }
        previous = c;
    }
    None
}

/// The replacement line for an existing single-line entry, keeping its
/// indentation, key spelling and trailing comment.
fn replace_line(line: &str, key: &str, value: &str) -> String {
    let indent = indent_of(line);
    let Some(token_len) = key_token_len(line, key) else {
        return format!("{}{}: {}", &line[..indent], key, value);
    };
    let key_end = indent + token_len;
    let rest = match line[key_end..].find(':') {
        Some(colon) => &line[key_end + colon + 1..],
        None => "",
    };
    let comment = comment_start(rest).map(|offset| &rest[offset..]).unwrap_or("");
    format!("{}: {}{}", &line[..key_end], value, comment)
}

/// Apply `config` to `paths.<path_name>` in `text`.
///
/// Recognized keys already present are rewritten on their own lines, removed
/// keys lose their lines, and new keys are appended after the last entry of
/// the path with the indentation of its first key.
pub fn apply_camera_config(text: &str, path_name: &str, config: &CameraConfig) -> Result<String, ConfigError> {
    let root = document::parse(text)?;
    document::find_path_node(&root, path_name)?;

    let lines: Vec<&str> = text.split('\n').collect();
    let entries = path_entries(text, &lines, path_name)?;
    let first = &entries[0];
    let indent = &lines[first.start][..indent_of(lines[first.start])];
    let append_at = entries.iter().map(|entry| entry.end).max().unwrap_or(first.end);

    let mut splices: Vec<(usize, usize, Vec<String>)> = Vec::new();
    let mut appended = Vec::new();
    for (key, edit) in planned_edits(config) {
        let existing = entries.iter().find(|entry| entry.key == key);
        match (edit, existing) {
            (KeyEdit::Keep, _) | (KeyEdit::Remove, None) => {}
            (KeyEdit::Remove, Some(entry)) => splices.push((entry.start, entry.end, Vec::new())),
            (KeyEdit::Set(value), Some(entry)) => {
                let line = replace_line(lines[entry.start], key, &scalar_text(&value)?);
                splices.push((entry.start, entry.end, vec![line]));
            }
            (KeyEdit::Set(value), None) => {
                appended.push(format!("{}{}: {}", indent, key, scalar_text(&value)?));
            }
        }
    }
    if !appended.is_empty() {
        splices.push((append_at, append_at, appended));
    }

    let mut output: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
    splices.sort_by(|a, b| b.0.cmp(&a.0));
    for (start, end, replacement) in splices {
        output.splice(start..end, replacement);
    }
    Ok(output.join("\n"))
}
