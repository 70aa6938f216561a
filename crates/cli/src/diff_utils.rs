//! Line-level patches for `buildr diff --patch`

use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};

/// Content with a null byte in the first 8KB is treated as binary
pub fn is_binary(content: &[u8]) -> bool {
    content.iter().take(8192).any(|&b| b == 0)
}

/// Unified patch between the published and the local version of a file
///
/// `old` is `None` for files that are new since the last publish.
pub fn render_patch(path: &str, old: Option<&[u8]>, new: &[u8], context_lines: usize) -> String {
    let mut output = String::new();
    let from = if old.is_some() { format!("a/{}", path) } else { "/dev/null".to_string() };
    output.push_str(&format!("{}\n", format!("--- {}", from).bold()));
    output.push_str(&format!("{}\n", format!("+++ b/{}", path).bold()));

    let old = old.unwrap_or_default();
    if is_binary(old) || is_binary(new) {
        output.push_str(&format!(
            "    {}\n",
            format!("binary file ({} -> {} bytes)", old.len(), new.len()).dimmed()
        ));
        return output;
    }

    let old_text = String::from_utf8_lossy(old);
    let new_text = String::from_utf8_lossy(new);
    let diff = TextDiff::from_lines(old_text.as_ref(), new_text.as_ref());

    for hunk in diff.unified_diff().context_radius(context_lines).iter_hunks() {
        output.push_str(&format!("{}\n", hunk.header().to_string().cyan()));
        for change in hunk.iter_changes() {
            let line = change.value();
            let rendered = match change.tag() {
                ChangeTag::Delete => format!("-{}", line).red().to_string(),
                ChangeTag::Insert => format!("+{}", line).green().to_string(),
                ChangeTag::Equal => format!(" {}", line).dimmed().to_string(),
            };
            output.push_str(&rendered);
            if !line.ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}
