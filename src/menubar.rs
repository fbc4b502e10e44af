use std::io::Write;

use crossterm::{cursor, queue, style, terminal};

/// Hints shown on the top row while viewing.
pub const VIEWER_HINTS: &[&str] = &["[drag] spin", "[Ctrl+drag] fine", "[\u{2190}][\u{2192}] step", "[q][Esc] quit"];

/// Draw `items` on `row`, bolding text inside `[...]` and dimming the rest.
pub fn render_menubar(out: &mut impl Write, row: u16, items: &[&str]) -> anyhow::Result<()> {
    queue!(
        out,
        cursor::MoveTo(0, row),
        terminal::Clear(terminal::ClearType::CurrentLine),
        style::Print(" "),
    )?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            queue!(out, style::Print("  "))?;
        }
        for (text, key) in split_keys(item) {
            let attr = if key {
                style::Attribute::Bold
            } else {
                style::Attribute::Dim
            };
            queue!(
                out,
                style::SetAttribute(attr),
                style::Print(text),
                style::SetAttribute(style::Attribute::Reset),
            )?;
        }
    }
    Ok(())
}

/// Split an item into runs, flagging the bracketed ones. An unclosed bracket
/// runs to the end of the item as plain text.
fn split_keys(item: &str) -> Vec<(&str, bool)> {
    let mut runs = Vec::new();
    let mut rest = item;
    while !rest.is_empty() {
        match rest.find('[') {
            Some(open) => {
                if open > 0 {
                    runs.push((&rest[..open], false));
                }
                rest = &rest[open..];
                match rest.find(']') {
                    Some(close) => {
                        runs.push((&rest[..=close], true));
                        rest = &rest[close + 1..];
                    }
                    None => {
                        runs.push((rest, false));
                        break;
                    }
                }
            }
            None => {
                runs.push((rest, false));
                break;
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_keys_are_flagged() {
        assert_eq!(
            split_keys("[q][Esc] quit"),
            vec![("[q]", true), ("[Esc]", true), (" quit", false)]
        );
        assert_eq!(split_keys("go [x"), vec![("go ", false), ("[x", false)]);
    }
}
