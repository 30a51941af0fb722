use recap_common::CountUp;
use unicode_width::UnicodeWidthStr;

const BLOCK_TAGS: &[&str] = &["p", "div", "section", "li", "h1", "h2", "h3", "h4", "h5", "h6", "br", "tr"];

/// Flattens a server-rendered slide fragment into terminal lines.
pub fn html_to_lines(html: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        current.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[open + 1..open + close];
        if is_block_boundary(tag) {
            push_line(&mut lines, &mut current);
        }
        rest = &rest[open + close + 1..];
    }
    current.push_str(rest);
    push_line(&mut lines, &mut current);
    lines
}

fn is_block_boundary(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    BLOCK_TAGS.contains(&name.as_str())
}

fn push_line(lines: &mut Vec<String>, current: &mut String) {
    let text = decode_entities(current.split_whitespace().collect::<Vec<_>>().join(" ").as_str());
    if !text.is_empty() {
        lines.push(text);
    }
    current.clear();
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Replaces each count-up's final text with its frame at `progress`.
pub fn apply_count_ups(lines: &[String], count_ups: &[CountUp], progress: f64) -> Vec<String> {
    let mut out = lines.to_vec();
    let mut from_line = 0;
    for count_up in count_ups {
        let final_text = count_up.render(count_up.target);
        let found = out
            .iter()
            .enumerate()
            .skip(from_line)
            .find(|(_, line)| line.contains(&final_text))
            .map(|(i, _)| i);
        if let Some(i) = found {
            out[i] = out[i].replacen(&final_text, &count_up.frame(progress), 1);
            from_line = i;
        }
    }
    out
}

/// Pads `line` on the left so it sits centered in `width` columns.
pub fn centered(line: &str, width: u16) -> String {
    let used = UnicodeWidthStr::width(line);
    let pad = (width as usize).saturating_sub(used) / 2;
    format!("{}{line}", " ".repeat(pad))
}
