//! Block-level definition list extension for the markdown grammar.
//!
//! The base GFM grammar has no term/definition construct, so the scanner
//! here runs ahead of it: source is split into ordered [`Block`]s, where
//! runs of ordinary markdown are handed to the base grammar untouched and
//! recognized definition lists become structured tokens. Block rules are
//! tried in order at each candidate line and the first match wins; when
//! the extension declares no match, the line simply stays in the current
//! markdown run.
//!
//! The recognized shape is one term line immediately followed by one or
//! more `: `-marked definition lines:
//!
//! ```text
//! Term
//! : First definition
//! : Second definition
//! ```

/// One block-level token produced by [`scan`].
#[derive(Debug, PartialEq, Eq)]
pub enum Block<'a> {
    /// A contiguous run of source owned by the base grammar.
    Markdown(&'a str),
    /// A recognized definition list construct.
    DefinitionList(DefinitionList<'a>),
}

/// The structured payload of a definition list token.
#[derive(Debug, PartialEq, Eq)]
pub struct DefinitionList<'a> {
    pub entries: Vec<Entry<'a>>,
}

/// A single term with its definitions.
///
/// Invariant: `definitions` is never empty — a candidate term with no
/// definition lines is backtracked instead of emitted.
#[derive(Debug, PartialEq, Eq)]
pub struct Entry<'a> {
    pub term: &'a str,
    pub definitions: Vec<&'a str>,
}

/// Byte range of one source line, newline and carriage return excluded.
#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    end: usize,
}

/// Splits `source` into blocks: markdown runs interleaved with
/// definition list tokens, in source order.
pub fn scan(source: &str) -> Vec<Block<'_>> {
    let lines = split_lines(source);
    let mut blocks = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut fence: Option<char> = None;
    let mut index = 0;

    while index < lines.len() {
        let text = line_text(source, &lines, index);

        if let Some(marker) = fence {
            if fence_marker(text) == Some(marker) {
                fence = None;
            }
            run_start.get_or_insert(index);
            index += 1;
            continue;
        }
        if let Some(marker) = fence_marker(text) {
            fence = Some(marker);
            run_start.get_or_insert(index);
            index += 1;
            continue;
        }

        if starts_definition_list(source, &lines, index) {
            if let Some(start) = run_start.take() {
                blocks.push(markdown_run(source, &lines, start, index));
            }
            let (list, next) = tokenize(source, &lines, index);
            blocks.push(Block::DefinitionList(list));
            index = next;
            continue;
        }

        run_start.get_or_insert(index);
        index += 1;
    }

    if let Some(start) = run_start {
        blocks.push(markdown_run(source, &lines, start, lines.len()));
    }
    blocks
}

/// Cheap pre-check: a term line immediately followed by a definition
/// marker line. Anything else defers to the base grammar without
/// attempting tokenization.
fn starts_definition_list(source: &str, lines: &[Line], index: usize) -> bool {
    is_term_line(line_text(source, lines, index))
        && index + 1 < lines.len()
        && is_definition_line(line_text(source, lines, index + 1))
}

/// Collects term/definition entries starting at `index`, which must have
/// passed [`starts_definition_list`]. Returns the token and the line
/// index just past the consumed span.
fn tokenize<'a>(source: &'a str, lines: &[Line], index: usize) -> (DefinitionList<'a>, usize) {
    let mut entries = Vec::new();
    let mut cursor = index;

    while cursor < lines.len() {
        let term = line_text(source, lines, cursor);
        if !is_term_line(term) {
            break;
        }

        let mut definitions = Vec::new();
        let mut next = cursor + 1;
        while next < lines.len() {
            let line = line_text(source, lines, next);
            if !is_definition_line(line) {
                break;
            }
            definitions.push(strip_definition_marker(line));
            next += 1;
        }

        if definitions.is_empty() {
            // Backtrack: a term with no definitions is not part of the
            // list. The base grammar takes it from here.
            break;
        }

        entries.push(Entry {
            term: term.trim(),
            definitions,
        });
        cursor = next;

        // Blank-separated entries merge into the same list.
        while cursor < lines.len() && is_blank(line_text(source, lines, cursor)) {
            cursor += 1;
        }
    }

    (DefinitionList { entries }, cursor)
}

fn split_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in source.split_inclusive('\n') {
        let content = raw.trim_end_matches('\n').trim_end_matches('\r');
        lines.push(Line {
            start: offset,
            end: offset + content.len(),
        });
        offset += raw.len();
    }
    lines
}

fn line_text<'a>(source: &'a str, lines: &[Line], index: usize) -> &'a str {
    let line = lines[index];
    &source[line.start..line.end]
}

fn markdown_run<'a>(source: &'a str, lines: &[Line], from: usize, to: usize) -> Block<'a> {
    let start = lines[from].start;
    let end = lines[to - 1].end;
    Block::Markdown(&source[start..end])
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// A term line is non-blank, not a definition marker, and not indented
/// code (four-space or tab indents stay with the base grammar).
fn is_term_line(line: &str) -> bool {
    !is_blank(line)
        && !line.starts_with(':')
        && !line.starts_with('\t')
        && line.len() - line.trim_start_matches(' ').len() < 4
        && fence_marker(line).is_none()
}

fn is_definition_line(line: &str) -> bool {
    line.starts_with(':')
}

/// Strips the leading colon-and-space marker from a definition line.
fn strip_definition_marker(line: &str) -> &str {
    let rest = &line[1..];
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Returns the fence character when the line opens or closes a fenced
/// code block. Definition markers inside fences must never match.
fn fence_marker(line: &str) -> Option<char> {
    let trimmed = line.trim_start();
    for marker in ['`', '~'] {
        if trimmed.chars().take_while(|&c| c == marker).count() >= 3 {
            return Some(marker);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries<'a>(blocks: &'a [Block<'_>]) -> &'a [Entry<'a>] {
        match blocks {
            [Block::DefinitionList(list)] => &list.entries,
            other => panic!("expected a single definition list, got {other:?}"),
        }
    }

    #[test]
    fn single_entry_with_two_definitions() {
        let blocks = scan("Term\n: First def\n: Second def");
        let entries = entries(&blocks);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term, "Term");
        assert_eq!(entries[0].definitions, vec!["First def", "Second def"]);
    }

    #[test]
    fn term_without_definition_backtracks() {
        let blocks = scan("Term\nNot a definition");
        assert_eq!(blocks, vec![Block::Markdown("Term\nNot a definition")]);
    }

    #[test]
    fn blank_separated_entries_merge_into_one_list() {
        let blocks = scan("Alpha\n: first\n\nBeta\n: second");
        let entries = entries(&blocks);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].term, "Alpha");
        assert_eq!(entries[1].term, "Beta");
        assert_eq!(entries[1].definitions, vec!["second"]);
    }

    #[test]
    fn list_interleaves_with_surrounding_markdown() {
        let blocks = scan("intro paragraph\n\nTerm\n: def\n\n# After");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::Markdown("intro paragraph\n"));
        assert!(matches!(blocks[1], Block::DefinitionList(_)));
        assert_eq!(blocks[2], Block::Markdown("# After"));
    }

    #[test]
    fn trailing_non_term_line_returns_to_markdown() {
        let blocks = scan("Term\n: def\nplain trailer");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], Block::DefinitionList(_)));
        assert_eq!(blocks[1], Block::Markdown("plain trailer"));
    }

    #[test]
    fn colon_lines_inside_fences_never_match() {
        let source = "```\nTerm\n: not a definition\n```";
        let blocks = scan(source);
        assert_eq!(blocks, vec![Block::Markdown(source)]);
    }

    #[test]
    fn empty_and_blank_input_never_match() {
        assert!(scan("").is_empty());
        assert_eq!(scan("\n\nTermless"), vec![Block::Markdown("\n\nTermless")]);
    }

    #[test]
    fn marker_without_space_is_still_stripped() {
        let blocks = scan("Term\n:tight definition");
        let entries = entries(&blocks);
        assert_eq!(entries[0].definitions, vec!["tight definition"]);
    }

    #[test]
    fn indented_code_is_not_a_term() {
        let source = "    code line\n: looks like a definition";
        let blocks = scan(source);
        assert_eq!(blocks, vec![Block::Markdown(source)]);
    }
}
