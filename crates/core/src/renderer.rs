//! Event-driven HTML renderer with blog-specific block overrides.
//!
//! Standard constructs render with their default shapes; code fences,
//! task-list markers, and images are overridden to emit richer markup
//! (highlighted figures with a copy control, read-only status glyphs,
//! lazy-loading images). Definition list tokens from the block scanner
//! render through the same inline machinery as everything else.

use std::io::{self, Write};

use pulldown_cmark::{
    Alignment, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd,
};

use crate::definition_list::{Block, DefinitionList};
use crate::{highlight, lang};

/// Base grammar options: GitHub-flavored markdown.
fn gfm_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

pub struct HtmlRenderer<W: Write> {
    writer: W,
    table_head_depth: usize,
    table_stack: Vec<TableState>,
    image_stack: Vec<ImageContext>,
    code_block: Option<CodeContext>,
}

struct TableState {
    alignments: Vec<Alignment>,
    column_index: usize,
}

struct ImageContext {
    dest_url: String,
    title: String,
    alt: String,
}

struct CodeContext {
    language: String,
    source: String,
}

impl<W: Write> HtmlRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            table_head_depth: 0,
            table_stack: Vec::new(),
            image_stack: Vec::new(),
            code_block: None,
        }
    }

    /// Renders a scanned block sequence and returns the writer.
    pub fn render_blocks(mut self, blocks: &[Block<'_>]) -> io::Result<W> {
        for block in blocks {
            match block {
                Block::Markdown(source) => self.render_markdown(source)?,
                Block::DefinitionList(list) => self.render_definition_list(list)?,
            }
        }
        Ok(self.writer)
    }

    fn render_markdown(&mut self, source: &str) -> io::Result<()> {
        self.render_events(Parser::new_ext(source, gfm_options()), false)
    }

    fn render_definition_list(&mut self, list: &DefinitionList<'_>) -> io::Result<()> {
        self.writer.write_all(b"<dl>\n")?;
        for entry in &list.entries {
            self.writer.write_all(b"<dt>")?;
            self.render_inline(entry.term)?;
            self.writer.write_all(b"</dt>\n")?;
            for definition in &entry.definitions {
                self.writer.write_all(b"<dd>")?;
                self.render_inline(definition)?;
                self.writer.write_all(b"</dd>\n")?;
            }
        }
        self.writer.write_all(b"</dl>\n")
    }

    /// Renders one line of source as inline content, dropping the
    /// paragraph wrapper the block grammar adds around it. Used for
    /// terms and definitions so embedded emphasis, links, and code
    /// spans render correctly.
    fn render_inline(&mut self, source: &str) -> io::Result<()> {
        self.render_events(Parser::new_ext(source, gfm_options()), true)
    }

    fn render_events<'a, I>(&mut self, events: I, strip_paragraphs: bool) -> io::Result<()>
    where
        I: IntoIterator<Item = Event<'a>>,
    {
        for event in events {
            if strip_paragraphs
                && matches!(
                    event,
                    Event::Start(Tag::Paragraph) | Event::End(TagEnd::Paragraph)
                )
            {
                continue;
            }
            self.render_event(event)?;
        }
        Ok(())
    }

    fn render_event(&mut self, event: Event<'_>) -> io::Result<()> {
        if self.capture_image_text(&event) || self.capture_code_text(&event) {
            return Ok(());
        }

        match event {
            Event::Start(tag) => match tag {
                Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                } => {
                    self.start_image(link_type, dest_url, title, id);
                    Ok(())
                }
                Tag::CodeBlock(kind) => {
                    self.start_code_block(kind);
                    Ok(())
                }
                other => self.write_start_tag(other),
            },
            Event::End(end) => match end {
                TagEnd::Image => self.finish_image(),
                TagEnd::CodeBlock => self.finish_code_block(),
                other => self.write_end_tag(other),
            },
            Event::Text(text) => self.escape_html(&text),
            Event::Code(text) => {
                self.writer.write_all(b"<code>")?;
                self.escape_html(&text)?;
                self.writer.write_all(b"</code>")
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                // Raw author HTML passes through untouched; the
                // sanitizer downstream is the security boundary.
                self.writer.write_all(html.as_bytes())
            }
            Event::FootnoteReference(label) => {
                write!(
                    self.writer,
                    "<sup class=\"footnote-ref\"><a href=\"#fn-{0}\" id=\"fnref-{0}\">{0}</a></sup>",
                    label
                )
            }
            Event::TaskListMarker(checked) => self.write_task_marker(checked),
            Event::Rule => self.writer.write_all(b"<hr />\n"),
            Event::HardBreak => self.writer.write_all(b"<br />\n"),
            Event::SoftBreak => self.writer.write_all(b"\n"),
            // Math and metadata constructs are not enabled in the
            // grammar options.
            _ => Ok(()),
        }
    }

    fn write_start_tag(&mut self, tag: Tag<'_>) -> io::Result<()> {
        match tag {
            Tag::Paragraph => self.writer.write_all(b"<p>"),
            Tag::Heading { level, id, .. } => {
                write!(self.writer, "<h{}", level as u8)?;
                if let Some(id) = id {
                    self.write_attr("id", &id)?;
                }
                self.writer.write_all(b">")
            }
            Tag::BlockQuote(_) => self.writer.write_all(b"<blockquote>"),
            Tag::List(start) => {
                if let Some(index) = start {
                    write!(self.writer, "<ol start=\"{index}\">")
                } else {
                    self.writer.write_all(b"<ul>")
                }
            }
            Tag::Item => self.writer.write_all(b"<li>"),
            Tag::FootnoteDefinition(label) => {
                write!(
                    self.writer,
                    "<section class=\"footnote\" id=\"fn-{label}\">"
                )
            }
            Tag::Table(alignments) => {
                self.table_stack.push(TableState {
                    alignments,
                    column_index: 0,
                });
                self.writer.write_all(b"<table>")
            }
            Tag::TableHead => {
                self.table_head_depth += 1;
                self.writer.write_all(b"<thead>")
            }
            Tag::TableRow => {
                if let Some(state) = self.table_stack.last_mut() {
                    state.column_index = 0;
                }
                self.writer.write_all(b"<tr>")
            }
            Tag::TableCell => {
                let cell = if self.table_head_depth > 0 {
                    b"th".as_slice()
                } else {
                    b"td".as_slice()
                };
                self.writer.write_all(b"<")?;
                self.writer.write_all(cell)?;
                if let Some(state) = self.table_stack.last_mut() {
                    if let Some(alignment) = state.alignments.get(state.column_index) {
                        // Alignment as a class keeps `style` out of the
                        // sanitizer's attribute allowlist.
                        if !matches!(alignment, Alignment::None) {
                            self.writer.write_all(b" class=\"align-")?;
                            self.writer.write_all(match alignment {
                                Alignment::Left => b"left",
                                Alignment::Right => b"right",
                                Alignment::Center => b"center",
                                Alignment::None => b"left",
                            })?;
                            self.writer.write_all(b"\"")?;
                        }
                        state.column_index += 1;
                    }
                }
                self.writer.write_all(b">")
            }
            Tag::Emphasis => self.writer.write_all(b"<em>"),
            Tag::Strong => self.writer.write_all(b"<strong>"),
            Tag::Strikethrough => self.writer.write_all(b"<del>"),
            Tag::Link {
                dest_url, title, ..
            } => {
                self.writer.write_all(b"<a href=\"")?;
                self.escape_attr(&dest_url)?;
                self.writer.write_all(b"\"")?;
                if !title.is_empty() {
                    self.writer.write_all(b" title=\"")?;
                    self.escape_attr(&title)?;
                    self.writer.write_all(b"\"")?;
                }
                self.writer.write_all(b">")
            }
            Tag::HtmlBlock => Ok(()),
            Tag::CodeBlock(_) | Tag::Image { .. } => {
                unreachable!("code blocks and images are buffered separately")
            }
            _ => Ok(()),
        }
    }

    fn write_end_tag(&mut self, end: TagEnd) -> io::Result<()> {
        match end {
            TagEnd::Paragraph => self.writer.write_all(b"</p>\n"),
            TagEnd::Heading(level) => {
                writeln!(self.writer, "</h{}>", level as u8)
            }
            TagEnd::BlockQuote(_) => self.writer.write_all(b"</blockquote>\n"),
            TagEnd::List(ordered) => {
                if ordered {
                    self.writer.write_all(b"</ol>\n")
                } else {
                    self.writer.write_all(b"</ul>\n")
                }
            }
            TagEnd::Item => self.writer.write_all(b"</li>"),
            TagEnd::FootnoteDefinition => self.writer.write_all(b"</section>\n"),
            TagEnd::Table => {
                self.table_stack.pop();
                self.writer.write_all(b"</table>\n")
            }
            TagEnd::TableHead => {
                self.table_head_depth = self.table_head_depth.saturating_sub(1);
                self.writer.write_all(b"</thead>\n")
            }
            TagEnd::TableRow => self.writer.write_all(b"</tr>\n"),
            TagEnd::TableCell => {
                let cell = if self.table_head_depth > 0 {
                    b"th".as_slice()
                } else {
                    b"td".as_slice()
                };
                self.writer.write_all(b"</")?;
                self.writer.write_all(cell)?;
                self.writer.write_all(b">")
            }
            TagEnd::Emphasis => self.writer.write_all(b"</em>"),
            TagEnd::Strong => self.writer.write_all(b"</strong>"),
            TagEnd::Strikethrough => self.writer.write_all(b"</del>"),
            TagEnd::Link => self.writer.write_all(b"</a>"),
            TagEnd::HtmlBlock => Ok(()),
            TagEnd::CodeBlock | TagEnd::Image => {
                unreachable!("code blocks and images are buffered separately")
            }
            _ => Ok(()),
        }
    }

    /// Opens a code block buffer; the body is collected through
    /// [`Self::capture_code_text`] and emitted on the end tag.
    fn start_code_block(&mut self, kind: CodeBlockKind<'_>) {
        let language = match &kind {
            CodeBlockKind::Fenced(tag) => lang::resolve(tag).into_owned(),
            CodeBlockKind::Indented => lang::PLAINTEXT.to_string(),
        };
        self.code_block = Some(CodeContext {
            language,
            source: String::new(),
        });
    }

    /// Emits the buffered code block as a figure: a header with the
    /// language label and a copy control, then the highlighted (or
    /// escaped, never both) body. The `data-language` attribute is what
    /// client-side copy code uses to locate the block.
    fn finish_code_block(&mut self) -> io::Result<()> {
        let Some(code) = self.code_block.take() else {
            return Ok(());
        };
        let label = lang::label(&code.language);

        self.writer
            .write_all(b"<figure class=\"code-block\" data-language=\"")?;
        self.escape_attr(&code.language)?;
        self.writer
            .write_all(b"\"><figcaption class=\"code-header\"><span class=\"code-language\">")?;
        self.escape_html(&label)?;
        self.writer.write_all(
            b"</span><button type=\"button\" class=\"code-copy\" aria-label=\"Copy code\">\
              Copy</button></figcaption><pre><code class=\"language-",
        )?;
        self.escape_attr(&code.language)?;
        self.writer.write_all(b"\" data-language=\"")?;
        self.escape_attr(&code.language)?;
        self.writer.write_all(b"\">")?;
        match highlight::highlight(&code.source, &code.language) {
            // Highlighter output is pre-escaped; escaping it again
            // would double-escape entities.
            Some(markup) => self.writer.write_all(markup.as_bytes())?,
            None => self.escape_html(&code.source)?,
        }
        self.writer.write_all(b"</code></pre></figure>\n")
    }

    /// Task lists are read-only rendered content, so the marker is a
    /// status glyph rather than an interactive checkbox.
    fn write_task_marker(&mut self, checked: bool) -> io::Result<()> {
        let marker = if checked {
            "<span class=\"task-checkbox\" data-checked=\"true\" aria-hidden=\"true\">\u{2611}</span> "
        } else {
            "<span class=\"task-checkbox\" data-checked=\"false\" aria-hidden=\"true\">\u{2610}</span> "
        };
        self.writer.write_all(marker.as_bytes())
    }

    fn escape_html(&mut self, text: &str) -> io::Result<()> {
        for ch in text.chars() {
            match ch {
                '&' => self.writer.write_all(b"&amp;")?,
                '<' => self.writer.write_all(b"&lt;")?,
                '>' => self.writer.write_all(b"&gt;")?,
                '"' => self.writer.write_all(b"&quot;")?,
                '\'' => self.writer.write_all(b"&#39;")?,
                _ => self
                    .writer
                    .write_all(ch.encode_utf8(&mut [0; 4]).as_bytes())?,
            }
        }
        Ok(())
    }

    fn escape_attr(&mut self, value: &str) -> io::Result<()> {
        self.escape_html(value)
    }

    fn write_attr(&mut self, key: &str, value: &str) -> io::Result<()> {
        write!(self.writer, " {key}=\"")?;
        self.escape_attr(value)?;
        self.writer.write_all(b"\"")
    }

    fn start_image(
        &mut self,
        _: LinkType,
        dest_url: CowStr<'_>,
        title: CowStr<'_>,
        _: CowStr<'_>,
    ) {
        self.image_stack.push(ImageContext {
            dest_url: dest_url.into_string(),
            title: title.into_string(),
            alt: String::new(),
        });
    }

    fn finish_image(&mut self) -> io::Result<()> {
        let Some(image) = self.image_stack.pop() else {
            return Ok(());
        };
        self.writer.write_all(b"<img src=\"")?;
        self.escape_attr(image.dest_url.trim())?;
        self.writer.write_all(b"\" alt=\"")?;
        self.escape_attr(image.alt.trim())?;
        self.writer.write_all(b"\"")?;
        let title = image.title.trim();
        if !title.is_empty() {
            self.writer.write_all(b" title=\"")?;
            self.escape_attr(title)?;
            self.writer.write_all(b"\"")?;
        }
        self.writer.write_all(
            b" loading=\"lazy\" decoding=\"async\" referrerpolicy=\"no-referrer\" \
              class=\"post-image\" />",
        )
    }

    /// While an image is open, its nested events fold into the alt text.
    fn capture_image_text(&mut self, event: &Event<'_>) -> bool {
        if let Some(current) = self.image_stack.last_mut() {
            match event {
                Event::Text(text) | Event::Code(text) => {
                    current.alt.push_str(text.as_ref());
                    return true;
                }
                Event::SoftBreak | Event::HardBreak => {
                    current.alt.push(' ');
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    /// While a code block is open, text events fold into its buffer so
    /// the whole body can be highlighted in one pass.
    fn capture_code_text(&mut self, event: &Event<'_>) -> bool {
        if let Some(current) = self.code_block.as_mut() {
            if let Event::Text(text) = event {
                current.source.push_str(text.as_ref());
                return true;
            }
        }
        false
    }
}
