use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const QUOTE_GUTTER: &str = "│ ";
pub const CODE_GUTTER: &str = "┃ ";
pub const BULLET: &str = "• ";
pub const IMAGE_BLOCKS: &str = "▐█▌";
const RULE: char = '─';
const CELL_SEPARATOR: &str = " │ ";
const TAB_STOP: &str = "    ";

/// How images are drawn. `Blocks` only uses block glyphs, which survive
/// terminals that cannot show anything but monochrome glyph cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageStyle {
    #[default]
    Blocks,
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub images: ImageStyle,
}

/// Block kind of a rendered line, recovered from its leading glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Plain,
    Heading,
    Bullet,
    Code,
    Quote,
    Rule,
    Image,
}

/// Renders `markdown` into terminal text. Every line starts with `padding`
/// spaces, spans at most `width` further columns and ends with `'\n'`.
pub fn render(markdown: &str, width: usize, padding: usize, options: &RenderOptions) -> String {
    let mut writer = Writer::new(width.max(1), padding, *options);
    for event in Parser::new_ext(markdown, parser_options()) {
        writer.event(event);
    }
    writer.finish()
}

pub fn classify_line(line: &str) -> LineKind {
    let body = line.trim_start();
    if body.is_empty() {
        LineKind::Blank
    } else if body.starts_with(QUOTE_GUTTER.trim_end()) {
        LineKind::Quote
    } else if body.starts_with(CODE_GUTTER.trim_end()) {
        LineKind::Code
    } else if body.starts_with('#') && body.trim_start_matches('#').starts_with(' ') {
        LineKind::Heading
    } else if body.chars().all(|c| c == RULE) {
        LineKind::Rule
    } else if body.starts_with(IMAGE_BLOCKS) || body.starts_with("[image: ") {
        LineKind::Image
    } else if body.starts_with(BULLET) || is_ordered_marker(body) {
        LineKind::Bullet
    } else {
        LineKind::Plain
    }
}

fn is_ordered_marker(body: &str) -> bool {
    match body.split_once(". ") {
        Some((digits, _)) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH
}

struct ListLevel {
    next: Option<u64>,
    indent: usize,
    marker: Option<String>,
}

struct Writer {
    lines: Vec<String>,
    inline: String,
    width: usize,
    padding: usize,
    options: RenderOptions,
    quote_depth: usize,
    lists: Vec<ListLevel>,
    code: Option<String>,
    links: Vec<(usize, String)>,
    image: Option<(usize, String)>,
    table_cell: usize,
}

impl Writer {
    fn new(width: usize, padding: usize, options: RenderOptions) -> Self {
        Self {
            lines: Vec::new(),
            inline: String::new(),
            width,
            padding,
            options,
            quote_depth: 0,
            lists: Vec::new(),
            code: None,
            links: Vec::new(),
            image: None,
            table_cell: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code.as_mut() {
                Some(code) => code.push_str(&text),
                None => self.inline.push_str(&text),
            },
            Event::Code(code) => {
                self.inline.push('`');
                self.inline.push_str(&code);
                self.inline.push('`');
            }
            Event::SoftBreak => self.inline.push(' '),
            // Link and image labels are spliced by offset, so they stay on one line.
            Event::HardBreak if !self.links.is_empty() || self.image.is_some() => {
                self.inline.push(' ')
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.separate();
                let (first, rest) = self.prefixes();
                let rule = RULE.to_string().repeat(self.content_width(&rest));
                self.lines.push(format!("{first}{rule}"));
            }
            Event::TaskListMarker(done) => {
                self.inline.push_str(if done { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(label) => {
                self.inline.push_str("[^");
                self.inline.push_str(&label);
                self.inline.push(']');
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Table(_) => {
                self.flush();
                self.separate();
            }
            Tag::Heading { level, .. } => {
                self.flush();
                self.separate();
                self.inline.push_str(heading_prefix(level));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.separate();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.separate();
                self.code = Some(String::new());
            }
            Tag::List(start) => {
                self.flush();
                if self.lists.is_empty() {
                    self.separate();
                }
                self.lists.push(ListLevel {
                    next: start,
                    indent: 0,
                    marker: None,
                });
            }
            Tag::Item => {
                self.flush();
                if let Some(level) = self.lists.last_mut() {
                    let marker = match level.next {
                        Some(n) => {
                            level.next = Some(n + 1);
                            format!("{n}. ")
                        }
                        None => BULLET.to_string(),
                    };
                    level.indent = marker.width();
                    level.marker = Some(marker);
                }
            }
            Tag::TableHead | Tag::TableRow => self.table_cell = 0,
            Tag::TableCell => {
                if self.table_cell > 0 {
                    self.inline.push_str(CELL_SEPARATOR);
                }
                self.table_cell += 1;
            }
            Tag::Link { dest_url, .. } => {
                self.links.push((self.inline.len(), dest_url.to_string()));
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some((self.inline.len(), dest_url.to_string()));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::TableRow | TagEnd::Table => {
                self.flush()
            }
            TagEnd::TableHead => {
                self.flush();
                let (first, rest) = self.prefixes();
                let rule = RULE.to_string().repeat(self.content_width(&rest));
                self.lines.push(format!("{first}{rule}"));
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                let code = self.code.take().unwrap_or_default();
                self.push_code(&code);
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Item => {
                self.flush();
                if let Some(level) = self.lists.last_mut() {
                    level.marker = None;
                }
            }
            TagEnd::Link => {
                if let Some((start, dest)) = self.links.pop()
                    && !dest.is_empty()
                    && self.inline.get(start..) != Some(dest.as_str())
                {
                    self.inline.push_str(" (");
                    self.inline.push_str(&dest);
                    self.inline.push(')');
                }
            }
            TagEnd::Image => {
                if let Some((start, dest)) = self.image.take() {
                    let alt = self.inline.split_off(start.min(self.inline.len()));
                    let placeholder = match self.options.images {
                        ImageStyle::Blocks => format!("{IMAGE_BLOCKS} {alt}"),
                        ImageStyle::Text => format!("[image: {alt}]({dest})"),
                    };
                    self.inline.push_str(placeholder.trim_end());
                }
            }
            _ => {}
        }
    }

    /// Leading text for the first and the following lines of a block. Pending
    /// list markers are consumed by the first line.
    fn prefixes(&mut self) -> (String, String) {
        let mut first = " ".repeat(self.padding);
        for _ in 0..self.quote_depth {
            first.push_str(QUOTE_GUTTER);
        }
        let mut rest = first.clone();
        for level in &mut self.lists {
            let indent = " ".repeat(level.indent);
            match level.marker.take() {
                Some(marker) => first.push_str(&marker),
                None => first.push_str(&indent),
            }
            rest.push_str(&indent);
        }
        (self.fit(first), self.fit(rest))
    }

    /// Cuts a prefix so at least one column of content remains.
    fn fit(&self, prefix: String) -> String {
        let limit = (self.padding + self.width).saturating_sub(1);
        if prefix.width() <= limit {
            return prefix;
        }

        let mut out = String::new();
        let mut used = 0usize;
        for ch in prefix.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if used + ch_width > limit {
                break;
            }
            out.push(ch);
            used += ch_width;
        }
        out
    }

    fn content_width(&self, prefix: &str) -> usize {
        (self.padding + self.width).saturating_sub(prefix.width()).max(1)
    }

    fn flush(&mut self) {
        if self.inline.trim().is_empty() {
            self.inline.clear();
            return;
        }

        let text = std::mem::take(&mut self.inline);
        let (first, rest) = self.prefixes();
        let width = self.content_width(&rest);
        for (i, line) in wrap_words(&text, width).into_iter().enumerate() {
            let prefix = if i == 0 { &first } else { &rest };
            self.lines.push(format!("{prefix}{line}"));
        }
    }

    fn push_code(&mut self, code: &str) {
        let (first, rest) = self.prefixes();
        let first = self.fit(format!("{first}{CODE_GUTTER}"));
        let rest = self.fit(format!("{rest}{CODE_GUTTER}"));
        let width = self.content_width(&rest);
        let mut prefix = first.as_str();
        let source = if code.is_empty() { "\n" } else { code };

        for line in source.lines() {
            let line = line.replace('\t', TAB_STOP);
            let chunks = if line.is_empty() {
                vec![String::new()]
            } else {
                split_columns(&line, width)
            };
            for chunk in chunks {
                self.lines.push(format!("{prefix}{chunk}"));
                prefix = rest.as_str();
            }
        }
    }

    /// Opens a gap before a new block unless the output already ends in one.
    fn separate(&mut self) {
        let Some(last) = self.lines.last() else {
            return;
        };
        if is_blank(last) {
            return;
        }

        let mut gap = " ".repeat(self.padding);
        for _ in 0..self.quote_depth {
            gap.push_str(QUOTE_GUTTER);
        }
        let gap = self.fit(gap);
        self.lines.push(gap);
    }

    fn finish(mut self) -> String {
        self.flush();
        while self.lines.last().is_some_and(|line| is_blank(line)) {
            self.lines.pop();
        }

        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

fn is_blank(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '│')
}

fn heading_prefix(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "# ",
        HeadingLevel::H2 => "## ",
        HeadingLevel::H3 => "### ",
        HeadingLevel::H4 => "#### ",
        HeadingLevel::H5 => "##### ",
        HeadingLevel::H6 => "###### ",
    }
}

fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut used = 0usize;

    for word in text.split_whitespace() {
        let word_width = word.width();
        if !current.is_empty() && used + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            used += 1 + word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if word_width <= width {
            current.push_str(word);
            used = word_width;
            continue;
        }

        let mut chunks = split_columns(word, width);
        if let Some(last) = chunks.pop() {
            lines.extend(chunks);
            used = last.width();
            current = last;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn split_columns(input: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut used = 0usize;

    for ch in input.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width && !buf.is_empty() {
            chunks.push(std::mem::take(&mut buf));
            used = 0;
        }
        buf.push(ch);
        used += ch_width;
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}
