//! Page layout for printable reports.
//!
//! Turns a [`ReportBody`](crate::ReportBody) into a sequence of pages of
//! vertically placed elements. The layout walks a cursor down the page and
//! opens a new page once the cursor passes the content limit; footers carry
//! the total page count and are therefore stamped only after every element
//! has been placed.

use crate::body::{ReportBody, ReportRow};

/// Vertical position of the first element on each page.
pub const CONTENT_START_Y: f64 = 20.0;
/// Once the cursor moves past this, the next element opens a new page.
pub const CONTENT_LIMIT_Y: f64 = 250.0;
/// Fixed vertical position of the page footer.
pub const FOOTER_Y: f64 = 290.0;

const TITLE_HEIGHT: f64 = 12.0;
const HEADER_LINE_HEIGHT: f64 = 7.0;
const SECTION_TITLE_HEIGHT: f64 = 10.0;
const ROW_HEIGHT: f64 = 7.0;
const OBSERVATION_LINE_HEIGHT: f64 = 6.0;
const SECTION_GAP: f64 = 6.0;

/// Characters per wrapped observation line.
const WRAP_WIDTH: usize = 90;

/// One drawable element of the report.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Title(String),
    HeaderLine(String),
    SectionTitle(String),
    TableHead,
    Row(ReportRow),
    ObservationLine(String),
}

impl Element {
    fn height(&self) -> f64 {
        match self {
            Element::Title(_) => TITLE_HEIGHT,
            Element::HeaderLine(_) => HEADER_LINE_HEIGHT,
            Element::SectionTitle(_) => SECTION_TITLE_HEIGHT,
            Element::TableHead => ROW_HEIGHT,
            Element::Row(_) => ROW_HEIGHT,
            Element::ObservationLine(_) => OBSERVATION_LINE_HEIGHT,
        }
    }
}

/// An element pinned at a vertical position on its page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedElement {
    pub y: f64,
    pub element: Element,
}

/// One page of the laid-out report.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub elements: Vec<PlacedElement>,
    /// `Page X of Y` caption, stamped once the total is known.
    pub footer: String,
}

/// The fully laid-out, paginated report.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Lays out a report body into pages.
    pub fn layout(body: &ReportBody) -> Self {
        let mut builder = PageBuilder::new();

        builder.push(Element::Title("Laboratory Report".to_string()));
        builder.push(Element::HeaderLine(format!(
            "Patient: {}",
            body.header.patient_name
        )));
        builder.push(Element::HeaderLine(format!("DNI: {}", body.header.dni)));
        builder.push(Element::HeaderLine(format!("Date: {}", body.header.date)));
        builder.push(Element::HeaderLine(format!(
            "Insurer: {}",
            body.header.insurer
        )));

        for section in &body.sections {
            builder.gap(SECTION_GAP);
            builder.push(Element::SectionTitle(section.title.clone()));
            builder.push(Element::TableHead);
            for row in &section.rows {
                builder.push(Element::Row(row.clone()));
            }
            if let Some(observations) = &section.observations {
                for line in wrap(observations, WRAP_WIDTH) {
                    builder.push(Element::ObservationLine(line));
                }
            }
        }

        let mut pages = builder.finish();
        let total = pages.len();
        for (index, page) in pages.iter_mut().enumerate() {
            page.footer = format!("Page {} of {}", index + 1, total);
        }
        tracing::debug!(pages = total, "report laid out");
        Document { pages }
    }
}

struct PageBuilder {
    pages: Vec<Page>,
    current: Vec<PlacedElement>,
    cursor: f64,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            cursor: CONTENT_START_Y,
        }
    }

    fn push(&mut self, element: Element) {
        if self.cursor > CONTENT_LIMIT_Y {
            self.break_page();
        }
        let height = element.height();
        self.current.push(PlacedElement {
            y: self.cursor,
            element,
        });
        self.cursor += height;
    }

    fn gap(&mut self, height: f64) {
        self.cursor += height;
    }

    fn break_page(&mut self) {
        let elements = std::mem::take(&mut self.current);
        self.pages.push(Page {
            elements,
            footer: String::new(),
        });
        self.cursor = CONTENT_START_Y;
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.break_page();
        }
        self.pages
    }
}

/// Greedy word wrap for free-text blocks. Words longer than `width` get a
/// line of their own rather than being split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
        } else if line.len() + 1 + word.len() <= width {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
