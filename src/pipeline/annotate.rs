//! Expandable annotations in summary markup.
//!
//! The model marks technical terms as
//! `<span class="wiki-link" data-explanation="...">term</span>`. An
//! [`AnnotatedSummary`] finds those spans, binds a toggle to each one that
//! carries an explanation, and re-serializes the markup with the explanation
//! nodes that are currently expanded.
//!
//! Binding is tracked per span and written back as a
//! `data-annotation-bound="true"` marker, so activating the same markup
//! again (or a re-parse of rendered output) never binds a second toggle.

use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector};

const ANNOTATION_SELECTOR: &str = "span.wiki-link";
const EXPLANATION_ATTR: &str = "data-explanation";
const EXPLANATION_CLASS: &str = "explanation";
const EXPLANATION_STYLE: &str = "margin-left: 10px";

/// Marker written on spans that have a toggle bound
pub const BOUND_ATTR: &str = "data-annotation-bound";

const BOUND_STYLE: &str = "cursor: pointer";

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("No annotation at index {0}")]
    NoSuchAnnotation(usize),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExplanationNode {
    /// Present in the incoming markup
    Original,
    /// Appended by a toggle
    Generated,
    Absent,
}

/// One annotation span, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    term: String,
    explanation: Option<String>,
    bound: bool,
    node: ExplanationNode,
}

impl Annotation {
    fn from_element(span: ElementRef<'_>) -> Self {
        let element = span.value();
        let explanation = element.attr(EXPLANATION_ATTR).map(str::to_string);
        let bound = explanation.is_some() && element.attr(BOUND_ATTR) == Some("true");
        let has_node = span
            .children()
            .filter_map(ElementRef::wrap)
            .any(is_explanation);

        Self {
            term: term_text(span),
            explanation,
            bound,
            node: if has_node {
                ExplanationNode::Original
            } else {
                ExplanationNode::Absent
            },
        }
    }

    /// Visible text of the span, without any explanation node
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Whether a toggle is bound to this span
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Whether the span currently contains an explanation node
    pub fn is_expanded(&self) -> bool {
        self.node != ExplanationNode::Absent
    }
}

/// Summary markup with its annotation spans
#[derive(Debug, Clone)]
pub struct AnnotatedSummary {
    markup: String,
    document: bool,
    annotations: Vec<Annotation>,
    selector: Selector,
}

impl AnnotatedSummary {
    /// Discover annotation spans in `markup`.
    ///
    /// Markup starting with a doctype or `<html>` is handled as a full
    /// document, anything else as a body fragment.
    pub fn parse(markup: impl Into<String>) -> Result<Self, AnnotationError> {
        let markup = markup.into();
        let selector = Selector::parse(ANNOTATION_SELECTOR)
            .map_err(|e| AnnotationError::Selector(format!("{:?}", e)))?;
        let document = is_document(&markup);

        let annotations = parse_tree(&markup, document)
            .select(&selector)
            .map(Annotation::from_element)
            .collect::<Vec<_>>();

        tracing::debug!(count = annotations.len(), document, "parsed annotations");

        Ok(Self {
            markup,
            document,
            annotations,
            selector,
        })
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Bind a toggle to every span with an explanation that has none yet.
    ///
    /// Returns how many spans were newly bound; a second call returns 0.
    pub fn activate(&mut self) -> usize {
        let mut bound = 0;
        for annotation in &mut self.annotations {
            if !annotation.bound && annotation.explanation.is_some() {
                annotation.bound = true;
                bound += 1;
            }
        }
        tracing::debug!(bound, total = self.annotations.len(), "activated annotations");
        bound
    }

    /// Toggle the explanation of the span at `index`.
    ///
    /// Returns whether the span is expanded afterwards. Clicking a span
    /// without a bound toggle changes nothing.
    pub fn click(&mut self, index: usize) -> Result<bool, AnnotationError> {
        let annotation = self
            .annotations
            .get_mut(index)
            .ok_or(AnnotationError::NoSuchAnnotation(index))?;

        if annotation.bound {
            annotation.node = match annotation.node {
                ExplanationNode::Absent => ExplanationNode::Generated,
                ExplanationNode::Original | ExplanationNode::Generated => ExplanationNode::Absent,
            };
        }

        Ok(annotation.is_expanded())
    }

    /// Activate and expand every bound span. Returns the number expanded.
    pub fn expand_all(&mut self) -> usize {
        self.activate();
        let mut expanded = 0;
        for index in 0..self.annotations.len() {
            let annotation = &self.annotations[index];
            if annotation.bound && !annotation.is_expanded() && matches!(self.click(index), Ok(true)) {
                expanded += 1;
            }
        }
        expanded
    }

    /// Serialize the markup with the current annotation state.
    pub fn render(&self) -> String {
        let mut html = parse_tree(&self.markup, self.document);

        // Same markup, same parse: spans line up with `annotations` by position.
        let targets = html
            .select(&self.selector)
            .zip(&self.annotations)
            .map(|(span, annotation)| {
                let existing = span
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| is_explanation(*child))
                    .map(|child| child.id())
                    .collect::<Vec<_>>();
                (span.id(), existing, annotation)
            })
            .collect::<Vec<_>>();

        for (span, existing, annotation) in targets {
            if annotation.node != ExplanationNode::Original {
                for id in existing {
                    if let Some(mut node) = html.tree.get_mut(id) {
                        node.detach();
                    }
                }
            }

            let Some(mut node) = html.tree.get_mut(span) else {
                continue;
            };
            if annotation.bound {
                if let Node::Element(element) = node.value() {
                    mark_bound(element);
                }
            }
            if annotation.node == ExplanationNode::Generated {
                let explanation = annotation.explanation.as_deref().unwrap_or_default();
                node.append(explanation_element()).append(Node::Text(Text {
                    text: format!("[{}]", explanation).into(),
                }));
            }
        }

        if self.document {
            html.html()
        } else {
            html.root_element().inner_html()
        }
    }
}

fn attr_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(local))
}

fn mark_bound(element: &mut Element) {
    let style = bound_style(element.attr("style"));
    element.attrs.insert(attr_name(BOUND_ATTR), "true".into());
    element.attrs.insert(attr_name("style"), style.into());
}

fn explanation_element() -> Node {
    let name = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("span"));
    Node::Element(Element::new(
        name,
        vec![
            Attribute {
                name: attr_name("class"),
                value: EXPLANATION_CLASS.into(),
            },
            Attribute {
                name: attr_name("style"),
                value: EXPLANATION_STYLE.into(),
            },
        ],
    ))
}

fn bound_style(existing: Option<&str>) -> String {
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        Some(style) if style.contains(BOUND_STYLE) => style.to_string(),
        Some(style) => format!("{}; {}", style.trim_end_matches(';'), BOUND_STYLE),
        None => BOUND_STYLE.to_string(),
    }
}

fn is_explanation(element: ElementRef<'_>) -> bool {
    element.value().classes().any(|c| c == EXPLANATION_CLASS)
}

fn term_text(span: ElementRef<'_>) -> String {
    let mut term = String::new();
    for child in span.children() {
        match ElementRef::wrap(child) {
            Some(child) if is_explanation(child) => {}
            Some(child) => term.extend(child.text()),
            None => {
                if let Node::Text(text) = child.value() {
                    term.push_str(text);
                }
            }
        }
    }
    term.trim().to_string()
}

fn is_document(markup: &str) -> bool {
    let head = markup
        .trim_start()
        .chars()
        .take(9)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

fn parse_tree(markup: &str, document: bool) -> Html {
    if document {
        Html::parse_document(markup)
    } else {
        Html::parse_fragment(markup)
    }
}
