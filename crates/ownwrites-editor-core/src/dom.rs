//! HTML node tree backing the content surface.
//!
//! The parser is deliberately lenient: pasted markup is accepted as-is, unclosed
//! elements are closed at end of input and stray closing tags are dropped. The
//! serializer is deterministic, so `serialize(parse(serialize(x)))` always equals
//! `serialize(x)`.

use std::borrow::Cow;

use pulldown_cmark_escape::{FmtWriter, escape_html, escape_html_body_text};
use smol_str::SmolStr;

/// Path from the surface root to a node, as child indices.
pub type NodePath = Vec<usize>;

/// Elements that never have children or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements that participate in inline formatting runs.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "cite", "code", "del", "dfn", "em", "font", "i", "ins",
    "kbd", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "time",
    "u", "var",
];

/// Elements whose content is raw text (no entity decoding or escaping).
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Opening one of these implicitly closes an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "blockquote", "div", "dl", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "ol", "p", "pre", "section", "table", "ul",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Same tag and attributes, no children.
    pub fn shallow_clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Remove every class in `remove`, then append `add` if it isn't present.
    ///
    /// Mirrors `classList.remove(...); classList.add(...)`.
    pub fn swap_classes(&mut self, remove: &[&str], add: &str) {
        let mut classes: Vec<String> = self
            .classes()
            .filter(|c| !remove.contains(c))
            .map(str::to_string)
            .collect();
        if !classes.iter().any(|c| c == add) {
            classes.push(add.to_string());
        }
        self.set_attr("class", classes.join(" "));
    }

    pub fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }

    pub fn is_inline(&self) -> bool {
        INLINE_TAGS.contains(&self.tag.as_str()) || (self.is_void() && self.tag != "hr")
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Whether this node flows inline (text, comments, inline elements, inline atoms).
    pub fn is_inline(&self) -> bool {
        match self {
            Node::Element(el) => el.is_inline(),
            Node::Text(_) | Node::Comment(_) => true,
        }
    }

    /// Void elements occupy one caret position and carry no text.
    pub fn is_atom(&self) -> bool {
        matches!(self, Node::Element(el) if el.is_void())
    }

    /// Width of this node in caret positions.
    pub fn units(&self) -> usize {
        match self {
            Node::Text(t) => t.chars().count(),
            Node::Comment(_) => 0,
            Node::Element(el) if el.is_void() => 1,
            Node::Element(el) => units(&el.children),
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        push_text_content(self, &mut out);
        out
    }
}

fn push_text_content(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) => out.push_str(t),
        Node::Comment(_) => {}
        Node::Element(el) => {
            for child in &el.children {
                push_text_content(child, out);
            }
        }
    }
}

/// Total caret positions in a node list.
pub fn units(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::units).sum()
}

pub fn node_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get(*first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        Node::Element(el) => node_at(&el.children, rest),
        _ => None,
    }
}

pub fn node_at_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let node = nodes.get_mut(*first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node {
        Node::Element(el) => node_at_mut(&mut el.children, rest),
        _ => None,
    }
}

/// Child list of the node at `parent`; the empty path is the root list.
pub fn children_at_mut<'a>(nodes: &'a mut Vec<Node>, parent: &[usize]) -> Option<&'a mut Vec<Node>> {
    if parent.is_empty() {
        return Some(nodes);
    }
    match node_at_mut(nodes, parent)? {
        Node::Element(el) => Some(&mut el.children),
        _ => None,
    }
}

pub fn children_at<'a>(nodes: &'a [Node], parent: &[usize]) -> Option<&'a [Node]> {
    if parent.is_empty() {
        return Some(nodes);
    }
    match node_at(nodes, parent)? {
        Node::Element(el) => Some(&el.children),
        _ => None,
    }
}

/// Parse an HTML fragment into a node list.
pub fn parse_fragment(html: &str) -> Vec<Node> {
    FragmentParser::new(html).run()
}

/// Serialize a node list back to markup.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes, false);
    out
}

fn write_nodes(out: &mut String, nodes: &[Node], raw: bool) {
    for node in nodes {
        write_node(out, node, raw);
    }
}

fn write_node(out: &mut String, node: &Node, raw: bool) {
    match node {
        Node::Text(t) if raw => out.push_str(t),
        Node::Text(t) => write_text(out, t),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                let _ = escape_html(FmtWriter(&mut *out), value);
                out.push('"');
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            write_nodes(out, &el.children, RAW_TEXT_TAGS.contains(&el.tag.as_str()));
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn write_text(out: &mut String, text: &str) {
    for (i, part) in text.split('\u{a0}').enumerate() {
        if i > 0 {
            out.push_str("&nbsp;");
        }
        let _ = escape_html_body_text(FmtWriter(&mut *out), part);
    }
}

struct FragmentParser<'a> {
    src: &'a str,
    pos: usize,
    root: Vec<Node>,
    stack: Vec<Element>,
}

impl<'a> FragmentParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Node> {
        let src = self.src;
        while self.pos < src.len() {
            let rest = &src[self.pos..];
            let mut chars = rest.chars();
            let first_len = chars.next().map(char::len_utf8).unwrap_or(1);
            let next = chars.next();
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("</") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.end_tag();
            } else if rest.starts_with('<') && next.is_some_and(|c| c.is_ascii_alphabetic()) {
                self.start_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                // Doctype and processing instructions have no place in a fragment.
                self.skip_past('>');
            } else {
                let len = rest[first_len..]
                    .find('<')
                    .map(|i| i + first_len)
                    .unwrap_or(rest.len());
                let text = decode_entities(&rest[..len]).into_owned();
                self.pos += len;
                self.push_text(text);
            }
        }
        while !self.stack.is_empty() {
            self.close_top();
        }
        self.root
    }

    fn current_children(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(el) => &mut el.children,
            None => &mut self.root,
        }
    }

    fn push_node(&mut self, node: Node) {
        self.current_children().push(node);
    }

    fn push_text(&mut self, text: String) {
        let children = self.current_children();
        if let Some(Node::Text(prev)) = children.last_mut() {
            prev.push_str(&text);
        } else {
            children.push(Node::Text(text));
        }
    }

    fn close_top(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.push_node(Node::Element(el));
        }
    }

    fn top_is(&self, tag: &str) -> bool {
        self.stack.last().is_some_and(|el| el.tag == tag)
    }

    fn skip_past(&mut self, c: char) {
        match self.src[self.pos..].find(c) {
            Some(i) => self.pos += i + c.len_utf8(),
            None => self.pos = self.src.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let src = self.src;
        let rest = &src[self.pos..];
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn comment(&mut self) {
        let src = self.src;
        let body_start = self.pos + 4;
        let (body, next) = match src[body_start..].find("-->") {
            Some(end) => (&src[body_start..body_start + end], body_start + end + 3),
            None => (&src[body_start..], src.len()),
        };
        self.pos = next;
        self.push_node(Node::Comment(body.to_string()));
    }

    fn end_tag(&mut self) {
        self.pos += 2;
        let name = self
            .take_while(|c| c.is_ascii_alphanumeric() || c == '-')
            .to_ascii_lowercase();
        self.skip_past('>');
        if let Some(depth) = self.stack.iter().rposition(|el| el.tag == name.as_str()) {
            while self.stack.len() > depth {
                self.close_top();
            }
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self
            .take_while(|c| c.is_ascii_alphanumeric() || c == '-')
            .to_ascii_lowercase();
        let mut el = Element::new(name.as_str());
        let mut self_closing = false;

        let src = self.src;
        loop {
            self.skip_whitespace();
            let rest = &src[self.pos..];
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr_name = self
                .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'))
                .to_ascii_lowercase();
            if attr_name.is_empty() {
                // Lone '=' or similar garbage; step over it.
                let skip = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                self.pos += skip;
                continue;
            }
            self.skip_whitespace();
            let mut value = String::new();
            if src[self.pos..].starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                value = self.attr_value();
            }
            if el.attr(&attr_name).is_none() {
                el.attrs.push((attr_name.into(), value));
            }
        }

        if name == "li" && self.top_is("li") {
            self.close_top();
        }
        if CLOSES_PARAGRAPH.contains(&name.as_str()) && self.top_is("p") {
            self.close_top();
        }

        if el.is_void() || self_closing {
            self.push_node(Node::Element(el));
        } else if RAW_TEXT_TAGS.contains(&name.as_str()) {
            let rest = &src[self.pos..];
            let closing = format!("</{name}");
            let end = rest
                .to_ascii_lowercase()
                .find(&closing)
                .unwrap_or(rest.len());
            if end > 0 {
                el.children.push(Node::Text(rest[..end].to_string()));
            }
            self.pos += end;
            if self.pos < src.len() {
                self.skip_past('>');
            }
            self.push_node(Node::Element(el));
        } else {
            self.stack.push(el);
        }
    }

    fn attr_value(&mut self) -> String {
        let src = self.src;
        let rest = &src[self.pos..];
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let (raw, consumed) = match body.find(quote) {
                    Some(end) => (&body[..end], end + 2),
                    None => (body, rest.len()),
                };
                self.pos += consumed;
                decode_entities(raw).into_owned()
            }
            _ => {
                let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
                decode_entities(raw).into_owned()
            }
        }
    }
}

/// Decode the handful of character references editors actually produce.
///
/// Unknown references are left untouched.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(html: &str) -> String {
        serialize(&parse_fragment(html))
    }

    #[test]
    fn test_simple_round_trip() {
        let html = "<p>Hello <b>world</b></p><ul><li>one</li><li>two</li></ul>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_void_elements() {
        let html = r#"<p><br></p><div class="img-container"><img src="a.png" alt="x"></div><hr>"#;
        assert_eq!(round_trip(html), html);
        let nodes = parse_fragment("<img src='a.png'/>");
        assert_eq!(serialize(&nodes), r#"<img src="a.png">"#);
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        assert_eq!(round_trip("<p>open <i>italic"), "<p>open <i>italic</i></p>");
        assert_eq!(round_trip("text</span> more"), "text more");
        assert_eq!(round_trip("<p>one<p>two"), "<p>one</p><p>two</p>");
        assert_eq!(round_trip("<ul><li>a<li>b</ul>"), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_entities() {
        let nodes = parse_fragment("<p>a &amp; b &lt;c&gt; &nbsp;&#65;&#x42; &bogus;</p>");
        assert_eq!(nodes[0].text_content(), "a & b <c> \u{a0}AB &bogus;");
        assert_eq!(
            serialize(&nodes),
            "<p>a &amp; b &lt;c&gt; &nbsp;AB &amp;bogus;</p>"
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let el = Element::new("a").with_attr("href", "https://x.test/?a=1&b=\"2\"");
        let html = serialize(&[el.into()]);
        assert_eq!(html, r#"<a href="https://x.test/?a=1&amp;b=&quot;2&quot;"></a>"#);
        let reparsed = parse_fragment(&html);
        assert_eq!(
            reparsed[0].as_element().and_then(|e| e.attr("href")),
            Some("https://x.test/?a=1&b=\"2\"")
        );
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let messy = "<DIV Class=box>x<!-- note --><script>if (a < b) {}</script><p>y & z";
        let once = round_trip(messy);
        assert_eq!(round_trip(&once), once);
        assert_eq!(
            once,
            r#"<div class="box">x<!-- note --><script>if (a < b) {}</script><p>y &amp; z</p></div>"#
        );
    }

    #[test]
    fn test_swap_classes() {
        let mut el = Element::new("div").with_attr("class", "img-container align-center size-full");
        el.swap_classes(&["size-sm", "size-md", "size-full"], "size-sm");
        assert_eq!(el.attr("class"), Some("img-container align-center size-sm"));
        assert!(el.has_class("size-sm"));
        assert!(!el.has_class("size-full"));
    }

    #[test]
    fn test_units_and_paths() {
        let nodes = parse_fragment("<p>ab<img src=x>c</p><p>de</p>");
        assert_eq!(units(&nodes), 6);
        assert!(node_at(&nodes, &[0, 1]).is_some_and(Node::is_atom));
        assert_eq!(node_at(&nodes, &[1, 0]), Some(&Node::text("de")));
        assert!(node_at(&nodes, &[2]).is_none());
    }
}
