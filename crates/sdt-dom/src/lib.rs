//! DOM tree data structures.
//!
//! Nodes live in an arena owned by [`Document`] and are addressed by [`NodeId`].
//! Detached nodes stay in the arena until the document is dropped; every query
//! that walks "the document" only visits nodes reachable from the root.

use sdt_core::ShellError;
use sdt_core::ShellResult;

/// ID used to address nodes in the DOM arena.
pub type NodeId = usize;

const ROOT: NodeId = 0;

/// Payload stored in a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

/// Tag name plus ordered attribute list of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|name| name == class))
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value.to_owned(),
            None => self.attrs.push((name, value.to_owned())),
        }
    }

    fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// Document holding only the root node.
    pub fn empty() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Document with an `html > (head, body)` skeleton.
    pub fn page() -> Self {
        let mut document = Self::empty();
        document.ensure_page_skeleton();
        document
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn has_root(&self) -> bool {
        !self.nodes[ROOT].children.is_empty()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(tag);
        for (name, value) in attrs {
            data.set_attr(name, value);
        }
        self.push_node(NodeData::Element(data))
    }

    /// Creates an element directly from parsed data, keeping attribute order as given.
    pub fn create_element_from(&mut self, data: ElementData) -> NodeId {
        self.push_node(NodeData::Element(data))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_owned()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn data(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node).map(|entry| &entry.data)
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.data(node) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> ShellResult<&mut ElementData> {
        match self.nodes.get_mut(node).map(|entry| &mut entry.data) {
            Some(NodeData::Element(element)) => Ok(element),
            Some(_) => Err(ShellError::new(
                "dom.not_an_element",
                format!("node {node} is not an element"),
            )),
            None => Err(missing_node(node)),
        }
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag.as_str())
    }

    pub fn is_element(&self, node: NodeId, tag: &str) -> bool {
        self.tag_name(node)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|entry| entry.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    /// True when the node is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ROOT {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn ensure_exists(&self, node: NodeId) -> ShellResult<()> {
        if node < self.nodes.len() {
            Ok(())
        } else {
            Err(missing_node(node))
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Inserts `child` under `parent` before `reference`, or last when `reference` is `None`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> ShellResult<()> {
        self.ensure_exists(parent)?;
        self.ensure_exists(child)?;
        if child == ROOT || self.is_ancestor_or_self(child, parent) {
            return Err(ShellError::new(
                "dom.hierarchy_invalid",
                format!("cannot insert node {child} under its own descendant {parent}"),
            ));
        }
        if matches!(self.nodes[parent].data, NodeData::Text(_)) {
            return Err(ShellError::new(
                "dom.hierarchy_invalid",
                format!("text node {parent} cannot have children"),
            ));
        }

        self.detach(child);
        let position = match reference {
            Some(reference) => self.nodes[parent]
                .children
                .iter()
                .position(|candidate| *candidate == reference)
                .ok_or_else(|| {
                    ShellError::new(
                        "dom.reference_not_child",
                        format!("node {reference} is not a child of {parent}"),
                    )
                })?,
            None => self.nodes[parent].children.len(),
        };
        self.nodes[parent].children.insert(position, child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> ShellResult<()> {
        self.insert_before(parent, child, None)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> ShellResult<()> {
        let first = self.children(parent).first().copied();
        self.insert_before(parent, child, first)
    }

    /// Removes the node from its parent. No-op for detached nodes.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.nodes[parent].children.retain(|child| *child != node);
        self.nodes[node].parent = None;
    }

    pub fn clear_children(&mut self, node: NodeId) {
        let Some(entry) = self.nodes.get_mut(node) else {
            return;
        };
        let children = std::mem::take(&mut entry.children);
        for child in children {
            self.nodes[child].parent = None;
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|element| element.attr(name))
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> ShellResult<()> {
        self.element_mut(node)?.set_attr(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> ShellResult<()> {
        self.element_mut(node)?.remove_attr(name);
        Ok(())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|element| element.has_class(class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> ShellResult<()> {
        if self.has_class(node, class) {
            return Ok(());
        }
        let element = self.element_mut(node)?;
        let mut value = element.attr("class").unwrap_or_default().trim().to_owned();
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(class);
        element.set_attr("class", &value);
        Ok(())
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> ShellResult<()> {
        let element = self.element_mut(node)?;
        let Some(current) = element.attr("class") else {
            return Ok(());
        };
        let remaining = current
            .split_ascii_whitespace()
            .filter(|name| *name != class)
            .collect::<Vec<_>>()
            .join(" ");
        element.set_attr("class", &remaining);
        Ok(())
    }

    /// Flips the class and returns whether it is present afterwards.
    pub fn toggle_class(&mut self, node: NodeId, class: &str) -> ShellResult<bool> {
        if self.has_class(node, class) {
            self.remove_class(node, class)?;
            Ok(false)
        } else {
            self.add_class(node, class)?;
            Ok(true)
        }
    }

    pub fn style_property(&self, node: NodeId, name: &str) -> Option<String> {
        let style = self.attribute(node, "style")?;
        parse_style_declarations(style)
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Sets an inline style property; an empty value removes it.
    pub fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) -> ShellResult<()> {
        let mut declarations = self
            .attribute(node, "style")
            .map(parse_style_declarations)
            .unwrap_or_default();
        declarations.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        if !value.is_empty() {
            declarations.push((name.to_ascii_lowercase(), value.to_owned()));
        }

        if declarations.is_empty() {
            return self.remove_attribute(node, "style");
        }

        let serialized = declarations
            .iter()
            .map(|(key, value)| format!("{key}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(node, "style", &serialized)
    }

    /// Pre-order descendants of `node`, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn find_first(&self, scope: NodeId, predicate: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|node| self.element(*node).is_some_and(&predicate))
    }

    pub fn find_all(&self, scope: NodeId, predicate: impl Fn(&ElementData) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| self.element(*node).is_some_and(&predicate))
            .collect()
    }

    pub fn first_element_by_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.find_first(scope, |element| element.tag.eq_ignore_ascii_case(tag))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_first(ROOT, |element| element.id() == Some(id))
    }

    /// Nearest ancestor-or-self element with the given tag.
    pub fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.is_element(id, tag) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeData::Text(text)) = self.data(node) {
            out.push_str(text);
        }
        for descendant in self.descendants(node) {
            if let Some(NodeData::Text(text)) = self.data(descendant) {
                out.push_str(text);
            }
        }
        out
    }

    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> ShellResult<()> {
        self.ensure_exists(node)?;
        self.clear_children(node);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(node, text_node)?;
        }
        Ok(())
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(ROOT)
            .iter()
            .copied()
            .find(|child| self.is_element(*child, "html"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.is_element(*child, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|child| self.is_element(*child, "body"))
    }

    /// Guarantees `html > head + body`, moving stray content into `body`.
    pub fn ensure_page_skeleton(&mut self) {
        let html = match self.document_element() {
            Some(html) => html,
            None => {
                let html = self.create_element("html");
                let stray: Vec<NodeId> = self.children(ROOT).to_vec();
                for child in stray {
                    self.move_node_unchecked(html, child);
                }
                self.move_node_unchecked(ROOT, html);
                html
            }
        };

        if self.body().is_none() {
            let body = self.create_element("body");
            let stray: Vec<NodeId> = self
                .children(html)
                .iter()
                .copied()
                .filter(|child| !self.is_element(*child, "head"))
                .collect();
            for child in stray {
                self.move_node_unchecked(body, child);
            }
            self.move_node_unchecked(html, body);
        }

        if self.head().is_none() {
            let head = self.create_element("head");
            self.detach(head);
            self.nodes[html].children.insert(0, head);
            self.nodes[head].parent = Some(html);
        }
    }

    fn move_node_unchecked(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
    }

    /// Collapsed text of the first `<title>` in the document.
    pub fn title(&self) -> String {
        self.first_element_by_tag(ROOT, "title")
            .map(|title| collapse_whitespace(&self.text_content(title)))
            .unwrap_or_default()
    }

    pub fn set_title(&mut self, title: &str) -> ShellResult<()> {
        let node = match self.first_element_by_tag(ROOT, "title") {
            Some(node) => node,
            None => {
                self.ensure_page_skeleton();
                let head = self.head().ok_or_else(|| {
                    ShellError::new("dom.head_missing", "document has no head element")
                })?;
                let node = self.create_element("title");
                self.append_child(head, node)?;
                node
            }
        };
        self.set_text_content(node, title)
    }

    /// Replaces the children of `target` with deep copies of `source_node`'s children.
    pub fn replace_children_from(
        &mut self,
        target: NodeId,
        source: &Document,
        source_node: NodeId,
    ) -> ShellResult<()> {
        self.ensure_exists(target)?;
        source.ensure_exists(source_node)?;
        self.clear_children(target);
        for child in source.children(source_node) {
            let imported = self.import_subtree(source, *child);
            self.append_child(target, imported)?;
        }
        Ok(())
    }

    /// Deep-copies a subtree from another document into this arena, detached.
    pub fn import_subtree(&mut self, source: &Document, source_node: NodeId) -> NodeId {
        let data = source
            .data(source_node)
            .cloned()
            .unwrap_or(NodeData::Text(String::new()));
        let copy = self.push_node(data);
        for child in source.children(source_node) {
            let imported = self.import_subtree(source, *child);
            self.nodes[imported].parent = Some(copy);
            self.nodes[copy].children.push(imported);
        }
        copy
    }
}

fn missing_node(node: NodeId) -> ShellError {
    ShellError::new("dom.node_missing", format!("node {node} does not exist"))
}

fn parse_style_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.to_owned()))
        })
        .collect()
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
