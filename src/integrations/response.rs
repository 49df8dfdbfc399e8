use crate::error::{LensError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Child tag of every homogeneous collection in a response, keyed by the
/// slash-joined path below `<rsp>`.
const COLLECTION_TAGS: [(&str, &str); 17] = [
    ("contacts", "contact"),
    ("groups", "group"),
    ("groups/group/contacts", "contact"),
    ("method/arguments", "argument"),
    ("method/errors", "error"),
    ("methods", "method"),
    ("list/taskseries/notes", "note"),
    ("list/taskseries/participants", "participant"),
    ("list/taskseries/task/tags", "tag"),
    ("lists", "list"),
    ("locations", "location"),
    ("tasks", "list"),
    ("tasks/list", "taskseries"),
    ("tasks/list/taskseries/notes", "note"),
    ("tasks/list/taskseries/participants", "participant"),
    ("tasks/list/taskseries/tags", "tag"),
    ("timezones", "timezone"),
];

fn collection_tags() -> &'static HashMap<&'static str, &'static str> {
    static TAGS: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TAGS.get_or_init(|| COLLECTION_TAGS.into_iter().collect())
}

#[derive(Clone, Debug, Default)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Element {
        Element {
            tag: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|attr| (attr.name().to_string(), attr.value().to_string()))
                .collect(),
            text: node.text().map(str::to_string),
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(Element::from_node)
                .collect(),
        }
    }
}

/// A parsed `<rsp>` document.
#[derive(Clone, Debug)]
pub struct Response {
    method: String,
    root: Element,
}

impl Response {
    /// Parses a response body; `stat="fail"` becomes an `Api` error.
    pub fn parse(method: &str, body: &str) -> Result<Response> {
        let doc = roxmltree::Document::parse(body)?;
        let root = Element::from_node(doc.root_element());
        if root.tag != "rsp" {
            return Err(LensError::MalformedResponse(format!(
                "{method}: expected <rsp>, got <{}>",
                root.tag
            )));
        }

        let response = Response {
            method: method.to_string(),
            root,
        };
        let rsp = response.rsp();
        if rsp.attr("stat") == Some("fail") {
            let err = rsp.child("err");
            return Err(LensError::Api {
                code: err
                    .as_ref()
                    .and_then(|e| e.attr("code"))
                    .unwrap_or("")
                    .to_string(),
                message: err
                    .as_ref()
                    .and_then(|e| e.attr("msg"))
                    .unwrap_or("")
                    .to_string(),
            });
        }
        Ok(response)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn rsp(&self) -> Node<'_> {
        Node {
            element: &self.root,
            path: String::new(),
        }
    }

    /// Shorthand for `rsp().require(name)`.
    pub fn get(&self, name: &str) -> Result<Node<'_>> {
        self.rsp().require(name)
    }
}

/// A view of one element plus the path that led to it.
#[derive(Clone, Debug)]
pub struct Node<'a> {
    element: &'a Element,
    path: String,
}

impl<'a> Node<'a> {
    #[cfg(test)]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> Option<&'a str> {
        self.element.text.as_deref()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, or the empty string when absent.
    pub fn attr_or_empty(&self, name: &str) -> String {
        self.attr(name).unwrap_or("").to_string()
    }

    pub fn child(&self, name: &str) -> Option<Node<'a>> {
        self.element
            .children
            .iter()
            .find(|child| child.tag == name)
            .map(|element| Node {
                element,
                path: self.join(name),
            })
    }

    pub fn require(&self, name: &str) -> Result<Node<'a>> {
        self.child(name).ok_or_else(|| {
            LensError::MalformedResponse(format!("missing <{name}> under {:?}", self.path))
        })
    }

    /// Children of a collection node, selected through the path table.
    pub fn collection(&self) -> Result<Vec<Node<'a>>> {
        let Some(child_tag) = collection_tags().get(self.path.as_str()) else {
            return Err(LensError::UnknownCollection(self.path.clone()));
        };
        let path = self.join(child_tag);
        Ok(self
            .element
            .children
            .iter()
            .filter(|child| child.tag == *child_tag)
            .map(|element| Node {
                element,
                path: path.clone(),
            })
            .collect())
    }

    /// All direct children with the given tag, regardless of the path table.
    pub fn children_named(&self, name: &str) -> Vec<Node<'a>> {
        let path = self.join(name);
        self.element
            .children
            .iter()
            .filter(|child| child.tag == name)
            .map(|element| Node {
                element,
                path: path.clone(),
            })
            .collect()
    }

    fn join(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        }
    }
}
