use error_handler::{ConfigError, JsonErrorType};

use std::collections::HashMap;
use std::path::Path;
use tree_sitter::Node;

/// Section/key view of a JSON configuration file.
///
/// Top-level objects are sections. Deeper objects are flattened into dotted
/// keys, so `{"network": {"server": {"bind": "..."}}}` is looked up as
/// section `network`, key `server.bind`. Scalars are kept as text and
/// converted on lookup. Names are case-insensitive.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    sections: HashMap<String, HashMap<String, String>>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path)?;
        let text = std::str::from_utf8(&raw)?;
        Self::parse(text)
    }

    pub fn parse(code: &str) -> Result<Self, ConfigError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(tree_sitter_json::language())
            .map_err(|_| ConfigError::Json(JsonErrorType::ParseError))?;
        let tree = parser.parse(code, None).ok_or(ConfigError::Json(JsonErrorType::ParseError))?;
        let root = tree.root_node();

        let mut config = AppConfig::default();
        let mut cursor = root.walk();
        let top = root
            .named_children(&mut cursor)
            .find(|node| node.kind() != "comment")
            .ok_or(ConfigError::Json(JsonErrorType::UnreachableChild))?;
        if top.kind() != "object" {
            return Err(ConfigError::Json(JsonErrorType::UnexpectedNode(top.kind().to_string())));
        }

        for (key, value) in Self::pairs(top, code)? {
            if value.kind() == "object" {
                let section = config.sections.entry(key.to_lowercase()).or_default();
                Self::flatten(value, code, "", section)?;
            } else {
                let text = Self::scalar(value, code)?;
                config.sections.entry(String::new()).or_default().insert(key.to_lowercase(), text);
            }
        }
        Ok(config)
    }

    fn pairs<'tree>(object: Node<'tree>, code: &str) -> Result<Vec<(String, Node<'tree>)>, ConfigError> {
        let mut pairs = Vec::new();
        let mut cursor = object.walk();
        for child in object.named_children(&mut cursor) {
            match child.kind() {
                "pair" => {
                    let key = child
                        .child_by_field_name("key")
                        .ok_or(ConfigError::Json(JsonErrorType::UnreachableChild))?;
                    let value = child
                        .child_by_field_name("value")
                        .ok_or(ConfigError::Json(JsonErrorType::UnreachableChild))?;
                    pairs.push((Self::unquote(key, code), value));
                }
                // comments and recovered trailing commas
                _ => {}
            }
        }
        Ok(pairs)
    }

    fn flatten(object: Node, code: &str, prefix: &str, section: &mut HashMap<String, String>) -> Result<(), ConfigError> {
        for (key, value) in Self::pairs(object, code)? {
            let name = if prefix.is_empty() {
                key.to_lowercase()
            } else {
                format!("{}.{}", prefix, key.to_lowercase())
            };
            if value.kind() == "object" {
                Self::flatten(value, code, &name, section)?;
            } else {
                section.insert(name, Self::scalar(value, code)?);
            }
        }
        Ok(())
    }

    fn scalar(node: Node, code: &str) -> Result<String, ConfigError> {
        match node.kind() {
            "string" => Ok(Self::unquote(node, code)),
            "number" | "true" | "false" | "null" => Ok(code[node.start_byte()..node.end_byte()].to_string()),
            // lists are kept in the comma separated form the accessors expect
            "array" => {
                let mut items = Vec::new();
                let mut cursor = node.walk();
                for item in node.named_children(&mut cursor) {
                    if item.kind() != "comment" {
                        items.push(Self::scalar(item, code)?);
                    }
                }
                Ok(items.join(","))
            }
            other => Err(ConfigError::Json(JsonErrorType::UnexpectedNode(other.to_string()))),
        }
    }

    fn unquote(node: Node, code: &str) -> String {
        let text = &code[node.start_byte()..node.end_byte()];
        text.strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .unwrap_or(text)
            .to_string()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section.to_lowercase())
            .and_then(|keys| keys.get(&key.to_lowercase()))
            .map(String::as_str)
    }

    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.get(section, key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                logger::warn!("Config {}.{}: '{}' is not an integer, using {}", section, key, raw, default);
                default
            }),
            None => default,
        }
    }

    pub fn get_u32(&self, section: &str, key: &str, default: u32) -> u32 {
        u32::try_from(self.get_int(section, key, i64::from(default))).unwrap_or(default)
    }

    pub fn get_u16(&self, section: &str, key: &str, default: u16) -> u16 {
        u16::try_from(self.get_int(section, key, i64::from(default))).unwrap_or(default)
    }

    pub fn get_usize(&self, section: &str, key: &str, default: usize) -> usize {
        usize::try_from(self.get_int(section, key, default as i64)).unwrap_or(default)
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get(section, key).map(|raw| raw.trim().to_ascii_lowercase()) {
            Some(raw) => match raw.as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(&section.to_lowercase())
    }
}
