//! Message templates with per-language overrides.
//!
//! Templates are addressed by dotted keys (`notice.advance`). Lookup order is
//! the configured language file, then `en.json`, then the built-in English
//! set, and finally the dotted key itself so a missing template is visible
//! in the delivered message instead of silently dropped.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

const FALLBACK_LANG: &str = "en";

const BUILTIN_EN: &str = r#"{
  "notice": {
    "advance": "{name}'s next program will start in {minutes} minutes! ({title})",
    "starting_soon": "{name}'s next program will start in {minutes} minutes! ({title}, notice sent {late} minutes late)",
    "already_started": "{name}'s program has already started! ({title}, {minutes} minutes ago)"
  }
}"#;

/// Loaded template tables.
#[derive(Debug, Clone)]
pub struct Locale {
    lang: String,
    files: HashMap<String, Value>,
    builtin: Value,
}

impl Locale {
    /// English built-ins only.
    pub fn builtin() -> Self {
        Self {
            lang: FALLBACK_LANG.to_string(),
            files: HashMap::new(),
            builtin: serde_json::from_str(BUILTIN_EN).unwrap_or(Value::Null),
        }
    }

    /// Load `<dir>/<lang>.json` and `<dir>/en.json` when present.
    ///
    /// Unreadable or malformed files are logged and ignored.
    pub fn load(dir: Option<&Path>, lang: &str) -> Self {
        let mut locale = Self::builtin();
        locale.lang = lang.to_string();

        let Some(dir) = dir else {
            return locale;
        };

        let mut wanted = vec![lang.to_string()];
        if lang != FALLBACK_LANG {
            wanted.push(FALLBACK_LANG.to_string());
        }

        for code in wanted {
            let path = dir.join(format!("{code}.json"));
            if !path.exists() {
                debug!(path = %path.display(), "no template file for locale");
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str::<Value>(&s).map_err(|e| e.to_string()))
            {
                Ok(table) => {
                    locale.files.insert(code, table);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring bad template file"),
            }
        }

        locale
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Resolve `key` through the fallback chain.
    pub fn template(&self, key: &str) -> Option<&str> {
        let mut chain: Vec<&Value> = Vec::with_capacity(3);
        if let Some(v) = self.files.get(&self.lang) {
            chain.push(v);
        }
        if self.lang != FALLBACK_LANG {
            if let Some(v) = self.files.get(FALLBACK_LANG) {
                chain.push(v);
            }
        }
        chain.push(&self.builtin);

        chain.into_iter().find_map(|table| lookup(table, key))
    }

    /// Render the template at `key`, substituting `args`.
    pub fn render(&self, key: &str, args: &[(&str, String)]) -> String {
        match self.template(key) {
            Some(template) => {
                let used = placeholders(template);
                let unused: Vec<&str> = args
                    .iter()
                    .map(|(k, _)| *k)
                    .filter(|k| !used.contains(k))
                    .collect();
                if !unused.is_empty() {
                    debug!(key, ?unused, "unused template arguments");
                }
                format_template(template, args)
            }
            None => key.to_string(),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::builtin()
    }
}

fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(table, |node, part| node.get(part))
        .and_then(Value::as_str)
}

fn placeholders(template: &str) -> HashSet<&str> {
    let mut names = HashSet::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.insert(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

/// Substitute `{name}` placeholders, leaving unknown ones untouched.
///
/// `{{` and `}}` produce literal braces.
pub fn format_template(template: &str, args: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                out.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let tail = &template[i + 1..];
                let Some(close) = tail.find('}') else {
                    out.push_str(&template[i..]);
                    break;
                };
                let name = &tail[..close];
                match args.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                // skip over the name and the closing brace
                for _ in 0..name.chars().count() + 1 {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }

    out
}
