//! Path matching for registered assets.
//!
//! Definitions are either literal paths (`/css/main.css`) or patterns made
//! of `/`-separated segments where `:name` matches exactly one segment and
//! a trailing `*` matches one or more remaining segments
//! (`/fonts/:file`, `/vendor/*`). Literal definitions always win over
//! patterns; patterns are tried in registration order.

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    Wildcard,
}

#[derive(Debug, Clone)]
struct Pattern {
    definition: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a definition, returning `None` when it has no dynamic segment.
    fn parse(definition: &str) -> Option<Self> {
        let parts: Vec<&str> = segments(definition).collect();
        let last = parts.len().saturating_sub(1);
        let mut dynamic = false;

        let segments = parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                if part.starts_with(':') && part.len() > 1 {
                    dynamic = true;
                    Segment::Param
                } else if *part == "*" && i == last {
                    dynamic = true;
                    Segment::Wildcard
                } else {
                    Segment::Literal((*part).to_string())
                }
            })
            .collect();

        dynamic.then(|| Self {
            definition: definition.to_string(),
            segments,
        })
    }

    fn matches(&self, path: &str) -> bool {
        let mut parts = segments(path);
        for segment in &self.segments {
            match segment {
                Segment::Wildcard => return parts.next().is_some_and(|p| !p.is_empty()),
                Segment::Param => match parts.next() {
                    Some(part) if !part.is_empty() => {}
                    _ => return false,
                },
                Segment::Literal(lit) => {
                    if parts.next() != Some(lit.as_str()) {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

/// Whether a definition contains a `:param` or trailing `*` segment.
pub fn is_pattern(definition: &str) -> bool {
    Pattern::parse(definition).is_some()
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

/// Maps path definitions to values.
#[derive(Debug)]
pub struct PathMatcher<T> {
    literals: FxHashMap<String, T>,
    patterns: Vec<(Pattern, T)>,
}

impl<T> Default for PathMatcher<T> {
    fn default() -> Self {
        Self {
            literals: FxHashMap::default(),
            patterns: Vec::new(),
        }
    }
}

impl<T> PathMatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for a definition. Returns the replaced value.
    pub fn insert(&mut self, definition: &str, value: T) -> Option<T> {
        let Some(pattern) = Pattern::parse(definition) else {
            return self.literals.insert(definition.to_string(), value);
        };

        match self
            .patterns
            .iter_mut()
            .find(|(p, _)| p.definition == definition)
        {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.patterns.push((pattern, value));
                None
            }
        }
    }

    /// Find the value whose definition matches `path`.
    pub fn find(&self, path: &str) -> Option<&T> {
        if let Some(value) = self.literals.get(path) {
            return Some(value);
        }
        self.patterns
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, value)| value)
    }

    /// All `(definition, value)` pairs, literals first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.literals
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .chain(self.patterns.iter().map(|(p, v)| (p.definition.as_str(), v)))
    }

    pub fn len(&self) -> usize {
        self.literals.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
