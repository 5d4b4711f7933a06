use std::collections::HashSet;

/// Hands out unique element ids within one document.
#[derive(Debug, Default)]
pub struct AnchorSet {
    used: HashSet<String>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `preferred` (or a slug of `text`) made unique by a numeric
    /// suffix. `None` when nothing usable remains after slugging.
    pub fn claim(&mut self, preferred: Option<&str>, text: &str) -> Option<String> {
        let base = match preferred.filter(|p| !p.trim().is_empty()) {
            Some(id) => id.trim().to_string(),
            None => slug::slugify(text),
        };
        if base.is_empty() {
            return None;
        }
        if self.used.insert(base.clone()) {
            return Some(base);
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                return Some(candidate);
            }
            n += 1;
        }
    }
}
