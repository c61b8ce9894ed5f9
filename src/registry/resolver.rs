//! Multi-root path resolution.
//!
//! A descriptor declares one path. Storage gets reorganised, so the file may
//! live under a different root with the same relative layout; the resolver
//! re-anchors the declared path under each candidate root and keeps the first
//! hit. When nothing exists the declared path stays as the generation target.

use super::reconcile::FactSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    /// False when no candidate existed and `path` is the declared path.
    pub found: bool,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    roots: Vec<String>,
}

impl PathResolver {
    /// `roots` are site-rooted directories, searched in order.
    pub fn new(roots: &[String]) -> Self {
        let roots = roots
            .iter()
            .map(|r| {
                let trimmed = r.trim().trim_end_matches('/');
                if trimmed.starts_with('/') {
                    trimmed.to_string()
                } else {
                    format!("/{trimmed}")
                }
            })
            .filter(|r| r != "/")
            .collect();
        Self { roots }
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Part of `declared` below the first root containing it, else the file name.
    fn relative_part<'a>(&self, declared: &'a str) -> &'a str {
        for root in &self.roots {
            if let Some(rest) = declared.strip_prefix(root.as_str()) {
                if let Some(rel) = rest.strip_prefix('/') {
                    return rel;
                }
            }
        }
        declared.rsplit('/').next().unwrap_or(declared)
    }

    /// Declared path first, then the relative part under every root; no duplicates.
    pub fn candidates(&self, declared: &str) -> Vec<String> {
        let mut out = vec![declared.to_string()];
        let rel = self.relative_part(declared);
        if rel.is_empty() {
            return out;
        }
        for root in &self.roots {
            let candidate = format!("{root}/{rel}");
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    pub fn resolve(&self, declared: &str, facts: &dyn FactSource) -> Resolution {
        for candidate in self.candidates(declared) {
            if facts.exists(&candidate) {
                return Resolution {
                    path: candidate,
                    found: true,
                };
            }
        }
        Resolution {
            path: declared.to_string(),
            found: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::reconcile::memory::MemoryFacts;
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new(&[
            "/assets/downloads/".into(),
            "downloads".into(),
            "/assets/vault".into(),
        ])
    }

    #[test]
    fn roots_are_normalized() {
        assert_eq!(
            resolver().roots(),
            &["/assets/downloads", "/downloads", "/assets/vault"]
        );
    }

    #[test]
    fn candidates_keep_relative_layout() {
        let c = resolver().candidates("/assets/downloads/frameworks/grid.pdf");
        assert_eq!(
            c,
            vec![
                "/assets/downloads/frameworks/grid.pdf",
                "/downloads/frameworks/grid.pdf",
                "/assets/vault/frameworks/grid.pdf",
            ]
        );
    }

    #[test]
    fn path_outside_roots_uses_file_name() {
        let c = resolver().candidates("/legacy/pdfs/grid.pdf");
        assert_eq!(c[0], "/legacy/pdfs/grid.pdf");
        assert_eq!(c[1], "/assets/downloads/grid.pdf");
        assert_eq!(c.len(), 4);
    }

    #[test]
    fn declared_path_wins_when_present() {
        let facts = MemoryFacts::new()
            .with_file("/assets/downloads/a.pdf", b"x")
            .with_file("/downloads/a.pdf", b"y");
        let r = resolver().resolve("/assets/downloads/a.pdf", &facts);
        assert_eq!(r, Resolution { path: "/assets/downloads/a.pdf".into(), found: true });
    }

    #[test]
    fn first_existing_root_wins() {
        let facts = MemoryFacts::new()
            .with_file("/downloads/a.pdf", b"y")
            .with_file("/assets/vault/a.pdf", b"z");
        let r = resolver().resolve("/assets/downloads/a.pdf", &facts);
        assert_eq!(r.path, "/downloads/a.pdf");
        assert!(r.found);
    }

    #[test]
    fn nothing_found_keeps_declared_target() {
        let r = resolver().resolve("/assets/downloads/a.pdf", &MemoryFacts::new());
        assert_eq!(r.path, "/assets/downloads/a.pdf");
        assert!(!r.found);
    }
}
