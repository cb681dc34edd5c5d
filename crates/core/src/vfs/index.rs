use std::collections::HashSet;

/// Backslashes become forward slashes, leading `./` and `/` are dropped and
/// repeated slashes collapse. Case is left alone.
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

pub fn fold_case(path: &str) -> String {
    path.to_lowercase()
}

/// Listing of one backend plus a case-folded lookup set.
///
/// The listing keeps every spelling a backend reports, even ones that only
/// differ by case.
#[derive(Debug, Default, Clone)]
pub struct PathIndex {
    entries: Vec<String>,
    folded: HashSet<String>,
}

impl PathIndex {
    pub fn insert(&mut self, path: &str) {
        let normalized = normalize(path);
        if normalized.is_empty() {
            return;
        }
        self.folded.insert(fold_case(&normalized));
        self.entries.push(normalized);
    }

    /// `query` must already be normalized.
    pub fn contains(&self, query: &str) -> bool {
        self.folded.contains(&fold_case(query))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for PathIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = PathIndex::default();
        for path in iter {
            index.insert(path.as_ref());
        }
        index
    }
}
