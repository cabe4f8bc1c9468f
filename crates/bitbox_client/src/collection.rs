use bitbox_shared::{domain::Identified, error::DisplayedError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Loaded,
    Failed(DisplayedError),
}

impl LoadStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadStatus::Loaded)
    }
}

/// In-memory copy of one backend list, as last confirmed by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCollection<T> {
    items: Vec<T>,
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> EntityCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.get(id).is_some()
    }

    /// Replaces the whole list with a fresh server snapshot.
    pub fn reset(&mut self, items: Vec<T>) {
        self.items = items;
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    /// Swaps in the entry with the same id. Returns false when no entry matched.
    pub fn replace(&mut self, item: T) -> bool {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }
}

impl<T> From<Vec<T>> for EntityCollection<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use bitbox_shared::{domain::StudentId, models::Student};

    use super::*;

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: StudentId::from(id),
            name: name.to_string(),
            surname: "doe".to_string(),
            email: format!("{name}@example.com"),
        }
    }

    #[test]
    fn replace_only_touches_matching_id() {
        let mut students = EntityCollection::from(vec![student("s1", "ada"), student("s2", "bob")]);

        assert!(students.replace(student("s2", "robert")));
        assert_eq!(students.get(&StudentId::from("s2")).map(|s| s.name.as_str()), Some("robert"));
        assert_eq!(students.get(&StudentId::from("s1")).map(|s| s.name.as_str()), Some("ada"));

        assert!(!students.replace(student("s9", "ghost")));
        assert_eq!(students.len(), 2);
    }

    #[test]
    fn remove_drops_exactly_one_entry() {
        let mut students = EntityCollection::from(vec![
            student("s1", "ada"),
            student("s2", "bob"),
            student("s3", "cy"),
        ]);

        let removed = students.remove(&StudentId::from("s2")).expect("removed");
        assert_eq!(removed.name, "bob");
        assert_eq!(students.len(), 2);
        assert!(!students.contains(&StudentId::from("s2")));
        assert!(students.remove(&StudentId::from("s2")).is_none());
        assert_eq!(students.len(), 2);
    }
}
