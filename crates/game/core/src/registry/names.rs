use std::collections::HashMap;

use crate::state::DenseId;

use super::RegistryError;

/// Interns names into dense ids, allocated in registration order.
#[derive(Clone, Debug)]
pub struct NameTable<Id> {
    names: Vec<String>,
    ids: HashMap<String, Id>,
}

impl<Id: DenseId> Default for NameTable<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: DenseId> NameTable<Id> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Returns the id for `name`, allocating the next one on first sight.
    pub fn intern(&mut self, name: &str) -> Result<Id, RegistryError> {
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }
        if self.names.len() >= Id::LIMIT {
            return Err(RegistryError::NameTableFull {
                name: name.to_owned(),
                limit: Id::LIMIT,
            });
        }
        let id = Id::from_index(self.names.len());
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<Id> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: Id) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (Id::from_index(index), name.as_str()))
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TagId;

    #[test]
    fn interning_is_stable_and_dense() {
        let mut tags = NameTable::<TagId>::new();
        let burning = tags.intern("burning").unwrap();
        let frozen = tags.intern("frozen").unwrap();

        assert_eq!(burning, TagId(0));
        assert_eq!(frozen, TagId(1));
        assert_eq!(tags.intern("burning").unwrap(), burning);
        assert_eq!(tags.name(frozen), Some("frozen"));
        assert_eq!(tags.id("wet"), None);
        assert_eq!(tags.len(), 2);

        tags.clear();
        assert!(tags.is_empty());
        assert_eq!(tags.intern("frozen").unwrap(), TagId(0));
    }
}
