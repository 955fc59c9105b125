use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::handle::GpuHandle;
use crate::scene::SceneObject;

/// Identifier returned by [`crate::Renderer::add_object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered object and the buffers uploaded for it.
#[derive(Debug)]
pub struct RegistryEntry<B> {
    pub object: Arc<SceneObject>,
    pub vertices: GpuHandle<B>,
    pub colors: GpuHandle<B>,
}

/// Flat registry of drawable objects.
///
/// Iteration follows identifier order, which is insertion order because the
/// renderer only hands out increasing identifiers.
#[derive(Debug)]
pub struct ObjectRegistry<B> {
    entries: BTreeMap<ObjectId, RegistryEntry<B>>,
}

impl<B> Default for ObjectRegistry<B> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<B> ObjectRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Inserts under `id`. An occupied id hands the entry back untouched.
    pub fn insert(
        &mut self,
        id: ObjectId,
        entry: RegistryEntry<B>,
    ) -> Result<(), RegistryEntry<B>> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => Err(entry),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&RegistryEntry<B>> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<RegistryEntry<B>> {
        self.entries.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &RegistryEntry<B>)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Removes every entry, in identifier order.
    pub fn drain(&mut self) -> Vec<RegistryEntry<B>> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::PointList;

    fn entry(name: &str) -> RegistryEntry<u32> {
        RegistryEntry {
            object: Arc::new(SceneObject::mesh(name, PointList::default())),
            vertices: GpuHandle::new(0, 0, 3),
            colors: GpuHandle::new(1, 0, 4),
        }
    }

    fn names(registry: &ObjectRegistry<u32>) -> Vec<String> {
        registry
            .iter()
            .map(|(_, entry)| entry.object.name.clone())
            .collect()
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut registry = ObjectRegistry::new();
        for (index, name) in ["c", "a", "b"].into_iter().enumerate() {
            registry.insert(ObjectId::new(index as u32), entry(name)).unwrap();
        }
        assert_eq!(names(&registry), ["c", "a", "b"]);
    }

    #[test]
    fn occupied_id_is_rejected() {
        let mut registry = ObjectRegistry::new();
        registry.insert(ObjectId::new(0), entry("first")).unwrap();
        let rejected = registry.insert(ObjectId::new(0), entry("second")).unwrap_err();
        assert_eq!(rejected.object.name, "second");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ObjectId::new(0)).unwrap().object.name, "first");
    }

    #[test]
    fn iteration_follows_identifiers_not_call_order() {
        let mut registry = ObjectRegistry::new();
        registry.insert(ObjectId::new(7), entry("late")).unwrap();
        registry.insert(ObjectId::new(2), entry("early")).unwrap();
        let ids: Vec<u32> = registry.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, [2, 7]);
    }

    #[test]
    fn removal_keeps_remaining_order() {
        let mut registry = ObjectRegistry::new();
        for (index, name) in ["a", "b", "c"].into_iter().enumerate() {
            registry.insert(ObjectId::new(index as u32), entry(name)).unwrap();
        }
        assert!(registry.remove(ObjectId::new(1)).is_some());
        assert!(registry.remove(ObjectId::new(1)).is_none());
        assert!(!registry.contains(ObjectId::new(1)));
        assert_eq!(names(&registry), ["a", "c"]);

        let drained: Vec<String> = registry
            .drain()
            .into_iter()
            .map(|entry| entry.object.name.clone())
            .collect();
        assert_eq!(drained, ["a", "c"]);
        assert!(registry.is_empty());
    }
}
