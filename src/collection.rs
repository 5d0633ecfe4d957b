use crate::entry::{Entry, EntryKey};
use crate::restype::ResourceType;
use std::collections::HashSet;
use std::slice;

//===========================================================================//

/// The most entries a container can hold (the directory count is 16 bits).
pub const MAX_ENTRIES: usize = u16::MAX as usize;

//===========================================================================//

/// An ordered set of entries, unique by key, belonging to an icon or cursor
/// container.
///
/// Entries are moved in by value.  An entry that would break the
/// collection's rules (a duplicate key, an invalid size, a cursor hotspot
/// outside the image, or a full collection) is handed back in the `Err`
/// variant so the caller keeps ownership of it.
#[derive(Clone, Debug)]
pub struct EntryCollection {
    restype: ResourceType,
    entries: Vec<Entry>,
    keys: HashSet<EntryKey>,
}

impl EntryCollection {
    /// Creates an empty collection for the given resource type.
    pub fn new(restype: ResourceType) -> EntryCollection {
        EntryCollection { restype, entries: Vec::new(), keys: HashSet::new() }
    }

    /// Returns the resource type whose rules this collection enforces.
    pub fn resource_type(&self) -> ResourceType {
        self.restype
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in collection order.
    pub fn iter(&self) -> slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Returns the entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Returns the entries in collection order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the keys of the entries in collection order.
    pub fn keys(&self) -> Vec<EntryKey> {
        self.entries.iter().map(Entry::key).collect()
    }

    /// Returns true if `entry` could be added without breaking any rule,
    /// ignoring whichever entry currently sits at `replacing`.
    fn accepts(&self, entry: &Entry, replacing: Option<usize>) -> bool {
        let key = entry.key();
        if !key.is_valid() {
            return false;
        }
        if self.restype == ResourceType::Cursor {
            let (x, y) = entry.hotspot();
            if x as u32 > entry.width() || y as u32 > entry.height() {
                return false;
            }
        }
        match replacing {
            Some(index) => {
                self.entries[index].key() == key || !self.keys.contains(&key)
            }
            None => {
                self.entries.len() < MAX_ENTRIES && !self.keys.contains(&key)
            }
        }
    }

    /// Inserts `entry` at `index`, shifting later entries along.  The entry
    /// is handed back if `index > len()` or the collection won't accept it.
    pub fn insert(&mut self, index: usize, entry: Entry) -> Result<(), Entry> {
        if index > self.entries.len() || !self.accepts(&entry, None) {
            return Err(entry);
        }
        self.keys.insert(entry.key());
        self.entries.insert(index, entry);
        Ok(())
    }

    /// Appends `entry` to the end of the collection.
    pub fn push(&mut self, entry: Entry) -> Result<(), Entry> {
        let index = self.entries.len();
        self.insert(index, entry)
    }

    /// Replaces the entry at `index` with `entry`, returning the old entry.
    /// The new entry may reuse the old entry's key.  The entry is handed back
    /// if `index` is out of range or the collection won't accept it.
    pub fn set_value(
        &mut self,
        index: usize,
        entry: Entry,
    ) -> Result<Entry, Entry> {
        if index >= self.entries.len() || !self.accepts(&entry, Some(index)) {
            return Err(entry);
        }
        self.keys.remove(&self.entries[index].key());
        self.keys.insert(entry.key());
        Ok(std::mem::replace(&mut self.entries[index], entry))
    }

    /// Removes and returns the entry at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Entry> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        self.keys.remove(&entry.key());
        Some(entry)
    }

    /// Returns the index of the entry with the same key as `key`, if any.
    pub fn index_of_similar(&self, key: EntryKey) -> Option<usize> {
        if !self.keys.contains(&key) {
            return None;
        }
        self.entries.iter().position(|entry| entry.key() == key)
    }

    /// Returns true if some entry has the key `key`.
    pub fn contains_similar(&self, key: EntryKey) -> bool {
        self.keys.contains(&key)
    }

    /// Removes and returns the entry with the key `key`, if any.
    pub fn remove_similar(&mut self, key: EntryKey) -> Option<Entry> {
        let index = self.index_of_similar(key)?;
        self.remove(index)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys.clear();
    }

    /// Gives mutable access to an entry for caching its quantized pixels.
    /// Callers must not change the entry's key.
    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }
}

impl<'a> IntoIterator for &'a EntryCollection {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> slice::Iter<'a, Entry> {
        self.entries.iter()
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{EntryCollection, MAX_ENTRIES};
    use crate::bitdepth::BitDepth;
    use crate::color::Color;
    use crate::entry::{Entry, EntryKey};
    use crate::raster::Raster;
    use crate::restype::ResourceType;

    fn entry(size: u32, depth: BitDepth) -> Entry {
        Entry::from_image(Raster::new(size, size, Color::WHITE), depth)
            .unwrap()
    }

    #[test]
    fn duplicate_keys_are_handed_back() {
        let mut icons = EntryCollection::new(ResourceType::Icon);
        assert!(icons.push(entry(32, BitDepth::ThirtyTwo)).is_ok());
        let mut duplicate = entry(32, BitDepth::ThirtyTwo);
        duplicate.set_png(true);
        let rejected = icons.push(duplicate).unwrap_err();
        assert!(rejected.is_png());
        assert_eq!(icons.len(), 1);

        let key = EntryKey::new(32, 32, BitDepth::ThirtyTwo);
        assert!(icons.remove_similar(key).is_some());
        assert!(icons.push(rejected).is_ok());
        assert!(icons.get(0).unwrap().is_png());
    }

    #[test]
    fn same_size_different_depth_coexist() {
        let mut icons = EntryCollection::new(ResourceType::Icon);
        assert!(icons.push(entry(16, BitDepth::ThirtyTwo)).is_ok());
        assert!(icons.push(entry(16, BitDepth::Eight)).is_ok());
        assert!(icons.insert(0, entry(16, BitDepth::One)).is_ok());
        assert_eq!(
            icons.keys(),
            vec![
                EntryKey::new(16, 16, BitDepth::One),
                EntryKey::new(16, 16, BitDepth::ThirtyTwo),
                EntryKey::new(16, 16, BitDepth::Eight),
            ]
        );
        assert_eq!(
            icons.index_of_similar(EntryKey::new(16, 16, BitDepth::Eight)),
            Some(2)
        );
        assert!(!icons.contains_similar(EntryKey::new(16, 16, BitDepth::Four)));
    }

    #[test]
    fn set_value_may_keep_the_key() {
        let mut icons = EntryCollection::new(ResourceType::Icon);
        icons.push(entry(16, BitDepth::ThirtyTwo)).unwrap();
        icons.push(entry(32, BitDepth::ThirtyTwo)).unwrap();
        let old = icons.set_value(0, entry(16, BitDepth::ThirtyTwo)).unwrap();
        assert_eq!(old.key(), EntryKey::new(16, 16, BitDepth::ThirtyTwo));
        assert!(icons.set_value(0, entry(32, BitDepth::ThirtyTwo)).is_err());
        let old = icons.set_value(0, entry(48, BitDepth::Four)).unwrap();
        assert_eq!(old.width(), 16);
        assert!(icons.contains_similar(EntryKey::new(48, 48, BitDepth::Four)));
        assert!(
            !icons.contains_similar(EntryKey::new(16, 16, BitDepth::ThirtyTwo))
        );
    }

    #[test]
    fn cursor_hotspot_must_be_inside() {
        let mut cursors = EntryCollection::new(ResourceType::Cursor);
        let mut cursor = entry(16, BitDepth::ThirtyTwo);
        cursor.set_hotspot(16, 16);
        assert!(cursors.push(cursor).is_ok());
        assert_eq!(cursors.get(0).unwrap().hotspot(), (16, 16));
    }

    #[test]
    fn remove_and_clear() {
        let mut icons = EntryCollection::new(ResourceType::Icon);
        icons.push(entry(16, BitDepth::ThirtyTwo)).unwrap();
        icons.push(entry(32, BitDepth::ThirtyTwo)).unwrap();
        assert!(icons.remove(5).is_none());
        let removed = icons.remove(0).unwrap();
        assert_eq!(removed.width(), 16);
        assert!(!icons.contains_similar(removed.key()));
        assert!(icons.push(removed).is_ok());
        icons.clear();
        assert!(icons.is_empty());
        assert!(icons.push(entry(16, BitDepth::ThirtyTwo)).is_ok());
    }

    #[test]
    fn out_of_range_index_hands_entry_back() {
        let mut icons = EntryCollection::new(ResourceType::Icon);
        let rejected = icons.insert(1, entry(16, BitDepth::Eight)).unwrap_err();
        assert_eq!(rejected.key(), EntryKey::new(16, 16, BitDepth::Eight));
        assert!(icons.is_empty());
        assert!(icons.set_value(0, rejected).is_err());
        icons.push(entry(16, BitDepth::Eight)).unwrap();
        assert!(icons.insert(1, entry(32, BitDepth::Eight)).is_ok());
        assert_eq!(icons.len(), 2);
    }

    #[test]
    fn collection_holds_at_most_max_entries() {
        let raster = Raster::new(1, 1, Color::WHITE);
        let mut icons = EntryCollection::new(ResourceType::Icon);
        'fill: for width in 1..=768 {
            for height in 1..=768 {
                if icons.len() == MAX_ENTRIES {
                    break 'fill;
                }
                let entry = Entry::new(raster.clone(), width, height,
                                       BitDepth::ThirtyTwo)
                    .unwrap();
                assert!(icons.push(entry).is_ok());
            }
        }
        assert_eq!(icons.len(), MAX_ENTRIES);
        let extra = Entry::new(raster, 16, 16, BitDepth::Four).unwrap();
        let rejected = icons.push(extra).unwrap_err();
        assert_eq!(rejected.bit_depth(), BitDepth::Four);
        assert_eq!(icons.len(), MAX_ENTRIES);
    }
}

//===========================================================================//
