use crate::DbcObjectId;
use fnv::FnvBuildHasher;
use serde::{Serialize, Serializer};
use std::{collections::HashMap, ops::Index};

/// A list of dbc items identified by a numeric id
///
/// An ItemList is an ordered collection of items, which additionally allows for
/// fast access to items by their id. Each id occurs at most once: pushing an item
/// whose id is already present replaces the old item, and the new item is placed at
/// the end of the list.
#[derive(Debug, Clone)]
pub struct ItemList<T: DbcObjectId> {
    // storage for items
    items: Vec<T>,
    // mapping from item id to index in the items vector
    map: HashMap<u64, usize, FnvBuildHasher>,
}

impl<T: DbcObjectId> ItemList<T> {
    /// create a new ItemList
    pub fn new() -> Self {
        Self {
            items: vec![],
            map: HashMap::default(),
        }
    }

    /// create a new ItemList with a specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            map: HashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
        }
    }

    /// push an item into the ItemList
    ///
    /// If an item with the same id already exists, it is removed and returned.
    pub fn push(&mut self, value: T) -> Option<T> {
        let replaced = self.remove(value.get_id());
        self.map.insert(value.get_id(), self.items.len());
        self.items.push(value);
        replaced
    }

    /// remove an item by id and return it. The order of the remaining items is preserved.
    pub fn remove(&mut self, id: u64) -> Option<T> {
        let index = self.map.remove(&id)?;
        let item = self.items.remove(index);
        // all following items moved down by one
        for following in &self.items[index..] {
            if let Some(idx) = self.map.get_mut(&following.get_id()) {
                *idx -= 1;
            }
        }
        Some(item)
    }

    /// get an item by id
    pub fn get(&self, id: u64) -> Option<&T> {
        let index = self.map.get(&id)?;
        Some(&self.items[*index])
    }

    /// get a mutable reference to an item by id
    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        let index = self.map.get(&id)?;
        Some(&mut self.items[*index])
    }

    /// get the first item in the ItemList
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// get the last item in the ItemList
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// get the index of an item by id
    pub fn index(&self, id: u64) -> Option<usize> {
        self.map.get(&id).copied()
    }

    /// Checks if the ItemList contains an item with the given id
    pub fn contains_key(&self, id: u64) -> bool {
        self.map.contains_key(&id)
    }

    /// Returns an iterator over references to the items in the ItemList
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Returns an iterator over mutable references to the items in the ItemList
    ///
    /// The id of an item must not be changed through this iterator.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Returns the number of items in the ItemList
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the ItemList is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ItemList<T>
where
    T: DbcObjectId,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DbcObjectId> Index<usize> for ItemList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<T> FromIterator<T> for ItemList<T>
where
    T: DbcObjectId,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let into_iter = iter.into_iter();
        let (low, _high) = into_iter.size_hint();
        let mut item_list = ItemList::with_capacity(low);
        for item in into_iter {
            item_list.push(item);
        }
        item_list
    }
}

impl<T> IntoIterator for ItemList<T>
where
    T: DbcObjectId,
{
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ItemList<T>
where
    T: DbcObjectId,
{
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut ItemList<T>
where
    T: DbcObjectId,
{
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}

impl<T> PartialEq for ItemList<T>
where
    T: DbcObjectId + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
        // no need to compare the maps, as they are derived from the items
    }
}

// an ItemList is exported as a plain sequence in list order
impl<T> Serialize for ItemList<T>
where
    T: DbcObjectId + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

#[macro_export]
macro_rules! itemlist {
    () => (
        $crate::ItemList::new()
    );
    ($($x:expr),+ $(,)?) => (
        {
            const CAP: usize = <[()]>::len(&[$({ stringify!($x); }),*]);
            let mut itemlist = $crate::ItemList::with_capacity(CAP);
            $(
                itemlist.push($x);
            )*
            itemlist
        }
    );
}
