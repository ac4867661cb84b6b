use std::collections::HashMap;
use std::hash::Hash;

struct DictValue<K, V> {
    newer_k: Option<K>,
    v: V,
    older_k: Option<K>,
}

/// A structure that contains
/// - a hash-map and
/// - a virtual linked-list connecting neighboring entries in their insertion order.
///
/// Overwriting an existing key keeps the key's original position.
pub struct OrderedDict<K, V> {
    dict: HashMap<K, DictValue<K, V>>,
    newest_k: Option<K>,
    oldest_k: Option<K>,
}

impl<K, V> Default for OrderedDict<K, V> {
    fn default() -> Self {
        Self {
            dict: HashMap::new(),
            newest_k: None,
            oldest_k: None,
        }
    }
}

impl<K, V> OrderedDict<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn get<'s, 'a>(&'s self, k: &'a K) -> Option<&'s V> {
        self.dict.get(k).map(|dv| &dv.v)
    }

    pub fn get_newest_key(&self) -> Option<&K> {
        self.newest_k.as_ref()
    }

    pub fn get_oldest_key(&self) -> Option<&K> {
        self.oldest_k.as_ref()
    }

    /// Returns the replaced value, if the key was present.
    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        if let Some(dv) = self.dict.get_mut(&k) {
            return Some(std::mem::replace(&mut dv.v, v));
        }

        if let Some(prev_k) = self.newest_k.as_ref() {
            if let Some(prev_dv) = self.dict.get_mut(prev_k) {
                prev_dv.newer_k = Some(k.clone());
            }
        }

        let dv = DictValue {
            newer_k: None,
            v,
            older_k: self.newest_k.take(),
        };
        self.dict.insert(k.clone(), dv);

        if self.oldest_k.is_none() {
            self.oldest_k = Some(k.clone());
        }
        self.newest_k = Some(k);

        None
    }

    /// ```text
    ///            / _k
    /// newer_k -- | newer_v
    ///            \ rm_k  -->  older_k
    ///
    ///            / newer_k  -->  None
    /// rm_k ----- | rm_v
    ///            \ older_k  -->  None
    ///
    ///            / rm_k  -->  newer_k
    /// older_k -- | older_v
    ///            \ _k
    /// ```
    pub fn remove(&mut self, k: &K) -> Option<V> {
        let rm_dv = self.dict.remove(k)?;

        match rm_dv.newer_k.as_ref() {
            Some(newer_k) => {
                if let Some(newer_dv) = self.dict.get_mut(newer_k) {
                    newer_dv.older_k = rm_dv.older_k.clone();
                }
            }
            None => self.newest_k = rm_dv.older_k.clone(),
        }
        match rm_dv.older_k.as_ref() {
            Some(older_k) => {
                if let Some(older_dv) = self.dict.get_mut(older_k) {
                    older_dv.newer_k = rm_dv.newer_k.clone();
                }
            }
            None => self.oldest_k = rm_dv.newer_k.clone(),
        }

        Some(rm_dv.v)
    }

    /// Iterates from the oldest-inserted entry to the newest-inserted entry.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            od: self,
            next_k: self.oldest_k.as_ref(),
        }
    }

    /// Consumes the dict. The order is unspecified.
    pub fn into_values(self) -> impl Iterator<Item = V> {
        self.dict.into_values().map(|dv| dv.v)
    }
}

pub struct Iter<'s, K, V> {
    od: &'s OrderedDict<K, V>,
    next_k: Option<&'s K>,
}

impl<'s, K, V> Iterator for Iter<'s, K, V>
where
    K: Hash + Eq,
{
    type Item = (&'s K, &'s V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next_k?;
        let (k, dv) = self.od.dict.get_key_value(k)?;
        self.next_k = dv.newer_k.as_ref();
        Some((k, &dv.v))
    }
}
