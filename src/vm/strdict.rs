//! 문자열 키 해시 테이블
//!
//! 체이닝 방식의 open hashing 테이블입니다. 용량은 항상 2의 거듭제곱이고,
//! 원소 수가 임계값(용량 × 0.75)에 도달하면 두 배로 늘립니다.
//!
//! 각 엔트리는 삽입 시 계산한 해시를 저장하므로, 리사이즈 중에
//! 체인을 다시 연결할 때 키를 재해싱하지 않습니다.

use std::rc::Rc;

const INIT_TABLE_SIZE: usize = 32;
const LOAD_FACTOR: f32 = 0.75;

/// 문자열 해시 (31 곱셈 누적)
pub fn str_hash(s: &str) -> u32 {
    s.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32))
}

/// 하위 비트에 상위 비트를 섞어 2의 거듭제곱 마스킹에서의 충돌을 줄임
fn secondary_hash(mut h: u32) -> u32 {
    h ^= (h >> 20) ^ (h >> 12);
    h ^ (h >> 7) ^ (h >> 4)
}

fn hash_key(key: &str) -> u32 {
    secondary_hash(str_hash(key))
}

#[derive(Debug, Clone)]
struct Entry<V> {
    key: Rc<str>,
    hash: u32,
    value: V,
    next: Option<Box<Entry<V>>>,
}

#[derive(Debug, Clone)]
pub struct StrDict<V> {
    table: Vec<Option<Box<Entry<V>>>>,
    count: usize,
    threshold: usize,
}

impl<V> Default for StrDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StrDict<V> {
    pub fn new() -> Self {
        Self {
            table: empty_table(INIT_TABLE_SIZE),
            count: 0,
            threshold: threshold_for(INIT_TABLE_SIZE),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    fn index_of(&self, hash: u32) -> usize {
        (hash as usize) & (self.table.len() - 1)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        let hash = hash_key(key);
        let mut cur = self.table[self.index_of(hash)].as_deref();
        while let Some(entry) = cur {
            if entry.hash == hash && &*entry.key == key {
                return Some(&entry.value);
            }
            cur = entry.next.as_deref();
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 키가 이미 있으면 값을 교체하고 이전 값을 돌려줍니다.
    pub fn put(&mut self, key: impl Into<Rc<str>>, value: V) -> Option<V> {
        let key = key.into();
        let hash = hash_key(&key);
        let index = self.index_of(hash);

        let mut cur = self.table[index].as_deref_mut();
        while let Some(entry) = cur {
            if entry.hash == hash && entry.key == key {
                return Some(std::mem::replace(&mut entry.value, value));
            }
            cur = entry.next.as_deref_mut();
        }

        let next = self.table[index].take();
        self.table[index] = Some(Box::new(Entry {
            key,
            hash,
            value,
            next,
        }));

        let before = self.count;
        self.count += 1;
        if before >= self.threshold {
            let new_capacity = 2 * self.table.len();
            self.resize(new_capacity);
            self.threshold = threshold_for(new_capacity);
        }
        None
    }

    fn resize(&mut self, new_capacity: usize) {
        let old = std::mem::replace(&mut self.table, empty_table(new_capacity));
        for mut chain in old {
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let index = (entry.hash as usize) & (new_capacity - 1);
                entry.next = self.table[index].take();
                self.table[index] = Some(entry);
            }
        }
    }

    /// 모든 (키, 값) 쌍 순회. 순서는 버킷 순서이며 보장되지 않습니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.table.iter().flat_map(|bucket| {
            let mut cur = bucket.as_deref();
            std::iter::from_fn(move || {
                let entry = cur?;
                cur = entry.next.as_deref();
                Some((&*entry.key, &entry.value))
            })
        })
    }

    pub fn apply_to_all(&mut self, mut f: impl FnMut(&mut V)) {
        for bucket in self.table.iter_mut() {
            let mut cur = bucket.as_deref_mut();
            while let Some(entry) = cur {
                f(&mut entry.value);
                cur = entry.next.as_deref_mut();
            }
        }
    }
}

fn empty_table<V>(capacity: usize) -> Vec<Option<Box<Entry<V>>>> {
    (0..capacity).map(|_| None).collect()
}

fn threshold_for(capacity: usize) -> usize {
    (capacity as f32 * LOAD_FACTOR) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let mut d = StrDict::new();
        assert!(d.put("x", 1).is_none());
        assert!(d.put("y", 2).is_none());
        assert_eq!(d.get("x"), Some(&1));
        assert_eq!(d.get("y"), Some(&2));
        assert_eq!(d.get("z"), None);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn test_put_replaces_existing() {
        let mut d = StrDict::new();
        d.put("k", 1);
        assert_eq!(d.put("k", 5), Some(1));
        assert_eq!(d.get("k"), Some(&5));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_resize_doubles_capacity_and_keeps_entries() {
        let mut d = StrDict::new();
        assert_eq!(d.capacity(), 32);
        // 임계값 24: 25번째 삽입 직후 리사이즈
        for i in 0..25 {
            d.put(format!("key{}", i), i);
        }
        assert_eq!(d.capacity(), 64);
        for i in 0..25 {
            assert_eq!(d.get(&format!("key{}", i)), Some(&i));
        }

        for i in 25..200 {
            d.put(format!("key{}", i), i);
        }
        assert!(d.capacity().is_power_of_two());
        assert_eq!(d.len(), 200);
        assert_eq!(d.iter().count(), 200);
        assert_eq!(d.get("key137"), Some(&137));
    }

    #[test]
    fn test_apply_to_all() {
        let mut d = StrDict::new();
        d.put("a", 1);
        d.put("b", 2);
        d.apply_to_all(|v| *v *= 10);
        let mut values: Vec<i32> = d.iter().map(|(_, v)| *v).collect();
        values.sort();
        assert_eq!(values, vec![10, 20]);
    }

    #[test]
    fn test_str_hash_is_stable() {
        assert_eq!(str_hash(""), 0);
        assert_eq!(str_hash("a"), 97);
        assert_eq!(str_hash("ab"), 97 * 31 + 98);
    }
}
