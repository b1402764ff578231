//! Reference tables, scoped to one top-level write or read.
//!
//! On write, each tracked object gets an index the first time it's seen; later sightings are
//! written as a backreference to that index. The table keeps a handle to every tracked object, so
//! an address can't be freed and reused by a different object while the call is running.
//!
//! On read, indices arrive explicitly with each new object, so the table is an index-addressed
//! list. Indices may leave holes when a drift-tolerant strategy skips a field's bytes without
//! decoding them; a backreference into a hole is a [`DanglingReference`][Error::DanglingReference].

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::value::ObjectRef;

#[derive(Default)]
pub struct WriteRefs {
    seen: HashMap<usize, usize>,
    objects: Vec<ObjectRef>,
}

impl WriteRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object's identity. Returns `(true, index)` with a freshly assigned index the
    /// first time, and `(false, index)` with the original index afterwards.
    pub fn track(&mut self, obj: &ObjectRef) -> (bool, usize) {
        let next = self.objects.len();
        let index = *self.seen.entry(obj.identity()).or_insert(next);
        if index == next {
            self.objects.push(obj.clone());
            (true, index)
        } else {
            (false, index)
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.objects.clear();
    }
}

#[derive(Default)]
pub struct ReadRefs {
    objects: Vec<Option<ObjectRef>>,
}

impl ReadRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a decoded object at the index it was written with. `max_gap` bounds how far past
    /// the current end an index may land, so corrupt indices can't force huge allocations.
    pub fn place(&mut self, index: usize, obj: ObjectRef, max_gap: usize) -> Result<()> {
        if index >= self.objects.len() {
            if index - self.objects.len() > max_gap {
                return Err(Error::MalformedEncoding(format!(
                    "Reference index {} is far past the {} objects decoded so far",
                    index,
                    self.objects.len()
                )));
            }
            self.objects.resize(index + 1, None);
        }
        match self.objects[index] {
            Some(ref existing) if !ObjectRef::ptr_eq(existing, &obj) => {
                Err(Error::MalformedEncoding(format!(
                    "Reference index {} was assigned twice",
                    index
                )))
            }
            _ => {
                self.objects[index] = Some(obj);
                Ok(())
            }
        }
    }

    pub fn get(&self, index: usize) -> Result<ObjectRef> {
        self.objects
            .get(index)
            .and_then(|o| o.clone())
            .ok_or(Error::DanglingReference { index })
    }

    /// Null out the object fields of every decoded object `unlink` picks, so cycles among them
    /// don't outlive the call.
    pub fn unlink_where(&self, mut unlink: impl FnMut(&ObjectRef) -> bool) -> usize {
        let mut count = 0;
        for obj in self.objects.iter().flatten() {
            if unlink(obj) {
                obj.unlink();
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
