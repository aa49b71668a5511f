// Generational arena mapping opaque host tokens to owned documents.
use std::fmt;

use crate::core::document::Document;
use crate::core::error::{Error, ErrorKind};

const INDEX_BITS: u32 = 16;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const MAX_SLOTS: usize = INDEX_MASK as usize;

/// Opaque token handed to the host. Low bits hold slot index + 1, high bits
/// hold the slot serial; `0` is never issued.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle(u32);

impl Handle {
    pub const BAD: Handle = Handle(0);

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn into_raw(self) -> u32 {
        self.0
    }

    fn new(index: usize, serial: u16) -> Self {
        Self(u32::from(serial) << INDEX_BITS | (index as u32 + 1))
    }

    fn index(self) -> Option<usize> {
        (self.0 & INDEX_MASK).checked_sub(1).map(|index| index as usize)
    }

    fn serial(self) -> u16 {
        (self.0 >> INDEX_BITS) as u16
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    serial: u16,
    doc: Option<Document>,
}

#[derive(Debug, Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn insert(&mut self, doc: Document) -> Result<Handle, Error> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < MAX_SLOTS => {
                self.slots.push(Slot { serial: 1, doc: None });
                self.slots.len() - 1
            }
            None => {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message(format!("handle table exhausted ({MAX_SLOTS} live handles)")));
            }
        };
        let slot = &mut self.slots[index];
        slot.doc = Some(doc);
        self.live += 1;
        let handle = Handle::new(index, slot.serial);
        tracing::debug!(%handle, live = self.live, "created handle");
        Ok(handle)
    }

    pub fn get(&self, handle: Handle) -> Result<&Document, Error> {
        let index = self.check(handle)?;
        self.slots[index]
            .doc
            .as_ref()
            .ok_or_else(|| invalid(handle, "freed"))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Document, Error> {
        let index = self.check(handle)?;
        self.slots[index]
            .doc
            .as_mut()
            .ok_or_else(|| invalid(handle, "freed"))
    }

    /// Releases the document behind `handle`; the token is stale afterwards.
    pub fn remove(&mut self, handle: Handle) -> Result<Document, Error> {
        let index = self.check(handle)?;
        let slot = &mut self.slots[index];
        let doc = slot.doc.take().ok_or_else(|| invalid(handle, "freed"))?;
        slot.serial = next_serial(slot.serial);
        self.free.push(index);
        self.live -= 1;
        tracing::debug!(%handle, live = self.live, "destroyed handle");
        Ok(doc)
    }

    /// Releases every live document and returns how many were released.
    /// Slots and serials survive, so tokens issued before the drain stay stale.
    pub fn drain(&mut self) -> usize {
        let released = self.live;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.doc.take().is_some() {
                slot.serial = next_serial(slot.serial);
                self.free.push(index);
            }
        }
        self.live = 0;
        released
    }

    fn check(&self, handle: Handle) -> Result<usize, Error> {
        let index = handle.index().ok_or_else(|| invalid(handle, "bad handle"))?;
        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| invalid(handle, "index out of range"))?;
        if slot.serial != handle.serial() {
            return Err(invalid(handle, "freed"));
        }
        Ok(index)
    }
}

fn next_serial(serial: u16) -> u16 {
    match serial.wrapping_add(1) {
        0 => 1,
        next => next,
    }
}

fn invalid(handle: Handle, reason: &str) -> Error {
    Error::new(ErrorKind::InvalidHandle).with_message(format!("invalid handle {handle} ({reason})"))
}
