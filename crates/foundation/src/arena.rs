use crate::handles::Handle;

#[derive(Debug)]
enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

/// Generational arena.
///
/// Ordering contract:
/// - Iteration yields live values in ascending slot index.
/// - Freed slots are reused lowest-index first, with a bumped generation, so
///   handles to removed values never alias their replacement.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        let free = self
            .slots
            .iter()
            .position(|s| matches!(s, Slot::Vacant { .. }));
        match free {
            Some(idx) => {
                let generation = match self.slots[idx] {
                    Slot::Vacant { generation } => generation.wrapping_add(1),
                    Slot::Occupied { generation, .. } => generation,
                };
                self.slots[idx] = Slot::Occupied { generation, value };
                Handle::new(idx as u32, generation)
            }
            None => {
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    value,
                });
                Handle::new((self.slots.len() - 1) as u32, 0)
            }
        }
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.index() as usize)? {
            Slot::Occupied { generation, value } if *generation == handle.generation() => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.slots.get_mut(handle.index() as usize)? {
            Slot::Occupied { generation, value } if *generation == handle.generation() => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Removes and returns the value behind `handle`.
    ///
    /// Returns `None` for stale or unknown handles, so a value is released at
    /// most once.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let idx = handle.index() as usize;
        let live = matches!(
            self.slots.get(idx),
            Some(Slot::Occupied { generation, .. }) if *generation == handle.generation()
        );
        if !live {
            return None;
        }
        let slot = std::mem::replace(
            &mut self.slots[idx],
            Slot::Vacant {
                generation: handle.generation(),
            },
        );
        self.len -= 1;
        match slot {
            Slot::Occupied { value, .. } => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Iterates live values in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| match slot {
                Slot::Occupied { generation, value } => {
                    Some((Handle::new(idx as u32, *generation), value))
                }
                Slot::Vacant { .. } => None,
            })
    }

    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(h, _)| h).collect()
    }

    /// Removes every live value, returning them in ascending slot order.
    pub fn drain(&mut self) -> Vec<(Handle, T)> {
        let slots = std::mem::take(&mut self.slots);
        self.len = 0;
        slots
            .into_iter()
            .enumerate()
            .filter_map(|(idx, slot)| match slot {
                Slot::Occupied { generation, value } => {
                    Some((Handle::new(idx as u32, generation), value))
                }
                Slot::Vacant { .. } => None,
            })
            .collect()
    }
}
