// kernel/src/memory/variable_store.rs
//
// Fixed-slot variable memory behind `set`/`print`/`echo`. First-fit
// allocation; cuando no queda slot libre el binding nuevo se descarta.

pub struct VariableStore {
    slots: Vec<Option<(String, String)>>,
}

impl VariableStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Overwrite an existing binding or claim the first free slot.
    pub fn set(&mut self, var: &str, value: &str) {
        for slot in self.slots.iter_mut() {
            if let Some((name, stored)) = slot {
                if name == var {
                    *stored = value.to_string();
                    return;
                }
            }
        }
        for slot in self.slots.iter_mut() {
            if slot.is_none() {
                *slot = Some((var.to_string(), value.to_string()));
                return;
            }
        }
        log::warn!("variable store full, dropping {}", var);
    }

    pub fn get(&self, var: &str) -> Option<String> {
        self.slots
            .iter()
            .flatten()
            .find(|(name, _)| name == var)
            .map(|(_, value)| value.clone())
    }
}
