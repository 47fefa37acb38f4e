/// Last form value known to be durably persisted.
///
/// The value is only ever replaced wholesale after a confirmed save, never
/// mutated in place. Dirty-state is structural equality against it, so every
/// form type defines `PartialEq` field by field.
#[derive(Debug, Clone)]
pub struct SaveSnapshot<F> {
    saved: F,
}

impl<F: PartialEq + Clone> SaveSnapshot<F> {
    /// Taken at editor mount from the server-fetched record.
    pub fn new(saved: F) -> Self {
        Self { saved }
    }

    pub fn is_dirty(&self, live: &F) -> bool {
        self.saved != *live
    }

    pub fn replace(&mut self, saved: F) {
        self.saved = saved;
    }

    pub fn saved(&self) -> &F {
        &self.saved
    }
}
