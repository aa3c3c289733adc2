/// Exclusive owner of a backend's execution engine.
///
/// The slot is empty only after a rebuild failed. Every accessor hands out a
/// borrow, so nothing outside the owning adapter can keep a reference to an
/// engine across a reset.
#[derive(Debug)]
pub struct EngineSlot<E> {
    engine: Option<E>,
}

impl<E> EngineSlot<E> {
    pub fn new(engine: E) -> EngineSlot<E> {
        EngineSlot {
            engine: Some(engine),
        }
    }

    pub fn get(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Destroy the current engine, then build a replacement with `make`.
    ///
    /// The old engine is dropped before `make` runs, so the two never coexist.
    /// On error the slot is left empty.
    pub fn rebuild<Err>(&mut self, make: impl FnOnce() -> Result<E, Err>) -> Result<(), Err> {
        drop(self.engine.take());
        self.engine = Some(make()?);
        Ok(())
    }
}
