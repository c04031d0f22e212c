//! Generation session.
//!
//! One `Session` per shader job. It owns the settings, the injected RNG,
//! the string interner shared by host and donor trees, and the two
//! monotone counters (fresh names, unique ids). The unique-id counter must
//! never be reused within a run: minted ids key the wrapper/fallback-return
//! correlation maps downstream. Parallel jobs each get their own session.

use morph_ast::{Name, StringInterner, UniqueId};

use crate::choice::{RandomSource, StdRandom};
use crate::settings::MorphSettings;

/// Mutable state of one generation run.
pub struct Session {
    settings: MorphSettings,
    interner: StringInterner,
    rng: Box<dyn RandomSource>,
    next_unique: u32,
    next_fresh: u32,
}

impl Session {
    /// Session with the default seeded RNG.
    pub fn new(settings: MorphSettings) -> Self {
        let rng = Box::new(StdRandom::from_seed(settings.seed));
        Session::with_random(settings, rng)
    }

    /// Session with an injected randomness source (tests script this).
    pub fn with_random(settings: MorphSettings, rng: Box<dyn RandomSource>) -> Self {
        Session::with_parts(settings, rng, StringInterner::new())
    }

    /// Session adopting an existing interner — the one the host and donor
    /// modules were built with. Names are only meaningful against their
    /// own interner, so the front end hands it over here.
    pub fn with_parts(
        settings: MorphSettings,
        rng: Box<dyn RandomSource>,
        interner: StringInterner,
    ) -> Self {
        Session {
            settings,
            interner,
            rng,
            next_unique: 0,
            next_fresh: 0,
        }
    }

    pub fn settings(&self) -> &MorphSettings {
        &self.settings
    }

    pub fn rng(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut StringInterner {
        &mut self.interner
    }

    /// Intern a string in the session interner.
    pub fn intern(&mut self, text: &str) -> Name {
        self.interner.intern(text)
    }

    /// Mint a session-unique id. Monotone, never reused.
    pub fn mint_id(&mut self) -> UniqueId {
        let id = UniqueId::new(self.next_unique);
        self.next_unique += 1;
        id
    }

    /// Mint a fresh identifier that cannot collide with source names.
    pub fn fresh_name(&mut self, hint: &str) -> Name {
        let text = format!("_wgsm_{hint}_{}", self.next_fresh);
        self.next_fresh += 1;
        self.interner.intern(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_are_monotone() {
        let mut session = Session::new(MorphSettings::with_seed(1));
        let a = session.mint_id();
        let b = session.mint_id();
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fresh_names_are_distinct() {
        let mut session = Session::new(MorphSettings::with_seed(1));
        let a = session.fresh_name("ctr");
        let b = session.fresh_name("ctr");
        assert_ne!(a, b);
        assert_eq!(session.interner().lookup(a), "_wgsm_ctr_0");
        assert_eq!(session.interner().lookup(b), "_wgsm_ctr_1");
    }
}
