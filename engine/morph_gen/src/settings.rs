//! Generation settings.
//!
//! Every per-construct weight and injection probability the engine consults
//! lives here, externally adjustable. Defaults follow the shipped tuning:
//! uniform-derived known values are heavily preferred (weight 6 vs 1) and
//! every injection probability starts at 50%.

/// Weights for the numeric known-value rules.
#[derive(Clone, Debug)]
pub struct KnownValueWeights {
    pub literal: u32,
    pub sum: u32,
    pub difference: u32,
    pub product: u32,
    /// Derivation from a uniform-buffer scalar.
    pub from_uniform: u32,
}

impl Default for KnownValueWeights {
    fn default() -> Self {
        KnownValueWeights {
            literal: 1,
            sum: 1,
            difference: 1,
            product: 1,
            from_uniform: 6,
        }
    }
}

/// Weights for the boolean known-value rules.
#[derive(Clone, Debug)]
pub struct KnownBoolWeights {
    pub literal: u32,
    /// `true || arbitrary` (and the swapped order, each at this weight).
    pub or_arbitrary: u32,
    /// `!<known opposite>`
    pub negated_opposite: u32,
    /// Opaque comparison against a uniform-derived scalar.
    pub uniform_comparison: u32,
}

impl Default for KnownBoolWeights {
    fn default() -> Self {
        KnownBoolWeights {
            literal: 1,
            or_arbitrary: 1,
            negated_opposite: 1,
            uniform_comparison: 6,
        }
    }
}

/// Weights for the control-flow wrapper shapes.
#[derive(Clone, Debug)]
pub struct WrapperWeights {
    pub if_true: u32,
    pub if_false: u32,
    pub single_trip_for: u32,
    pub loop_continuing: u32,
    pub while_true: u32,
    pub switch: u32,
}

impl Default for WrapperWeights {
    fn default() -> Self {
        WrapperWeights {
            if_true: 2,
            if_false: 2,
            single_trip_for: 1,
            loop_continuing: 1,
            while_true: 1,
            switch: 1,
        }
    }
}

/// Weights for the dead-jump concealment shapes.
#[derive(Clone, Debug)]
pub struct DeadJumpShapeWeights {
    pub if_false: u32,
    pub if_true_else: u32,
    pub while_false: u32,
    pub for_false: u32,
    pub loop_break: u32,
}

impl Default for DeadJumpShapeWeights {
    fn default() -> Self {
        DeadJumpShapeWeights {
            if_false: 2,
            if_true_else: 1,
            while_false: 1,
            for_false: 1,
            loop_break: 1,
        }
    }
}

/// Weights for arbitrary-expression construction.
#[derive(Clone, Debug)]
pub struct ArbitraryWeights {
    pub literal: u32,
    pub variable: u32,
    pub unary: u32,
    pub binary: u32,
    pub builtin: u32,
}

impl Default for ArbitraryWeights {
    fn default() -> Self {
        ArbitraryWeights {
            literal: 2,
            variable: 3,
            unary: 1,
            binary: 2,
            builtin: 1,
        }
    }
}

/// Weights for arbitrary-statement construction.
#[derive(Clone, Debug)]
pub struct ArbitraryStatementWeights {
    pub fresh_variable: u32,
    pub empty_compound: u32,
    /// Donor splicing; ignored when no donor is loaded.
    pub donor_fragment: u32,
    /// Side-effect-free compound generation: a flagged unimplemented gap
    /// that fails loudly when selected. Kept selectable, default 0.
    pub side_effect_free: u32,
}

impl Default for ArbitraryStatementWeights {
    fn default() -> Self {
        ArbitraryStatementWeights {
            fresh_variable: 3,
            empty_compound: 1,
            donor_fragment: 3,
            side_effect_free: 0,
        }
    }
}

/// All tunables of one generation session.
#[derive(Clone, Debug)]
pub struct MorphSettings {
    pub seed: u64,
    /// Hard recursion cap for every depth-bounded generator.
    pub max_depth: u32,

    // Injection probabilities, each defaulting to 50%.
    pub inject_dead_break: f64,
    pub inject_dead_continue: f64,
    pub inject_dead_discard: f64,
    pub inject_dead_return: f64,
    pub apply_identity_operation: f64,
    pub control_flow_wrap: f64,

    pub known_value: KnownValueWeights,
    pub known_bool: KnownBoolWeights,
    pub wrapper: WrapperWeights,
    pub dead_jump_shape: DeadJumpShapeWeights,
    pub arbitrary: ArbitraryWeights,
    pub arbitrary_statement: ArbitraryStatementWeights,
}

impl Default for MorphSettings {
    fn default() -> Self {
        MorphSettings {
            seed: 0,
            max_depth: 5,
            inject_dead_break: 0.5,
            inject_dead_continue: 0.5,
            inject_dead_discard: 0.5,
            inject_dead_return: 0.5,
            apply_identity_operation: 0.5,
            control_flow_wrap: 0.5,
            known_value: KnownValueWeights::default(),
            known_bool: KnownBoolWeights::default(),
            wrapper: WrapperWeights::default(),
            dead_jump_shape: DeadJumpShapeWeights::default(),
            arbitrary: ArbitraryWeights::default(),
            arbitrary_statement: ArbitraryStatementWeights::default(),
        }
    }
}

impl MorphSettings {
    /// Settings with a seed and everything else at defaults.
    pub fn with_seed(seed: u64) -> Self {
        MorphSettings {
            seed,
            ..MorphSettings::default()
        }
    }

    /// Settings with every injection probability at zero; a pipeline run
    /// with these is the identity transformation.
    pub fn quiescent(seed: u64) -> Self {
        MorphSettings {
            seed,
            inject_dead_break: 0.0,
            inject_dead_continue: 0.0,
            inject_dead_discard: 0.0,
            inject_dead_return: 0.0,
            apply_identity_operation: 0.0,
            control_flow_wrap: 0.0,
            ..MorphSettings::default()
        }
    }
}
