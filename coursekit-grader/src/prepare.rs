// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seed-based preparation of randomized problem variants.
//!
//! Each learner receives a per-(learner, block) seed from the coordinator;
//! everything random about a problem — template variable values, choice
//! order — is derived from that seed alone, so preparing twice with the same
//! seed yields the same variant.

use std::collections::BTreeMap;

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::eval::Context;
use crate::problem::{AnswerId, ProblemDefinition};
use crate::responses::{Choice, Response};

/// A problem with its randomized variant resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedProblem {
    definition: ProblemDefinition,
    seed: u64,
    variables: BTreeMap<String, f64>,
    /// Display order per shuffled multiple-choice response, as indices into
    /// the declared choice list.
    choice_order: BTreeMap<AnswerId, Vec<usize>>,
}

/// Resolve a definition's randomized parts for one seed.
pub fn prepare(definition: &ProblemDefinition, seed: u64) -> PreparedProblem {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut variables = BTreeMap::new();
    for variable in &definition.variables {
        let value = if variable.min == variable.max {
            variable.min
        } else {
            rng.random_range(variable.min..variable.max)
        };
        variables.insert(variable.name.clone(), value);
    }

    let mut choice_order = BTreeMap::new();
    for response in &definition.responses {
        if let Response::MultipleChoice(mc) = &response.response {
            if mc.shuffle {
                let mut order: Vec<usize> = (0..mc.choices.len()).collect();
                order.shuffle(&mut rng);
                choice_order.insert(response.id.clone(), order);
            }
        }
    }

    PreparedProblem {
        definition: definition.clone(),
        seed,
        variables,
        choice_order,
    }
}

impl PreparedProblem {
    pub fn definition(&self) -> &ProblemDefinition {
        &self.definition
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed for formula sampling, fixed per prepared variant.
    pub fn sample_seed(&self) -> u64 {
        // Decorrelated from the preparation stream but still a pure
        // function of the problem seed.
        self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17)
    }

    /// Values of the randomized template variables.
    pub fn variables(&self) -> &BTreeMap<String, f64> {
        &self.variables
    }

    /// The template variables as an evaluation context.
    pub fn variable_context(&self) -> Context {
        let mut context = Context::new();
        for (name, value) in &self.variables {
            context.set(name, *value);
        }
        context
    }

    /// The choices of a multiple-choice response in display order.
    pub fn display_choices<'a>(&'a self, id: &str, choices: &'a [Choice]) -> Vec<&'a Choice> {
        match self.choice_order.get(id) {
            Some(order) => order.iter().filter_map(|&i| choices.get(i)).collect(),
            None => choices.iter().collect(),
        }
    }
}
