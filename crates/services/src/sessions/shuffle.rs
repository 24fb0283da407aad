use std::sync::{Mutex, PoisonError};

use rand::SeedableRng;
use rand::rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use quiz_core::model::{AnswerOption, AnswerSet};

/// Reorders one question's options in place.
///
/// Implementations only permute; the options keep their ids and correctness.
pub trait OptionShuffle: Send + Sync {
    fn shuffle(&self, options: &mut [AnswerOption]);
}

/// Uniform shuffle from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngShuffle;

impl OptionShuffle for ThreadRngShuffle {
    fn shuffle(&self, options: &mut [AnswerOption]) {
        let mut rng = rng();
        options.shuffle(&mut rng);
    }
}

/// Deterministic shuffle for tests and reproducible sessions.
#[derive(Debug)]
pub struct SeededShuffle {
    rng: Mutex<StdRng>,
}

impl SeededShuffle {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl OptionShuffle for SeededShuffle {
    fn shuffle(&self, options: &mut [AnswerOption]) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        options.shuffle(&mut *rng);
    }
}

/// Leaves options in stored order.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepOrder;

impl OptionShuffle for KeepOrder {
    fn shuffle(&self, _options: &mut [AnswerOption]) {}
}

/// Shuffle every question's options once.
pub fn shuffle_options(answers: &mut AnswerSet, shuffle: &dyn OptionShuffle) {
    answers.for_each_question_mut(|question| {
        question.reorder_options(|options| shuffle.shuffle(options));
    });
}
