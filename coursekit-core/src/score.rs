// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw problem scores.

use serde::{Deserialize, Serialize};

/// Points earned out of points possible on a single graded block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub earned: f64,
    pub possible: f64,
}

impl Score {
    pub fn new(earned: f64, possible: f64) -> Self {
        Self { earned, possible }
    }

    /// `earned / possible`, with the empty score `0/0` counting as zero.
    pub fn normalized(&self) -> f64 {
        if self.possible == 0.0 {
            0.0
        } else {
            self.earned / self.possible
        }
    }

    /// A problem with zero responses scores `(0, 0)` and counts as not
    /// attempted.
    pub fn is_empty(&self) -> bool {
        self.possible == 0.0
    }
}
