//! Running log of foods added through nutrition lookups.
//!
//! Every successful lookup appends its foods. The calorie total is summed from
//! the entries on demand, so removal never drifts from what is listed.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::lookup::FoodItem;

pub const CALORIE_LIMIT: f64 = 2000.0;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FoodEntryId(pub u64);

impl fmt::Display for FoodEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "food-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: FoodEntryId,
    pub food: FoodItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodLog {
    entries: Vec<FoodEntry>,
    next_id: u64,
}

impl FoodLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FoodEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends in order and returns the ids handed out. The same food may be
    /// logged more than once; each entry gets its own id.
    pub fn append(&mut self, foods: impl IntoIterator<Item = FoodItem>) -> Vec<FoodEntryId> {
        let ids: Vec<FoodEntryId> = foods
            .into_iter()
            .map(|food| {
                let id = FoodEntryId(self.next_id);
                self.next_id += 1;
                self.entries.push(FoodEntry { id, food });
                id
            })
            .collect();
        info!(added = ids.len(), total = self.total_calories(), "food log updated");
        ids
    }

    pub fn remove(&mut self, id: FoodEntryId) -> Option<FoodEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        debug!(%id, "food removed");
        Some(entry)
    }

    /// Ids keep counting up across clears so a late remove never hits a new entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn total_calories(&self) -> f64 {
        self.entries.iter().map(|e| e.food.calories).sum()
    }

    /// Strictly over the limit; exactly 2000 is still within it.
    pub fn limit_exceeded(&self) -> bool {
        self.total_calories() > CALORIE_LIMIT
    }

    /// Share of the daily limit consumed, capped at 100.
    pub fn progress_percent(&self) -> f64 {
        (self.total_calories() / CALORIE_LIMIT * 100.0).clamp(0.0, 100.0)
    }
}
