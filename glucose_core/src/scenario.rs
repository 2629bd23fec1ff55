//! Randomized meal scenarios.
//!
//! Picks distinct foods for a meal category by shuffling the matching
//! catalog entries. The generator owns its random source so tests can use
//! a seeded one.

use crate::catalog::{get_default_catalog, Catalog, Food, MealCategory};
use crate::curves::CurveShape;
use crate::{DoseEvent, Error, Result};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Foods offered per meal when the caller does not say
pub const DEFAULT_MEAL_COUNT: usize = 3;

/// Random food picker over a catalog
pub struct ScenarioGenerator<'a, R: Rng> {
    catalog: &'a Catalog,
    rng: R,
}

impl ScenarioGenerator<'static, ThreadRng> {
    /// Generator backed by the thread-local random source
    pub fn from_entropy() -> Self {
        Self::new(get_default_catalog(), rand::thread_rng())
    }
}

impl ScenarioGenerator<'static, ChaCha8Rng> {
    /// Deterministic generator over the default catalog
    pub fn seeded(seed: u64) -> Self {
        Self::new(get_default_catalog(), ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<'a, R: Rng> ScenarioGenerator<'a, R> {
    pub fn new(catalog: &'a Catalog, rng: R) -> Self {
        Self { catalog, rng }
    }

    /// Up to `count` distinct foods tagged for `category`
    ///
    /// Asking for more than the catalog holds returns every matching food
    /// in shuffled order.
    pub fn random_foods(&mut self, category: MealCategory, count: usize) -> Vec<&'a Food> {
        let catalog: &'a Catalog = self.catalog;
        let mut candidates = catalog.foods_for(category);
        candidates.shuffle(&mut self.rng);
        candidates.truncate(count);

        tracing::debug!(
            "Picked {} {} foods: {:?}",
            candidates.len(),
            category,
            candidates.iter().map(|f| f.id).collect::<Vec<_>>()
        );
        candidates
    }

    pub fn breakfast(&mut self) -> Vec<&'a Food> {
        self.random_foods(MealCategory::Breakfast, DEFAULT_MEAL_COUNT)
    }

    pub fn lunch(&mut self) -> Vec<&'a Food> {
        self.random_foods(MealCategory::Lunch, DEFAULT_MEAL_COUNT)
    }

    pub fn dinner(&mut self) -> Vec<&'a Food> {
        self.random_foods(MealCategory::Dinner, DEFAULT_MEAL_COUNT)
    }

    /// Dose events for eating `count` random foods at `start_time`
    pub fn meal_events(
        &mut self,
        category: MealCategory,
        count: usize,
        start_time: f64,
        shape: CurveShape,
    ) -> Result<Vec<DoseEvent>> {
        let mut events = Vec::new();
        for food in self.random_foods(category, count) {
            events.extend(food.events(start_time, shape)?);
        }
        Ok(events)
    }

    /// Integer in `[min, max]`, rounded from a uniform draw
    pub fn random_int(&mut self, min: i64, max: i64) -> Result<i64> {
        if min > max {
            return Err(Error::InvalidInput(format!(
                "random range is empty: min {} > max {}",
                min, max
            )));
        }
        let (lo, hi) = (min as f64, max as f64);
        let n = (lo + self.rng.gen::<f64>() * (hi - lo)).round() as i64;
        Ok(n.clamp(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DoseKind;
    use std::collections::HashSet;

    #[test]
    fn test_picks_requested_count_without_duplicates() {
        let mut gen = ScenarioGenerator::seeded(7);
        let foods = gen.random_foods(MealCategory::Breakfast, 3);
        assert_eq!(foods.len(), 3);

        let ids: HashSet<_> = foods.iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(foods.iter().all(|f| f.is_for(MealCategory::Breakfast)));
    }

    #[test]
    fn test_oversized_request_returns_whole_category() {
        let mut gen = ScenarioGenerator::seeded(1);
        let foods = gen.random_foods(MealCategory::Lunch, 50);

        let expected: HashSet<_> = get_default_catalog()
            .foods_for(MealCategory::Lunch)
            .iter()
            .map(|f| f.id)
            .collect();
        let got: HashSet<_> = foods.iter().map(|f| f.id).collect();
        assert_eq!(foods.len(), expected.len());
        assert_eq!(got, expected);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let mut gen = ScenarioGenerator::seeded(1);
        assert!(gen.random_foods(MealCategory::Dinner, 0).is_empty());
    }

    #[test]
    fn test_same_seed_same_picks() {
        let pick = |seed| {
            ScenarioGenerator::seeded(seed)
                .random_foods(MealCategory::Dinner, 3)
                .iter()
                .map(|f| f.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(42), pick(42));
    }

    #[test]
    fn test_empty_category_in_custom_catalog() {
        let catalog = Catalog { foods: vec![] };
        let mut gen = ScenarioGenerator::new(&catalog, ChaCha8Rng::seed_from_u64(3));
        assert!(gen.random_foods(MealCategory::Snack, 2).is_empty());
    }

    #[test]
    fn test_meal_events() {
        let mut gen = ScenarioGenerator::seeded(11);
        let events = gen
            .meal_events(MealCategory::Dinner, 2, 30.0, CurveShape::Sawtooth)
            .unwrap();
        let carb_events = events.iter().filter(|e| e.kind() == DoseKind::Carb).count();
        assert_eq!(carb_events, 2);
        assert!(events.iter().all(|e| e.start_time() == 30.0));
    }

    #[test]
    fn test_default_counts() {
        let mut gen = ScenarioGenerator::from_entropy();
        assert_eq!(gen.breakfast().len(), DEFAULT_MEAL_COUNT);
        assert_eq!(gen.lunch().len(), DEFAULT_MEAL_COUNT);
        assert_eq!(gen.dinner().len(), DEFAULT_MEAL_COUNT);
    }

    #[test]
    fn test_random_int_bounds() {
        let mut gen = ScenarioGenerator::seeded(5);
        for _ in 0..200 {
            let n = gen.random_int(3, 9).unwrap();
            assert!((3..=9).contains(&n));
        }
        assert_eq!(gen.random_int(4, 4).unwrap(), 4);
    }

    #[test]
    fn test_random_int_rejects_inverted_range() {
        let mut gen = ScenarioGenerator::seeded(5);
        assert!(matches!(gen.random_int(9, 3), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_random_int_extreme_range() {
        let mut gen = ScenarioGenerator::seeded(9);
        for _ in 0..100 {
            let n = gen.random_int(i64::MIN, i64::MAX).unwrap();
            assert!((i64::MIN..=i64::MAX).contains(&n));
        }
        let n = gen.random_int(-5, 5).unwrap();
        assert!((-5..=5).contains(&n));
    }
}
