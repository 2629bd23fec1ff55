//! Built-in food catalog.
//!
//! Each food carries its nutrition label and the digestion phases used to
//! turn it into carbohydrate and protein dose events.

use crate::curves::{AbsorptionSegment, CarbSpeed, CurveShape};
use crate::nutrition::{calorie_distribution, CalorieDistribution, Nutrition};
use crate::{DoseEvent, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Types
// ============================================================================

/// Meal a food is suitable for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

impl MealCategory {
    pub const ALL: [MealCategory; 5] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
        MealCategory::Snack,
        MealCategory::Dessert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealCategory::Breakfast => "breakfast",
            MealCategory::Lunch => "lunch",
            MealCategory::Dinner => "dinner",
            MealCategory::Snack => "snack",
            MealCategory::Dessert => "dessert",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MealCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("unknown meal category: {}", s))
    }
}

/// One digestion phase of a food (grams of carbohydrate, minutes)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodAbsorption {
    pub carbs: f64,
    pub delay: f64,
    pub duration: f64,
}

impl FoodAbsorption {
    fn new(carbs: f64, speed: CarbSpeed) -> Self {
        Self {
            carbs,
            delay: 0.0,
            duration: speed.duration(),
        }
    }

    fn delayed(carbs: f64, after: CarbSpeed, speed: CarbSpeed) -> Self {
        Self {
            carbs,
            delay: after.duration(),
            duration: speed.duration(),
        }
    }
}

/// A catalog food
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Food {
    pub id: u32,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub nutrition: Nutrition,
    pub meals: Vec<MealCategory>,
    pub absorption: Vec<FoodAbsorption>,
}

impl Food {
    pub fn is_for(&self, category: MealCategory) -> bool {
        self.meals.contains(&category)
    }

    /// Carbohydrate released through the absorption phases
    ///
    /// This drives the simulation; the label carbs are informational and
    /// can differ.
    pub fn absorbed_carbs(&self) -> f64 {
        self.absorption.iter().map(|a| a.carbs).sum()
    }

    pub fn calories(&self) -> CalorieDistribution {
        calorie_distribution(&self.nutrition)
    }

    pub fn carb_segments(&self, shape: CurveShape) -> Result<Vec<AbsorptionSegment>> {
        self.absorption
            .iter()
            .map(|a| AbsorptionSegment::new(a.carbs, a.delay, a.duration, shape))
            .collect()
    }

    /// Carbohydrate event for eating this food at `start_time`
    pub fn carb_event(&self, start_time: f64, shape: CurveShape) -> Result<DoseEvent> {
        DoseEvent::carbs(start_time, self.carb_segments(shape)?)
    }

    /// Protein event for eating this food at `start_time`, if it has protein
    pub fn protein_event(&self, start_time: f64, shape: CurveShape) -> Result<Option<DoseEvent>> {
        if self.nutrition.protein <= 0.0 {
            return Ok(None);
        }
        DoseEvent::protein(self.nutrition.protein, start_time, shape).map(Some)
    }

    /// All dose events produced by eating this food
    pub fn events(&self, start_time: f64, shape: CurveShape) -> Result<Vec<DoseEvent>> {
        let mut events = vec![self.carb_event(start_time, shape)?];
        events.extend(self.protein_event(start_time, shape)?);
        Ok(events)
    }
}

/// The complete food catalog
#[derive(Clone, Debug)]
pub struct Catalog {
    pub foods: Vec<Food>,
}

impl Catalog {
    /// Foods tagged for `category`, in catalog order
    pub fn foods_for(&self, category: MealCategory) -> Vec<&Food> {
        self.foods.iter().filter(|f| f.is_for(category)).collect()
    }

    pub fn get(&self, id: u32) -> Option<&Food> {
        self.foods.iter().find(|f| f.id == id)
    }

    /// Collect every structural problem with the catalog
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for food in &self.foods {
            if !seen.insert(food.id) {
                errors.push(format!("Duplicate food id {}", food.id));
            }
            if food.meals.is_empty() {
                errors.push(format!("Food {} ({}) has no meal tags", food.id, food.name));
            }
            if food.absorption.is_empty() {
                errors.push(format!(
                    "Food {} ({}) has no absorption phases",
                    food.id, food.name
                ));
            }
            for a in &food.absorption {
                if a.carbs <= 0.0 || a.duration <= 0.0 || a.delay < 0.0 {
                    errors.push(format!(
                        "Food {} ({}) has invalid absorption phase {:?}",
                        food.id, food.name, a
                    ));
                }
            }
        }

        errors
    }
}

// ============================================================================
// Default catalog
// ============================================================================

/// Cached default catalog - built once and shared
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn nutrition(calories: f64, fat: f64, carbs: f64, sugars: f64, protein: f64) -> Nutrition {
    Nutrition {
        calories,
        fat,
        carbs,
        sugars,
        protein,
        ..Nutrition::default()
    }
}

/// Builds the default catalog
///
/// Prefer [`get_default_catalog`]; this is kept for tests and custom catalogs.
pub fn build_default_catalog() -> Catalog {
    use CarbSpeed::*;
    use MealCategory::*;

    let foods = vec![
        // ====================================================================
        // Breakfast
        // ====================================================================
        Food {
            id: 100,
            name: "Cereal, Milk, and Strawberries".into(),
            emoji: "🥣".into(),
            color: "#ffc6c5".into(),
            nutrition: nutrition(253.0, 3.0, 50.0, 24.0, 10.0),
            meals: vec![Breakfast],
            absorption: vec![FoodAbsorption::new(20.0, VeryFast), FoodAbsorption::new(40.0, Fast)],
        },
        Food {
            id: 101,
            name: "Spinach and Cheese Omelette, Side of Potatoes".into(),
            emoji: "🥬".into(),
            color: "#c3e49a".into(),
            nutrition: nutrition(281.0, 14.0, 20.0, 0.0, 15.0),
            meals: vec![Breakfast],
            absorption: vec![FoodAbsorption::new(10.0, Fast), FoodAbsorption::new(10.0, Medium)],
        },
        Food {
            id: 102,
            name: "Greek Yogurt, Granola, and Blueberries".into(),
            emoji: "🥣".into(),
            color: "#ade1ff".into(),
            nutrition: nutrition(390.0, 12.0, 55.0, 24.0, 22.0),
            meals: vec![Breakfast],
            absorption: vec![FoodAbsorption::new(25.0, Fast), FoodAbsorption::new(30.0, Medium)],
        },
        Food {
            id: 103,
            name: "Eggs, Bacon, Potatoes, and Avocado".into(),
            emoji: "🍳".into(),
            color: "#b43b24".into(),
            nutrition: nutrition(415.0, 25.0, 28.0, 0.0, 20.0),
            meals: vec![Breakfast],
            absorption: vec![
                FoodAbsorption::new(5.0, Fast),
                FoodAbsorption::new(15.0, Medium),
                FoodAbsorption::new(10.0, VerySlow),
            ],
        },
        Food {
            id: 104,
            name: "Pancakes, Maple Syrup, and Butter".into(),
            emoji: "🥞".into(),
            color: "#e39210".into(),
            nutrition: nutrition(473.0, 20.0, 70.0, 50.0, 6.0),
            meals: vec![Breakfast],
            absorption: vec![
                FoodAbsorption::new(20.0, VeryFast),
                FoodAbsorption::new(40.0, Medium),
                FoodAbsorption::new(12.0, Slow),
            ],
        },
        Food {
            id: 105,
            name: "Bacon, Egg, and Cheese on a Bagel".into(),
            emoji: "🥯".into(),
            color: "#f6d2af".into(),
            nutrition: nutrition(500.0, 22.0, 47.0, 4.0, 26.0),
            meals: vec![Breakfast],
            absorption: vec![
                FoodAbsorption::new(20.0, Fast),
                FoodAbsorption::new(20.0, Medium),
                FoodAbsorption::new(10.0, VerySlow),
            ],
        },
        // ====================================================================
        // Lunch
        // ====================================================================
        Food {
            id: 200,
            name: "Apple, Cheese, Salami and Crackers".into(),
            emoji: "🍎".into(),
            color: "#ffe4c2".into(),
            nutrition: nutrition(0.0, 7.0, 25.0, 19.0, 7.0),
            meals: vec![Lunch],
            absorption: vec![FoodAbsorption::new(10.0, Fast), FoodAbsorption::new(15.0, Medium)],
        },
        Food {
            id: 201,
            name: "Sunflower Seed Butter & Jelly Sandwich".into(),
            emoji: "🥪".into(),
            color: "#ac0048".into(),
            nutrition: nutrition(320.0, 12.0, 42.0, 12.0, 10.0),
            meals: vec![Lunch],
            absorption: vec![FoodAbsorption::new(15.0, Fast), FoodAbsorption::new(20.0, Slow)],
        },
        Food {
            id: 202,
            name: "Shrimp Tacos".into(),
            emoji: "🌮".into(),
            color: "#ffbbbb".into(),
            nutrition: nutrition(250.0, 8.0, 23.0, 2.0, 22.0),
            meals: vec![Lunch],
            absorption: vec![FoodAbsorption::new(13.0, Medium), FoodAbsorption::new(10.0, Slow)],
        },
        Food {
            id: 203,
            name: "Carnitas Burrito".into(),
            emoji: "🌯".into(),
            color: "#965c00".into(),
            nutrition: nutrition(965.0, 38.0, 100.0, 3.0, 50.0),
            meals: vec![Lunch],
            absorption: vec![FoodAbsorption::new(50.0, Fast), FoodAbsorption::new(50.0, Slow)],
        },
        Food {
            id: 204,
            name: "Salmon Bento Box".into(),
            emoji: "🍱".into(),
            color: "#f06539".into(),
            nutrition: nutrition(383.0, 19.0, 21.0, 3.0, 32.0),
            meals: vec![Lunch],
            absorption: vec![FoodAbsorption::new(20.0, Fast), FoodAbsorption::new(10.0, Slow)],
        },
        // ====================================================================
        // Dinner
        // ====================================================================
        Food {
            id: 300,
            name: "2 slices of Cheese Pizza".into(),
            emoji: "🍕".into(),
            color: "#ffdd50".into(),
            nutrition: nutrition(333.0, 12.0, 43.0, 9.0, 12.0),
            meals: vec![Dinner],
            absorption: vec![
                FoodAbsorption::new(15.0, Fast),
                FoodAbsorption::new(10.0, Medium),
                FoodAbsorption::delayed(30.0, Fast, Slow),
            ],
        },
        Food {
            id: 301,
            name: "Cheeseburger and French Fries".into(),
            emoji: "🍔".into(),
            color: "#7e451e".into(),
            nutrition: Nutrition {
                fiber: Some(6.0),
                ..nutrition(900.0, 46.0, 88.0, 8.0, 34.0)
            },
            meals: vec![Dinner],
            absorption: vec![
                FoodAbsorption::new(30.0, Fast),
                FoodAbsorption::new(30.0, Medium),
                FoodAbsorption::new(30.0, VerySlow),
            ],
        },
        Food {
            id: 302,
            name: "Curry Chicken and White Rice".into(),
            emoji: "🍛".into(),
            color: "#b44913".into(),
            nutrition: Nutrition {
                fiber: Some(4.0),
                ..nutrition(425.0, 11.0, 52.0, 10.0, 32.0)
            },
            meals: vec![Dinner],
            absorption: vec![
                FoodAbsorption::new(20.0, Fast),
                FoodAbsorption::new(15.0, Medium),
                FoodAbsorption::new(20.0, Slow),
            ],
        },
        Food {
            id: 303,
            name: "Spaghetti and Meatballs".into(),
            emoji: "🍝".into(),
            color: "#970000".into(),
            nutrition: nutrition(390.0, 12.0, 50.0, 5.0, 20.0),
            meals: vec![Dinner],
            absorption: vec![
                FoodAbsorption::new(25.0, Fast),
                FoodAbsorption::new(15.0, Medium),
                FoodAbsorption::new(10.0, VerySlow),
            ],
        },
        Food {
            id: 304,
            name: "Steak Salad".into(),
            emoji: "🥗".into(),
            color: "#4b7a05".into(),
            nutrition: Nutrition {
                fiber: Some(4.0),
                ..nutrition(425.0, 20.0, 20.0, 2.0, 34.0)
            },
            meals: vec![Dinner],
            absorption: vec![FoodAbsorption::new(10.0, Medium), FoodAbsorption::new(10.0, VerySlow)],
        },
        // ====================================================================
        // Snacks
        // ====================================================================
        Food {
            id: 400,
            name: "Apple and Peanut Butter".into(),
            emoji: "🍏".into(),
            color: "#9ccc65".into(),
            nutrition: nutrition(270.0, 16.0, 25.0, 19.0, 7.0),
            meals: vec![Snack],
            absorption: vec![FoodAbsorption::new(15.0, VeryFast), FoodAbsorption::new(10.0, Medium)],
        },
        Food {
            id: 401,
            name: "Granola Bar".into(),
            emoji: "🍫".into(),
            color: "#c8a165".into(),
            nutrition: nutrition(190.0, 7.0, 29.0, 12.0, 3.0),
            meals: vec![Snack, Breakfast],
            absorption: vec![FoodAbsorption::new(15.0, Fast), FoodAbsorption::new(14.0, Medium)],
        },
        Food {
            id: 402,
            name: "Pretzels and Hummus".into(),
            emoji: "🥨".into(),
            color: "#d9a066".into(),
            nutrition: nutrition(200.0, 6.0, 30.0, 1.0, 6.0),
            meals: vec![Snack],
            absorption: vec![FoodAbsorption::new(20.0, Fast), FoodAbsorption::new(10.0, Slow)],
        },
        // ====================================================================
        // Desserts
        // ====================================================================
        Food {
            id: 500,
            name: "Chocolate Chip Cookies".into(),
            emoji: "🍪".into(),
            color: "#a0522d".into(),
            nutrition: nutrition(220.0, 10.0, 30.0, 18.0, 2.0),
            meals: vec![Dessert, Snack],
            absorption: vec![FoodAbsorption::new(18.0, VeryFast), FoodAbsorption::new(12.0, Medium)],
        },
        Food {
            id: 501,
            name: "Vanilla Ice Cream".into(),
            emoji: "🍨".into(),
            color: "#fff3d6".into(),
            nutrition: nutrition(270.0, 14.0, 32.0, 28.0, 4.0),
            meals: vec![Dessert],
            absorption: vec![FoodAbsorption::new(20.0, Fast), FoodAbsorption::new(12.0, Slow)],
        },
        Food {
            id: 502,
            name: "Apple Pie".into(),
            emoji: "🥧".into(),
            color: "#e0a458".into(),
            nutrition: nutrition(300.0, 14.0, 43.0, 20.0, 2.0),
            meals: vec![Dessert],
            absorption: vec![
                FoodAbsorption::new(20.0, VeryFast),
                FoodAbsorption::new(15.0, Medium),
                FoodAbsorption::new(8.0, VerySlow),
            ],
        },
    ];

    Catalog { foods }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DoseKind;

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_every_category_has_foods() {
        let catalog = get_default_catalog();
        for category in MealCategory::ALL {
            assert!(
                !catalog.foods_for(category).is_empty(),
                "No foods for {}",
                category
            );
        }
        assert_eq!(catalog.foods_for(MealCategory::Dinner).len(), 5);
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let mut catalog = build_default_catalog();
        let dup = catalog.foods[0].clone();
        catalog.foods.push(dup);
        let errors = catalog.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Duplicate food id 100"));
    }

    #[test]
    fn test_carb_event_uses_absorption_total() {
        let catalog = get_default_catalog();
        let cereal = catalog.get(100).unwrap();
        // Label says 50 g, absorption phases say 60 g
        assert_eq!(cereal.absorbed_carbs(), 60.0);

        let event = cereal.carb_event(15.0, CurveShape::Sawtooth).unwrap();
        assert_eq!(event.kind(), DoseKind::Carb);
        assert_eq!(event.amount(), 60.0);
        assert_eq!(event.start_time(), 15.0);
        assert_eq!(event.segments().len(), 2);
    }

    #[test]
    fn test_delayed_phase_preserved() {
        let pizza = get_default_catalog().get(300).unwrap();
        let segments = pizza.carb_segments(CurveShape::Sine).unwrap();
        assert_eq!(segments[2].delay(), CarbSpeed::Fast.duration());
        assert_eq!(segments[2].duration(), CarbSpeed::Slow.duration());
    }

    #[test]
    fn test_events_include_protein() {
        let burrito = get_default_catalog().get(203).unwrap();
        let events = burrito.events(0.0, CurveShape::Sawtooth).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind(), DoseKind::Protein);
        assert_eq!(events[1].amount(), 50.0);
    }

    #[test]
    fn test_meal_category_parse() {
        assert_eq!("Dinner".parse::<MealCategory>(), Ok(MealCategory::Dinner));
        assert!("brunch".parse::<MealCategory>().is_err());
    }
}
