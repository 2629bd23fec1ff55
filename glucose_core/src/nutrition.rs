//! Calorie breakdown of a food's nutrition facts.
//!
//! Ref: https://en.wikipedia.org/wiki/Dietary_Reference_Intake

use serde::{Deserialize, Serialize};

/// Nutrition facts per serving (grams unless noted)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Nutrition {
    /// Label calories (kcal)
    pub calories: f64,
    pub fat: f64,
    #[serde(default)]
    pub saturated_fat: f64,
    pub carbs: f64,
    pub sugars: f64,
    pub protein: f64,
    #[serde(default)]
    pub fiber: Option<f64>,
}

/// Calories contributed by each nutrient
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct CalorieDistribution {
    pub fat: f64,
    pub saturated_fat: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sugars: f64,
    /// Fat + carbs + protein; sub-nutrients are already counted there
    pub sum: f64,
}

const FAT_KCAL_PER_GRAM: f64 = 9.0;
const PROTEIN_KCAL_PER_GRAM: f64 = 4.0;
const CARB_KCAL_PER_GRAM: f64 = 4.0;

pub fn calorie_distribution(nutrition: &Nutrition) -> CalorieDistribution {
    let fat = nutrition.fat * FAT_KCAL_PER_GRAM;
    let protein = nutrition.protein * PROTEIN_KCAL_PER_GRAM;
    let carbs = nutrition.carbs * CARB_KCAL_PER_GRAM;

    CalorieDistribution {
        fat,
        saturated_fat: nutrition.saturated_fat * FAT_KCAL_PER_GRAM,
        protein,
        carbs,
        sugars: nutrition.sugars * CARB_KCAL_PER_GRAM,
        sum: fat + carbs + protein,
    }
}
