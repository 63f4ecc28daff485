//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Item name classification

const RAW_MEATS: &[&str] = &[
    "beef", "porkchop", "chicken", "mutton", "rabbit", "cod", "salmon",
];

const PREPARED_FOODS: &[&str] = &["bread", "apple", "baked_potato", "carrot", "golden_carrot"];

/// Block used to craft a furnace
pub const BUILDING_BLOCK: &str = "cobblestone";

/// Building blocks a furnace recipe consumes
pub const FURNACE_COST: u32 = 8;

/// Armor materials in order of preference, with the chestplate each one makes
pub const CHESTPLATES: &[(&str, &str)] = &[
    ("iron_ingot", "iron_chestplate"),
    ("leather", "leather_chestplate"),
];

/// Material units a chestplate recipe consumes
pub const CHESTPLATE_COST: u32 = 8;

pub fn is_weapon(name: &str) -> bool {
    name.contains("sword")
}

/// Uncooked meat that a furnace can turn into food
pub fn is_raw_meat(name: &str) -> bool {
    RAW_MEATS.contains(&name)
}

/// Food worth eating without cooking first
pub fn is_prepared_food(name: &str) -> bool {
    name.starts_with("cooked_") || PREPARED_FOODS.contains(&name)
}

pub fn is_fuel(name: &str) -> bool {
    matches!(name, "coal" | "charcoal") || name.ends_with("_log") || name.ends_with("_planks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weapon() {
        assert!(is_weapon("iron_sword"));
        assert!(is_weapon("wooden_sword"));
        assert!(!is_weapon("iron_pickaxe"));
    }

    #[test]
    fn test_food_classes() {
        assert!(is_raw_meat("beef"));
        assert!(!is_raw_meat("cooked_beef"));
        assert!(is_prepared_food("cooked_beef"));
        assert!(is_prepared_food("bread"));
        assert!(!is_prepared_food("mutton"));
    }

    #[test]
    fn test_fuel() {
        assert!(is_fuel("coal"));
        assert!(is_fuel("oak_log"));
        assert!(is_fuel("spruce_planks"));
        assert!(!is_fuel("beef"));
    }
}
