//! Read-only rule content: terrains, improvements, resources, techs,
//! policies, promotions, eras, nations, and unit types.
//!
//! The ruleset is loaded by an external collaborator and only *consumed*
//! here. Every lookup returns `Option`: content changes can remove entries
//! that saved games still reference, and the core's contract is to skip
//! such entries, never to crash on them.

use crate::map::RoadStatus;
use crate::uniques::{HasUniques, Unique, UniqueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-turn yield bundle. Whole numbers for determinism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub food: i32,
    pub production: i32,
    pub gold: i32,
    pub science: i32,
    pub culture: i32,
    pub faith: i32,
    pub happiness: i32,
}

impl Stats {
    pub const ZERO: Stats = Stats {
        food: 0,
        production: 0,
        gold: 0,
        science: 0,
        culture: 0,
        faith: 0,
        happiness: 0,
    };

    /// Sum of the economic yields (happiness excluded: it is a balance,
    /// not an output).
    pub fn total(&self) -> i32 {
        self.food + self.production + self.gold + self.science + self.culture + self.faith
    }

    pub fn is_empty(&self) -> bool {
        *self == Stats::ZERO
    }

    /// Add `amount` to the stat named `name`. Returns false for an unknown
    /// stat name (stale content reference; callers skip).
    pub fn add_named(&mut self, name: &str, amount: i32) -> bool {
        match name {
            "food" => self.food += amount,
            "production" => self.production += amount,
            "gold" => self.gold += amount,
            "science" => self.science += amount,
            "culture" => self.culture += amount,
            "faith" => self.faith += amount,
            "happiness" => self.happiness += amount,
            _ => return false,
        }
        true
    }

    /// Scale the stat named `name` by `percent` (additive percentage).
    pub fn scale_named(&mut self, name: &str, percent: i32) -> bool {
        let field = match name {
            "food" => &mut self.food,
            "production" => &mut self.production,
            "gold" => &mut self.gold,
            "science" => &mut self.science,
            "culture" => &mut self.culture,
            "faith" => &mut self.faith,
            "happiness" => &mut self.happiness,
            _ => return false,
        };
        *field += *field * percent / 100;
        true
    }
}

impl std::ops::Add for Stats {
    type Output = Stats;

    fn add(self, o: Stats) -> Stats {
        Stats {
            food: self.food + o.food,
            production: self.production + o.production,
            gold: self.gold + o.gold,
            science: self.science + o.science,
            culture: self.culture + o.culture,
            faith: self.faith + o.faith,
            happiness: self.happiness + o.happiness,
        }
    }
}

impl std::ops::AddAssign for Stats {
    fn add_assign(&mut self, o: Stats) {
        *self = *self + o;
    }
}

/// Whether a terrain entry is a base terrain or an overlay feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainKind {
    Land,
    Water,
    Feature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainDef {
    pub name: String,
    pub kind: TerrainKind,
    pub stats: Stats,
    /// Percent bonus to a defender on this terrain.
    pub defence_bonus: i32,
    pub impassable: bool,
    pub hill: bool,
    /// No improvement can be constructed while this terrain/feature is present.
    pub unbuildable: bool,
    /// The feature can be cleared by a removal improvement.
    pub removable: bool,
    /// The feature suppresses all tile yields while present (e.g. fallout).
    pub nullifies_yields: bool,
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementDef {
    pub name: String,
    pub stats: Stats,
    pub turns_to_build: i32,
    /// Base terrains this can be constructed on (empty = any buildable land).
    pub terrains_can_be_built_on: Vec<String>,
    pub tech_required: Option<String>,
    /// Defensive emplacement (forts and citadels).
    pub fortification: bool,
    /// "Great" improvements are placed by great people, never by workers,
    /// and are never overwritten by automation.
    pub is_great: bool,
    /// A removal pseudo-improvement: clears the named feature instead of
    /// constructing anything.
    pub removes_feature: Option<String>,
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Bonus,
    Strategic,
    Luxury,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    pub name: String,
    pub kind: ResourceKind,
    /// Improvement that exploits this resource.
    pub improvement: Option<String>,
    /// Tech required before the resource is visible at all.
    pub revealed_by: Option<String>,
    pub stats: Stats,
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechDef {
    pub name: String,
    pub cost: i32,
    pub prerequisites: Vec<String>,
    pub era: String,
    /// Researching this tech makes the given road type constructible.
    pub unlocks_road: Option<RoadStatus>,
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDef {
    pub name: String,
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionDef {
    pub name: String,
    /// Cumulative experience required for the n-th promotion is
    /// `10 * n * (n + 1) / 2`; the per-promotion cost lives on the unit side.
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraDef {
    pub name: String,
    pub uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationDef {
    pub name: String,
    pub uniques: Vec<Unique>,
    /// Granted to this city-state's patron (ally), not to the nation itself.
    pub patronage_uniques: Vec<Unique>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitDomain {
    Civilian,
    Military,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseUnitDef {
    pub name: String,
    pub domain: UnitDomain,
    pub movement: i32,
    pub strength: i32,
    /// Production cost; also the gold-value ordering used when disbanding.
    pub cost: i32,
    /// Can construct tile improvements and roads.
    pub worker: bool,
    pub great_person: bool,
    pub uniques: Vec<Unique>,
}

/// The full read-only lookup surface consumed by the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ruleset {
    pub terrains: BTreeMap<String, TerrainDef>,
    pub improvements: BTreeMap<String, ImprovementDef>,
    pub resources: BTreeMap<String, ResourceDef>,
    pub techs: BTreeMap<String, TechDef>,
    pub policies: BTreeMap<String, PolicyDef>,
    pub promotions: BTreeMap<String, PromotionDef>,
    pub eras: BTreeMap<String, EraDef>,
    pub nations: BTreeMap<String, NationDef>,
    pub units: BTreeMap<String, BaseUnitDef>,
    /// Ruleset-wide uniques that apply to every civilization.
    pub global_uniques: Vec<Unique>,
}

macro_rules! impl_has_uniques {
    ($($t:ty),*) => {
        $(impl HasUniques for $t {
            fn unique_objects(&self) -> &[Unique] {
                &self.uniques
            }
        })*
    };
}

impl_has_uniques!(
    TerrainDef,
    ImprovementDef,
    ResourceDef,
    TechDef,
    PolicyDef,
    PromotionDef,
    EraDef,
    NationDef,
    BaseUnitDef
);

impl Ruleset {
    /// A compact, self-contained ruleset used by tests and the demo driver.
    /// Large enough to exercise every aggregation source and automation path.
    pub fn for_testing() -> Ruleset {
        use crate::uniques::Conditional;

        let mut rs = Ruleset::default();

        let land = |name: &str, stats: Stats, hill: bool, defence: i32| TerrainDef {
            name: name.to_string(),
            kind: TerrainKind::Land,
            stats,
            defence_bonus: defence,
            impassable: false,
            hill,
            unbuildable: false,
            removable: false,
            nullifies_yields: false,
            uniques: Vec::new(),
        };

        let grass = Stats {
            food: 2,
            ..Stats::ZERO
        };
        let plains = Stats {
            food: 1,
            production: 1,
            ..Stats::ZERO
        };
        let hill = Stats {
            production: 2,
            ..Stats::ZERO
        };
        rs.add_terrain(land("Grassland", grass, false, 0));
        rs.add_terrain(land("Plains", plains, false, 0));
        rs.add_terrain(land("Hill", hill, true, 25));
        rs.add_terrain(TerrainDef {
            impassable: true,
            defence_bonus: 0,
            ..land("Mountain", Stats::ZERO, true, 0)
        });
        rs.add_terrain(TerrainDef {
            kind: TerrainKind::Water,
            impassable: true,
            ..land("Ocean", Stats::ZERO, false, 0)
        });
        rs.add_terrain(TerrainDef {
            kind: TerrainKind::Feature,
            unbuildable: true,
            removable: true,
            defence_bonus: 25,
            ..land(
                "Forest",
                Stats {
                    production: 1,
                    ..Stats::ZERO
                },
                false,
                0,
            )
        });
        rs.add_terrain(TerrainDef {
            kind: TerrainKind::Feature,
            unbuildable: true,
            removable: true,
            nullifies_yields: true,
            ..land("Fallout", Stats::ZERO, false, 0)
        });

        let improvement = |name: &str,
                           stats: Stats,
                           turns: i32,
                           terrains: &[&str],
                           tech: Option<&str>| ImprovementDef {
            name: name.to_string(),
            stats,
            turns_to_build: turns,
            terrains_can_be_built_on: terrains.iter().map(|s| s.to_string()).collect(),
            tech_required: tech.map(|s| s.to_string()),
            fortification: false,
            is_great: false,
            removes_feature: None,
            uniques: Vec::new(),
        };
        rs.add_improvement(improvement(
            "Farm",
            Stats {
                food: 1,
                ..Stats::ZERO
            },
            6,
            &["Grassland", "Plains"],
            Some("Agriculture"),
        ));
        rs.add_improvement(improvement(
            "Mine",
            Stats {
                production: 2,
                ..Stats::ZERO
            },
            7,
            &["Hill"],
            Some("Mining"),
        ));
        rs.add_improvement(improvement(
            "Pasture",
            Stats {
                production: 1,
                gold: 1,
                ..Stats::ZERO
            },
            7,
            &["Grassland", "Plains"],
            Some("Animal Husbandry"),
        ));
        rs.add_improvement(ImprovementDef {
            fortification: true,
            ..improvement("Fort", Stats::ZERO, 8, &[], Some("Masonry"))
        });
        rs.add_improvement(ImprovementDef {
            fortification: true,
            ..improvement("Citadel", Stats::ZERO, 0, &[], None)
        });
        rs.add_improvement(ImprovementDef {
            is_great: true,
            ..improvement(
                "Academy",
                Stats {
                    science: 8,
                    ..Stats::ZERO
                },
                0,
                &[],
                None,
            )
        });
        rs.add_improvement(ImprovementDef {
            removes_feature: Some("Forest".to_string()),
            ..improvement("Remove Forest", Stats::ZERO, 4, &[], Some("Mining"))
        });
        rs.add_improvement(ImprovementDef {
            removes_feature: Some("Fallout".to_string()),
            ..improvement("Remove Fallout", Stats::ZERO, 3, &[], None)
        });

        let resource = |name: &str, kind: ResourceKind, imp: Option<&str>, revealed: Option<&str>| {
            ResourceDef {
                name: name.to_string(),
                kind,
                improvement: imp.map(|s| s.to_string()),
                revealed_by: revealed.map(|s| s.to_string()),
                stats: Stats {
                    gold: 1,
                    ..Stats::ZERO
                },
                uniques: Vec::new(),
            }
        };
        rs.add_resource(resource(
            "Iron",
            ResourceKind::Strategic,
            Some("Mine"),
            Some("Iron Working"),
        ));
        rs.add_resource(resource("Gems", ResourceKind::Luxury, Some("Mine"), None));
        rs.add_resource(resource(
            "Horses",
            ResourceKind::Strategic,
            Some("Pasture"),
            Some("Animal Husbandry"),
        ));
        rs.add_resource(resource("Wheat", ResourceKind::Bonus, Some("Farm"), None));

        let tech = |name: &str, cost: i32, prereqs: &[&str], era: &str| TechDef {
            name: name.to_string(),
            cost,
            prerequisites: prereqs.iter().map(|s| s.to_string()).collect(),
            era: era.to_string(),
            unlocks_road: None,
            uniques: Vec::new(),
        };
        rs.add_tech(tech("Agriculture", 20, &[], "Ancient"));
        rs.add_tech(tech("Animal Husbandry", 35, &["Agriculture"], "Ancient"));
        rs.add_tech(tech("Mining", 35, &["Agriculture"], "Ancient"));
        rs.add_tech(tech("Masonry", 55, &["Mining"], "Ancient"));
        rs.add_tech(tech("Iron Working", 55, &["Mining"], "Ancient"));
        rs.add_tech(TechDef {
            unlocks_road: Some(RoadStatus::Road),
            ..tech("The Wheel", 55, &["Animal Husbandry"], "Ancient")
        });
        rs.add_tech(TechDef {
            unlocks_road: Some(RoadStatus::Railroad),
            ..tech("Railroads", 120, &["The Wheel", "Iron Working"], "Classical")
        });

        rs.policies.insert(
            "Tradition".to_string(),
            PolicyDef {
                name: "Tradition".to_string(),
                uniques: vec![Unique::new(
                    UniqueType::StatsPerTurn,
                    &["culture", "1"],
                )],
            },
        );
        rs.policies.insert(
            "Honor".to_string(),
            PolicyDef {
                name: "Honor".to_string(),
                uniques: vec![Unique::with_conditionals(
                    UniqueType::StatPercentBonus,
                    &["production", "10"],
                    vec![Conditional::WhenAtWar],
                )],
            },
        );

        rs.promotions.insert(
            "Shock I".to_string(),
            PromotionDef {
                name: "Shock I".to_string(),
                uniques: Vec::new(),
            },
        );
        rs.promotions.insert(
            "Prospector".to_string(),
            PromotionDef {
                name: "Prospector".to_string(),
                uniques: vec![Unique::new(
                    UniqueType::OneTimeGainResource,
                    &["Iron", "1"],
                )],
            },
        );

        rs.eras.insert(
            "Ancient".to_string(),
            EraDef {
                name: "Ancient".to_string(),
                uniques: Vec::new(),
            },
        );
        rs.eras.insert(
            "Classical".to_string(),
            EraDef {
                name: "Classical".to_string(),
                uniques: vec![Unique::new(UniqueType::StatsPerTurn, &["science", "1"])],
            },
        );

        let nation = |name: &str, uniques: Vec<Unique>| NationDef {
            name: name.to_string(),
            uniques,
            patronage_uniques: Vec::new(),
        };
        rs.nations.insert(
            "Rome".to_string(),
            nation(
                "Rome",
                vec![Unique::new(UniqueType::StatsPerTurn, &["gold", "1"])],
            ),
        );
        rs.nations.insert("Greece".to_string(), nation("Greece", Vec::new()));
        rs.nations.insert(
            "Geneva".to_string(),
            NationDef {
                patronage_uniques: vec![Unique::new(
                    UniqueType::StatsPerTurn,
                    &["culture", "2"],
                )],
                ..nation("Geneva", Vec::new())
            },
        );
        rs.nations
            .insert("Barbarians".to_string(), nation("Barbarians", Vec::new()));
        rs.nations
            .insert("Spectator".to_string(), nation("Spectator", Vec::new()));

        let unit = |name: &str, domain: UnitDomain, movement: i32, strength: i32, cost: i32| {
            BaseUnitDef {
                name: name.to_string(),
                domain,
                movement,
                strength,
                cost,
                worker: false,
                great_person: false,
                uniques: Vec::new(),
            }
        };
        rs.units.insert(
            "Worker".to_string(),
            BaseUnitDef {
                worker: true,
                ..unit("Worker", UnitDomain::Civilian, 2, 0, 70)
            },
        );
        rs.units
            .insert("Warrior".to_string(), unit("Warrior", UnitDomain::Military, 2, 8, 40));
        rs.units
            .insert("Scout".to_string(), unit("Scout", UnitDomain::Military, 3, 5, 25));
        rs.units.insert(
            "Great Engineer".to_string(),
            BaseUnitDef {
                great_person: true,
                ..unit("Great Engineer", UnitDomain::Civilian, 2, 0, 0)
            },
        );

        rs.global_uniques = vec![Unique::new(UniqueType::UnitMaintenanceDiscount, &["10"])];

        rs
    }

    fn add_terrain(&mut self, t: TerrainDef) {
        self.terrains.insert(t.name.clone(), t);
    }

    fn add_improvement(&mut self, i: ImprovementDef) {
        self.improvements.insert(i.name.clone(), i);
    }

    fn add_resource(&mut self, r: ResourceDef) {
        self.resources.insert(r.name.clone(), r);
    }

    fn add_tech(&mut self, t: TechDef) {
        self.techs.insert(t.name.clone(), t);
    }

    /// Best road type unlocked by the given researched-tech set.
    pub fn best_road_for<'a>(
        &self,
        researched: impl Iterator<Item = &'a String>,
    ) -> RoadStatus {
        let mut best = RoadStatus::None;
        for tech_name in researched {
            if let Some(tech) = self.techs.get(tech_name) {
                if let Some(road) = tech.unlocks_road {
                    best = best.max(road);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_arithmetic() {
        let mut s = Stats {
            food: 1,
            gold: 2,
            ..Stats::ZERO
        };
        s += Stats {
            food: 2,
            science: 3,
            ..Stats::ZERO
        };
        assert_eq!(s.food, 3);
        assert_eq!(s.gold, 2);
        assert_eq!(s.science, 3);
        assert_eq!(s.total(), 8);
    }

    #[test]
    fn test_add_named_unknown_stat_is_skipped() {
        let mut s = Stats::ZERO;
        assert!(s.add_named("gold", 5));
        assert!(!s.add_named("mana", 5));
        assert_eq!(s.gold, 5);
    }

    #[test]
    fn test_best_road_follows_tech() {
        let rs = Ruleset::for_testing();
        let none: Vec<String> = vec![];
        assert_eq!(rs.best_road_for(none.iter()), RoadStatus::None);

        let wheel = vec!["The Wheel".to_string()];
        assert_eq!(rs.best_road_for(wheel.iter()), RoadStatus::Road);

        let both = vec!["The Wheel".to_string(), "Railroads".to_string()];
        assert_eq!(rs.best_road_for(both.iter()), RoadStatus::Railroad);
    }

    #[test]
    fn test_missing_lookup_is_none() {
        let rs = Ruleset::for_testing();
        assert!(rs.improvements.get("Offshore Platform").is_none());
        assert!(rs.terrains.get("Grassland").is_some());
    }
}
