//! Fort placement evaluation.

use crate::hex::HexCoord;
use crate::state::{CivId, GameState};

/// Whether a fort (or citadel, which may sit just outside the border) is
/// worth building on this tile.
///
/// Qualification is local: land, not a city center, not already fortified,
/// no visible resource, no great improvement, inside friendly territory
/// (citadels may instead be adjacent to it), and no better hill nearby.
/// Justification is strategic: some known hostile civilization must score
/// past the threat threshold after distance falloff, and the tile must sit
/// roughly on the line between the nearest friendly and hostile cities.
pub fn evaluate_fort_placement(
    game: &GameState,
    civ_id: CivId,
    coord: HexCoord,
    citadel: bool,
) -> bool {
    if !tile_qualifies(game, civ_id, coord, citadel) {
        return false;
    }
    if better_hill_nearby(game, civ_id, coord, citadel) {
        return false;
    }

    let Some(our_city) = nearest_city_center(game, coord, |owner| owner == civ_id) else {
        return false;
    };

    let fort = &game.config.fort;
    for (&other_id, record) in &game.civ(civ_id).diplomacy {
        if (other_id as usize) >= game.civilizations.len() || game.civ(other_id).is_defeated() {
            continue;
        }
        let mut threat = record.threat.score();
        if record.at_war {
            threat += fort.war_weight;
        }
        let Some(their_city) = nearest_city_center(game, coord, |owner| owner == other_id) else {
            continue;
        };
        // Distant enemies justify less.
        threat -= coord.distance(their_city) / fort.distance_penalty_divisor;
        if threat < fort.min_justifying_threat {
            continue;
        }

        // Front-line bias: the tile should lie near the straight line
        // between the two nearest cities.
        let detour = coord.distance(our_city) + coord.distance(their_city)
            - our_city.distance(their_city);
        if detour <= fort.alignment_slack {
            return true;
        }
    }
    false
}

fn tile_qualifies(game: &GameState, civ_id: CivId, coord: HexCoord, citadel: bool) -> bool {
    let Some(tile) = game.map.get(coord) else {
        return false;
    };
    if !tile.is_land(&game.ruleset) || tile.is_impassable(&game.ruleset) {
        return false;
    }
    if game.is_city_center(coord) {
        return false;
    }
    if tile.has_viewable_resource(&game.ruleset, |t| game.civ(civ_id).has_tech(t)) {
        return false;
    }
    if let Some(def) = tile.improvement.as_ref().and_then(|i| game.ruleset.improvements.get(i)) {
        if def.fortification || def.is_great {
            return false;
        }
    }
    match tile.owner {
        Some(owner) if owner == civ_id => true,
        None | Some(_) if citadel => game
            .map
            .neighbors(coord)
            .into_iter()
            .any(|n| game.map.get(n).map(|t| t.owner == Some(civ_id)).unwrap_or(false)),
        _ => false,
    }
}

/// A qualifying hill within the search radius beats a non-hill candidate.
fn better_hill_nearby(game: &GameState, civ_id: CivId, coord: HexCoord, citadel: bool) -> bool {
    let Some(tile) = game.map.get(coord) else {
        return false;
    };
    if tile.is_hill(&game.ruleset) {
        return false;
    }
    game.map
        .coords_in_distance(coord, game.config.fort.hill_search_radius)
        .into_iter()
        .filter(|&c| c != coord)
        .any(|c| {
            game.map
                .get(c)
                .map(|t| t.is_hill(&game.ruleset))
                .unwrap_or(false)
                && tile_qualifies(game, civ_id, c, citadel)
        })
}

fn nearest_city_center(
    game: &GameState,
    from: HexCoord,
    owner_matches: impl Fn(crate::state::CivId) -> bool,
) -> Option<HexCoord> {
    game.cities
        .values()
        .filter(|c| owner_matches(c.owner))
        .map(|c| c.center)
        .min_by_key(|&c| (from.distance(c), c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::{DiplomacyRecord, ThreatLevel};
    use crate::testing::GameStateBuilder;

    fn border_game(threat: ThreatLevel, at_war: bool) -> GameState {
        let mut game = GameStateBuilder::new()
            .with_map_radius(4)
            .with_civ("Rome")
            .with_civ("Greece")
            .with_city(0, HexCoord::new(-3, 0), true)
            .with_city(1, HexCoord::new(3, 0), true)
            .build();
        game.civ_mut(0).diplomacy.insert(
            1,
            DiplomacyRecord { at_war, threat, opinion: 0 },
        );
        // Give Rome a border tile between the two capitals.
        game.map.get_mut(HexCoord::new(0, 0)).unwrap().owner = Some(0);
        game
    }

    #[test]
    fn test_fort_justified_on_frontline_at_war() {
        let game = border_game(ThreatLevel::High, true);
        assert!(evaluate_fort_placement(&game, 0, HexCoord::new(0, 0), false));
    }

    #[test]
    fn test_no_fort_against_low_threat_at_peace() {
        let game = border_game(ThreatLevel::VeryLow, false);
        assert!(!evaluate_fort_placement(&game, 0, HexCoord::new(0, 0), false));
    }

    #[test]
    fn test_no_fort_off_the_frontline() {
        let mut game = border_game(ThreatLevel::VeryHigh, true);
        // A tile far off the line between the capitals.
        let off = HexCoord::new(-1, 4);
        game.map.get_mut(off).unwrap().owner = Some(0);
        assert!(!evaluate_fort_placement(&game, 0, off, false));
    }

    #[test]
    fn test_resource_tile_never_fortified() {
        let mut game = border_game(ThreatLevel::High, true);
        game.map.get_mut(HexCoord::new(0, 0)).unwrap().resource = Some("Gems".to_string());
        assert!(!evaluate_fort_placement(&game, 0, HexCoord::new(0, 0), false));
    }

    #[test]
    fn test_superior_hill_preempts_flat_candidate() {
        let mut game = border_game(ThreatLevel::High, true);
        let hill = HexCoord::new(1, 0);
        game.map.get_mut(hill).unwrap().terrain = "Hill".to_string();
        game.map.get_mut(hill).unwrap().owner = Some(0);

        assert!(!evaluate_fort_placement(&game, 0, HexCoord::new(0, 0), false));
        assert!(evaluate_fort_placement(&game, 0, hill, false));
    }

    #[test]
    fn test_citadel_may_sit_adjacent_to_territory() {
        let game = border_game(ThreatLevel::High, true);
        // (1, 0) is unowned but borders Rome's (0, 0).
        let outside = HexCoord::new(1, 0);
        assert!(game.map.get(outside).unwrap().owner.is_none());
        assert!(!evaluate_fort_placement(&game, 0, outside, false));
        assert!(evaluate_fort_placement(&game, 0, outside, true));
    }
}
