//! Plain-text presentation for the CLI
//!
//! Every function returns a `String` so output can be asserted in tests.

use std::fmt::Write;

use dex_common::models::{ComparisonStats, Pokemon, Stat, TrainerIdentity};

use crate::compare::ComparisonView;
use crate::filter::StatCeiling;

const BAR_WIDTH: usize = 20;
const ROW_BAR_WIDTH: usize = 8;

/// `[#####.....]`-style bar for a 0..=100 percentage
pub fn bar(percent: u8) -> String {
    bar_of_width(percent, BAR_WIDTH)
}

fn bar_of_width(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

fn shiny_tag(pokemon: &Pokemon) -> &'static str {
    if pokemon.is_shiny() {
        " (shiny)"
    } else {
        ""
    }
}

/// One roster line with compact stat bars; favorites are starred
pub fn pokemon_row(pokemon: &Pokemon, favorite: bool, ceiling: &StatCeiling) -> String {
    let mut out = format!(
        "{} #{:<4} {:<14} {:<18}",
        if favorite { "*" } else { " " },
        pokemon.pokedex_number,
        pokemon.name,
        pokemon.types.join("/"),
    );
    for stat in Stat::ALL {
        let _ = write!(
            out,
            " {:<3} {:>3} {}",
            stat.short_label(),
            pokemon.stat(stat),
            bar_of_width(ceiling.percent(pokemon, stat), ROW_BAR_WIDTH)
        );
    }
    out.push_str(shiny_tag(pokemon));
    out
}

pub fn roster<'a>(
    pokemons: impl IntoIterator<Item = &'a Pokemon>,
    ceiling: &StatCeiling,
    is_favorite: impl Fn(&Pokemon) -> bool,
) -> String {
    let mut out = String::new();
    let mut count = 0;
    for pokemon in pokemons {
        let _ = writeln!(out, "{}", pokemon_row(pokemon, is_favorite(pokemon), ceiling));
        count += 1;
    }
    if count == 0 {
        out.push_str("No Pokémon match.\n");
    }
    out
}

/// Detail card with stat bars scaled by `ceiling`
pub fn detail(pokemon: &Pokemon, favorite: bool, ceiling: &StatCeiling) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "#{} {}{}",
        pokemon.pokedex_number,
        pokemon.name,
        if favorite { " (favorite)" } else { "" }
    );
    let _ = writeln!(out, "Type:   {} ({})", pokemon.types.join(", "), pokemon.primary_type());
    let _ = writeln!(out, "Sprite: {}", pokemon.sprite_url());
    for stat in Stat::ALL {
        let _ = writeln!(
            out,
            "{:<8} {:>3} {}",
            stat.label(),
            pokemon.stat(stat),
            bar(ceiling.percent(pokemon, stat))
        );
    }
    out
}

/// Six numbered slots, empty ones shown as such
pub fn team_slots(slots: &[Option<&Pokemon>], ceiling: &StatCeiling) -> String {
    let mut out = String::new();
    for (index, slot) in slots.iter().enumerate() {
        match slot {
            Some(pokemon) => {
                let _ = writeln!(
                    out,
                    "{}. #{} {}{}",
                    index + 1,
                    pokemon.pokedex_number,
                    pokemon.name,
                    shiny_tag(pokemon)
                );
                for stat in Stat::ALL {
                    let _ = writeln!(
                        out,
                        "   {:<8} {:>3} {}",
                        stat.label(),
                        pokemon.stat(stat),
                        bar_of_width(ceiling.percent(pokemon, stat), ROW_BAR_WIDTH)
                    );
                }
            }
            None => {
                let _ = writeln!(out, "{}. (empty)", index + 1);
            }
        }
    }
    out
}

/// Backend aggregates as returned, no rounding
pub fn comparison_stats(stats: &ComparisonStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:>5} {:>5} {:>8}", "Stat", "Min", "Max", "Avg");
    for stat in Stat::ALL {
        let (min, max, avg) = stats.summary(stat);
        let _ = writeln!(out, "{:<8} {:>5} {:>5} {:>8}", stat.label(), min, max, avg);
    }
    out
}

pub fn comparison(view: &ComparisonView) -> String {
    let mut out = String::new();
    for pokemon in view.pokemons() {
        let _ = writeln!(out, "#{} {}", pokemon.pokedex_number, pokemon.name);
        for stat in Stat::ALL {
            let _ = writeln!(
                out,
                "  {:<8} {:>3} {}",
                stat.label(),
                pokemon.stat(stat),
                bar(view.stat_percent(pokemon, stat))
            );
        }
    }
    out.push('\n');
    out.push_str(&comparison_stats(view.stats()));
    out
}

pub fn trainer(identity: &TrainerIdentity) -> String {
    format!("{} <{}> (trainer #{})", identity.name, identity.email, identity.trainer_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pikachu() -> Pokemon {
        Pokemon {
            id: 5,
            pokedex_number: 25,
            name: "Pikachu".to_string(),
            hp: 35,
            attack: 55,
            defense: 40,
            speed: 90,
            types: vec!["Electric".to_string()],
        }
    }

    #[test]
    fn test_bar_bounds() {
        assert_eq!(bar(0), format!("[{}]", ".".repeat(BAR_WIDTH)));
        assert_eq!(bar(100), format!("[{}]", "#".repeat(BAR_WIDTH)));
        assert_eq!(bar(50).matches('#').count(), BAR_WIDTH / 2);
    }

    fn ceiling() -> StatCeiling {
        StatCeiling {
            hp: 70,
            attack: 55,
            defense: 80,
            speed: 90,
        }
    }

    #[test]
    fn test_row_marks_favorites() {
        let row = pokemon_row(&pikachu(), true, &ceiling());
        assert!(row.starts_with('*'));
        assert!(row.contains("Pikachu"));
        assert!(row.contains("#25"));
    }

    #[test]
    fn test_row_bars_scale_to_catalog_maxima() {
        let row = pokemon_row(&pikachu(), false, &ceiling());
        // hp 35/70 and defense 40/80 are half bars; attack and speed are at the maximum
        assert!(row.contains("HP   35 [####....]"));
        assert!(row.contains("DEF  40 [####....]"));
        assert!(row.contains("ATK  55 [########]"));
        assert!(row.contains("SPD  90 [########]"));
    }

    #[test]
    fn test_row_and_slot_tag_shiny() {
        let plain = pikachu();
        assert!(!pokemon_row(&plain, false, &ceiling()).contains("(shiny)"));

        let shiny = Pokemon { id: 100, ..pikachu() };
        assert!(pokemon_row(&shiny, false, &ceiling()).ends_with(" (shiny)"));
        assert!(team_slots(&[Some(&shiny)], &ceiling()).contains("1. #25 Pikachu (shiny)"));
    }

    #[test]
    fn test_empty_roster_message() {
        assert_eq!(
            roster(Vec::<&Pokemon>::new(), &ceiling(), |_| false),
            "No Pokémon match.\n"
        );
    }

    #[test]
    fn test_team_slots_pad_empty() {
        let p = pikachu();
        let slots = vec![Some(&p), None];
        let text = team_slots(&slots, &ceiling());
        assert!(text.contains("1. #25 Pikachu\n"));
        assert!(text.contains("   Speed     90 [########]"));
        assert!(text.contains("2. (empty)"));
    }

    #[test]
    fn test_comparison_stats_verbatim() {
        let stats = ComparisonStats {
            min_hp: 35,
            max_hp: 45,
            avg_hp: 40.0,
            min_attack: 49,
            max_attack: 55,
            avg_attack: 52.0,
            min_defense: 40,
            max_defense: 49,
            avg_defense: 44.5,
            min_speed: 45,
            max_speed: 90,
            avg_speed: 67.5,
        };
        let text = comparison_stats(&stats);
        assert!(text.contains("44.5"));
        assert!(text.contains("67.5"));
        assert!(text.lines().any(|l| l.contains("35") && l.contains("45")));
    }
}
