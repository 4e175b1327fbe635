//! Graduated proximity between where a student wants to study and where a
//! program is.

use super::text::{contains_phrase, fold, tokens};
use crate::data::taxonomy::Taxonomy;

const SAME_PLACE: f64 = 1.0;
const BOTH_GTA: f64 = 0.85;
const SAME_REGION: f64 = 0.75;
const IN_ONTARIO: f64 = 0.6;
const IN_CANADA: f64 = 0.5;
const ELSEWHERE: f64 = 0.3;
/// Programs with no location text at all.
const UNKNOWN_PROGRAM_LOCATION: f64 = 0.5;

fn mentions_any(text: &str, places: &[String]) -> bool {
    places.iter().any(|place| contains_phrase(text, place))
}

/// Location fit in `[0, 1]`, or `None` when the student gave no location.
///
/// `program_location` should already fall back to the university name.
pub fn score_location(
    taxonomy: &Taxonomy,
    student_location: &str,
    program_location: &str,
) -> Option<f64> {
    let student = fold(student_location);
    if student.is_empty() {
        return None;
    }

    let program = fold(program_location);
    if program.is_empty() {
        return Some(UNKNOWN_PROGRAM_LOCATION);
    }

    if contains_phrase(&student, &program) || contains_phrase(&program, &student) {
        return Some(SAME_PLACE);
    }

    if mentions_any(&student, &taxonomy.gta_cities) && mentions_any(&program, &taxonomy.gta_cities)
    {
        return Some(BOTH_GTA);
    }

    if taxonomy
        .regions
        .values()
        .any(|cities| mentions_any(&student, cities) && mentions_any(&program, cities))
    {
        return Some(SAME_REGION);
    }

    let score = if tokens(&student).any(|t| t == "ontario" || t == "on") {
        IN_ONTARIO
    } else if contains_phrase(&student, "canada") {
        IN_CANADA
    } else {
        ELSEWHERE
    };
    Some(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(student: &str, program: &str) -> Option<f64> {
        score_location(&Taxonomy::builtin().unwrap(), student, program)
    }

    #[test]
    fn missing_student_location_is_not_specified() {
        assert_eq!(score("", "Toronto"), None);
        assert_eq!(score("  ,  ", "Toronto"), None);
    }

    #[test]
    fn missing_program_location_is_neutral() {
        assert_eq!(score("Toronto", ""), Some(0.5));
    }

    #[test]
    fn containment_in_either_direction() {
        assert_eq!(score("Toronto, ON", "Toronto"), Some(1.0));
        assert_eq!(score("Waterloo", "University of Waterloo"), Some(1.0));
    }

    #[test]
    fn gta_cities_are_close() {
        assert_eq!(score("Mississauga", "Toronto"), Some(0.85));
        assert_eq!(score("I live in Brampton", "Oshawa, Ontario"), Some(0.85));
    }

    #[test]
    fn shared_region_is_near() {
        assert_eq!(score("Kitchener", "University of Waterloo"), Some(0.75));
        assert_eq!(score("Kanata", "Ottawa"), Some(0.75));
    }

    #[test]
    fn city_names_match_on_word_boundaries() {
        // "milton" inside "hamilton" must not count as a GTA mention.
        assert_eq!(score("Hamilton", "Toronto"), Some(0.3));
    }

    #[test]
    fn province_and_country_fallbacks() {
        assert_eq!(score("Somewhere in Ontario", "Vancouver"), Some(0.6));
        assert_eq!(score("Sudbury, ON", "Halifax"), Some(0.6));
        assert_eq!(score("Canada", "Halifax"), Some(0.5));
        assert_eq!(score("Paris, France", "Halifax"), Some(0.3));
    }
}
